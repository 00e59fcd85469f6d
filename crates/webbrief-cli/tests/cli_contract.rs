use assert_cmd::Command;
use axum::{extract::Query, routing::get, routing::post, Json, Router};
use predicates::prelude::*;
use std::collections::HashMap;

fn webbrief() -> Command {
    let mut cmd = Command::cargo_bin("webbrief").expect("webbrief binary");
    // Keep these hermetic: no `.env` autoload, no inherited credentials.
    cmd.env("WEBBRIEF_DOTENV", "0")
        .env_remove("WEBBRIEF_GEMINI_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("WEBBRIEF_SEARCH_PROVIDER")
        .env_remove("WEBBRIEF_MAX_RESULTS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn version_prints_json() {
    let out = webbrief().arg("version").output().expect("run webbrief version");
    assert!(out.status.success());
    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse version json");
    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["name"].as_str(), Some("webbrief"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn version_text_output() {
    webbrief()
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("webbrief "));
}

#[test]
fn exit_keyword_ends_session_with_goodbye() {
    webbrief()
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome to the AI Search Agent!"))
        .stdout(predicate::str::contains("Please enter your query: "))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn blank_lines_reprompt_without_searching() {
    webbrief()
        .write_stdin("\n   \nQUIT\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Query cannot be empty. Please try again."))
        .stdout(predicate::str::contains("Searching").not())
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn closed_stdin_exits_cleanly() {
    webbrief()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Goodbye!").not());
}

#[test]
fn unknown_provider_is_rejected_at_startup() {
    webbrief()
        .args(["--provider", "bing"])
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bing"));
}

#[test]
fn out_of_range_max_results_is_rejected() {
    for n in ["0", "31"] {
        webbrief()
            .args(["--max-results", n])
            .write_stdin("exit\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--max-results must be between 1 and 30"));
    }
    webbrief()
        .args(["--max-results", "30"])
        .write_stdin("exit\n")
        .assert()
        .success();
}

#[test]
fn searxng_without_endpoint_is_rejected() {
    webbrief()
        .args(["--provider", "searxng"])
        .env_remove("WEBBRIEF_SEARXNG_ENDPOINT")
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("WEBBRIEF_SEARXNG_ENDPOINT"));
}

#[test]
fn full_session_against_local_servers() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");

    let search_base = base.clone();
    let app = Router::new()
        .route(
            "/search",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let base = search_base.clone();
                async move {
                    assert_eq!(q.get("format").map(String::as_str), Some("json"));
                    Json(serde_json::json!({
                        "query": q.get("q").cloned().unwrap_or_default(),
                        "results": [
                            {"url": format!("{base}/paris"), "title": "Paris"},
                            {"url": format!("{base}/gone"), "title": "Gone"}
                        ]
                    }))
                }
            }),
        )
        .route(
            "/paris",
            get(|| async {
                axum::response::Html(
                    "<html><body><h1>Paris</h1>\n<p>Paris is the capital of France.</p></body></html>",
                )
            }),
        )
        .route(
            "/v1beta/models/:call",
            post(|| async {
                Json(serde_json::json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "Paris is the capital of France."}]},
                        "finishReason": "STOP"
                    }]
                }))
            }),
        );
    rt.spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let out = webbrief()
        .args(["--provider", "searxng"])
        .env("WEBBRIEF_SEARXNG_ENDPOINT", &base)
        .env("WEBBRIEF_GEMINI_BASE_URL", &base)
        .env("GEMINI_API_KEY", "test-key")
        .write_stdin("capital of France\nexit\n")
        .output()
        .expect("run webbrief");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);

    let sep = "=".repeat(50);
    let block = format!(
        "{sep}\nAI Generated Summary:\nParis is the capital of France.\n\nSources:\n\
         - {base}/paris\n- {base}/gone\n{sep}\n"
    );
    assert!(stdout.contains("Found 2 results."), "{stdout}");
    assert!(stdout.contains(&format!("Successfully fetched and parsed content from: {base}/paris")));
    assert!(stdout.contains(&format!("An error occurred while fetching the URL {base}/gone")));
    assert!(stdout.contains(&block), "missing report block in:\n{stdout}");
    assert!(stdout.trim_end().ends_with("Goodbye!"));
}

#[test]
fn session_without_api_key_prints_placeholder_summary() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");

    let search_base = base.clone();
    let app = Router::new()
        .route(
            "/search",
            get(move || {
                let base = search_base.clone();
                async move {
                    Json(serde_json::json!({"results": [{"url": format!("{base}/page")}]}))
                }
            }),
        )
        .route(
            "/page",
            get(|| async { axum::response::Html("<p>Some page text</p>") }),
        );
    rt.spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    webbrief()
        .args(["--provider", "searxng"])
        .env("WEBBRIEF_SEARXNG_ENDPOINT", &base)
        .env("WEBBRIEF_GEMINI_BASE_URL", &base)
        .write_stdin("anything\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "AI Generated Summary:\nCould not generate a summary due to a missing API key.\n",
        ))
        .stdout(predicate::str::contains(format!("Sources:\n- {base}/page\n")));
}
