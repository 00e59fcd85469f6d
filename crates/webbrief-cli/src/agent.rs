//! The interactive query loop and the per-query pipeline behind it.
//!
//! Every stage runs to completion before the next one starts: search, then one
//! page fetch at a time, then a single summarization call. Failures are caught
//! where they happen, reported on the console and turned into an empty or
//! placeholder value so the loop always gets back to the prompt.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use webbrief_core::{Error, FetchBackend, SearchProvider, SearchQuery, Summarizer};
use webbrief_local::{extract, page_request};

pub const DEFAULT_MAX_RESULTS: usize = 3;
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

pub const PROMPT: &str = "Please enter your query: ";
pub const EMPTY_QUERY_MESSAGE: &str = "Query cannot be empty. Please try again.";
pub const NO_RESULTS_MESSAGE: &str = "Could not find any relevant websites for your query.";
pub const NO_CONTENT_MESSAGE: &str = "Could not extract content from the found websites.";
pub const MISSING_KEY_SUMMARY: &str = "Could not generate a summary due to a missing API key.";
pub const FAILED_SUMMARY: &str = "Could not generate a summary.";

const SEPARATOR_WIDTH: usize = 50;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Result URLs read per query.
    pub max_results: usize,
    pub fetch_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

/// How a single query ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoResults,
    NoContent,
    Answered {
        summary: String,
        sources: Vec<String>,
    },
}

pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Final block: separator, summary, every source URL, separator.
pub fn write_report<W: Write>(out: &mut W, summary: &str, sources: &[String]) -> io::Result<()> {
    let sep = "=".repeat(SEPARATOR_WIDTH);
    writeln!(out)?;
    writeln!(out, "{sep}")?;
    writeln!(out, "AI Generated Summary:")?;
    writeln!(out, "{summary}")?;
    writeln!(out)?;
    writeln!(out, "Sources:")?;
    for url in sources {
        writeln!(out, "- {url}")?;
    }
    writeln!(out, "{sep}")?;
    writeln!(out)
}

pub struct Agent {
    searcher: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn FetchBackend>,
    summarizer: Arc<dyn Summarizer>,
    cfg: AgentConfig,
}

impl Agent {
    pub fn new(
        searcher: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn FetchBackend>,
        summarizer: Arc<dyn Summarizer>,
        cfg: AgentConfig,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            summarizer,
            cfg,
        }
    }

    /// Result URLs for `query`, at most `max_results`; empty when the provider fails.
    pub async fn search_urls<W: Write>(&self, query: &str, out: &mut W) -> io::Result<Vec<String>> {
        writeln!(out, "Searching the web for: {query}...")?;
        let q = SearchQuery {
            query: query.to_string(),
            max_results: Some(self.cfg.max_results),
            ..Default::default()
        };
        match self.searcher.search(&q).await {
            Ok(resp) => {
                let mut urls: Vec<String> = resp
                    .urls()
                    .into_iter()
                    .filter(|u| !u.trim().is_empty())
                    .collect();
                urls.truncate(self.cfg.max_results);
                tracing::debug!(
                    provider = %resp.provider,
                    results = urls.len(),
                    "search completed"
                );
                writeln!(out, "Found {} results.", urls.len())?;
                Ok(urls)
            }
            Err(e) => {
                tracing::warn!(provider = self.searcher.name(), error = %e, "web search failed");
                writeln!(out, "An error occurred during web search: {e}")?;
                Ok(Vec::new())
            }
        }
    }

    /// Visible text of one page, or `None` if fetching or extraction failed.
    pub async fn fetch_and_extract<W: Write>(
        &self,
        url: &str,
        out: &mut W,
    ) -> io::Result<Option<String>> {
        writeln!(out, "Fetching content from: {url}...")?;
        let req = page_request(url, self.cfg.fetch_timeout);
        let text = match self.fetcher.fetch(&req).await {
            Ok(resp) if !resp.is_success() => Err(Error::HttpStatus(resp.status)),
            Ok(resp) => extract::page_text(&resp),
            Err(e) => Err(e),
        };
        match text {
            Ok(text) => {
                tracing::debug!(url = %url, chars = text.len(), "extracted page text");
                writeln!(out, "Successfully fetched and parsed content from: {url}")?;
                Ok(Some(text))
            }
            Err(e @ Error::Extract(_)) => {
                tracing::warn!(url = %url, error = %e, "page extraction failed");
                writeln!(out, "An error occurred while parsing the content from {url}: {e}")?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "page fetch failed");
                writeln!(out, "An error occurred while fetching the URL {url}: {e}")?;
                Ok(None)
            }
        }
    }

    /// Summary text, or one of the fixed placeholders.
    pub async fn summarize<W: Write>(
        &self,
        text: &str,
        query: &str,
        out: &mut W,
    ) -> io::Result<String> {
        writeln!(out, "Generating summary...")?;
        match self.summarizer.summarize(query, text).await {
            Ok(summary) => {
                writeln!(out, "Summary generated successfully.")?;
                Ok(summary)
            }
            Err(Error::NotConfigured(detail)) => {
                tracing::warn!(summarizer = self.summarizer.name(), %detail, "summarizer not configured");
                writeln!(out)?;
                writeln!(
                    out,
                    "WARNING: no API key is set ({detail}). The summarization will fail."
                )?;
                writeln!(out, "Please set the environment variable.")?;
                writeln!(out)?;
                Ok(MISSING_KEY_SUMMARY.to_string())
            }
            Err(e) => {
                tracing::warn!(summarizer = self.summarizer.name(), error = %e, "summarization failed");
                writeln!(out, "An error occurred during summarization: {e}")?;
                Ok(FAILED_SUMMARY.to_string())
            }
        }
    }

    /// Run the whole pipeline for one query and print the result.
    pub async fn answer<W: Write>(&self, query: &str, out: &mut W) -> io::Result<Outcome> {
        let urls = self.search_urls(query, out).await?;
        if urls.is_empty() {
            writeln!(out, "{NO_RESULTS_MESSAGE}")?;
            return Ok(Outcome::NoResults);
        }

        let mut all_text = String::new();
        for url in &urls {
            if let Some(text) = self.fetch_and_extract(url, out).await? {
                all_text.push_str(&text);
                all_text.push_str("\n\n");
            }
        }
        if all_text.is_empty() {
            writeln!(out, "{NO_CONTENT_MESSAGE}")?;
            return Ok(Outcome::NoContent);
        }

        let summary = self.summarize(&all_text, query, out).await?;
        write_report(out, &summary, &urls)?;
        Ok(Outcome::Answered {
            summary,
            sources: urls,
        })
    }

    /// Prompt, read, answer; until an exit keyword or end of input.
    pub async fn run<R: BufRead, W: Write>(&self, mut input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "Welcome to the AI Search Agent!")?;
        writeln!(out, "Type 'exit' or 'quit' to end the session.")?;

        let mut line = String::new();
        loop {
            write!(out, "\n{PROMPT}")?;
            out.flush()?;

            line.clear();
            match input.read_line(&mut line) {
                Ok(0) => {
                    writeln!(out)?;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "could not read query; ending session");
                    writeln!(out)?;
                    break;
                }
            }

            let query = line.trim();
            if is_exit_command(query) {
                writeln!(out, "Goodbye!")?;
                break;
            }
            if query.is_empty() {
                writeln!(out, "{EMPTY_QUERY_MESSAGE}")?;
                continue;
            }

            let outcome = self.answer(query, &mut out).await?;
            tracing::debug!(?outcome, "query finished");
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keywords_match_any_case() {
        for kw in ["exit", "EXIT", "Quit", " qUiT "] {
            assert!(is_exit_command(kw), "{kw:?}");
        }
        for other in ["", "exits", "quit now", "q"] {
            assert!(!is_exit_command(other), "{other:?}");
        }
    }

    #[test]
    fn report_lists_summary_then_every_source() {
        let mut out = Vec::new();
        write_report(
            &mut out,
            "Short answer.",
            &["https://a.example".to_string(), "https://b.example".to_string()],
        )
        .unwrap();
        let s = String::from_utf8(out).unwrap();
        let sep = "=".repeat(50);
        assert_eq!(
            s,
            format!(
                "\n{sep}\nAI Generated Summary:\nShort answer.\n\nSources:\n- https://a.example\n- https://b.example\n{sep}\n\n"
            )
        );
    }

    #[test]
    fn default_config_reads_three_pages_with_ten_second_timeout() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.max_results, 3);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(10));
    }
}
