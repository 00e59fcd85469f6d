//! HTML to plain text for summarization input.
//!
//! Not a readability engine: every visible text node is kept (navigation and
//! footers included) and only `script`/`style` content is dropped.

use html_scraper::{Html, Node};
use webbrief_core::{Error, FetchResponse, Result};

/// Elements whose text content never reaches the output.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style"];

fn is_line_break(c: char) -> bool {
    // Unicode line boundaries, not just `\n` and `\r`.
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Whitespace for trimming: Unicode `White_Space` plus the information
/// separators U+001C..=U+001F.
fn is_trim_char(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Collapse raw page text into one phrase per line.
///
/// Each line is trimmed and further split on double spaces (layout padding in
/// most markup); empty fragments are dropped and the rest joined with `\n`.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() / 2);
    for line in text.split(is_line_break) {
        for phrase in line.trim_matches(is_trim_char).split("  ") {
            let phrase = phrase.trim_matches(is_trim_char);
            if phrase.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(phrase);
        }
    }
    out
}

/// Raw concatenation of every text node outside `script`/`style`, in document order.
pub fn raw_visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => HIDDEN_ELEMENTS.contains(&el.name()),
            _ => false,
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Visible text of an HTML document, normalized with [`normalize_text`].
pub fn visible_text(html: &str) -> String {
    normalize_text(&raw_visible_text(html))
}

/// `charset` parameter of a `Content-Type` value, unquoted.
fn declared_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| v.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

/// Decode a body with the charset its `Content-Type` declares.
///
/// Missing or unknown labels fall back to UTF-8; invalid sequences become
/// U+FFFD. A byte-order mark overrides the declared label.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(declared_charset)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Extract visible text from a fetched page.
///
/// The body is decoded with [`decode_body`] and always parsed as HTML,
/// whatever the declared media type. A page with nothing visible is an error
/// so callers can treat it like a failed fetch.
pub fn page_text(resp: &FetchResponse) -> Result<String> {
    let html = decode_body(&resp.bytes, resp.content_type.as_deref());
    let text = visible_text(&html);
    if text.is_empty() {
        return Err(Error::Extract(format!(
            "no visible text in {} ({} bytes)",
            resp.final_url,
            resp.bytes.len()
        )));
    }
    Ok(text)
}
