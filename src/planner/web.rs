//! Web-facing agent tools: DuckDuckGo instant-answer search and page summarization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, Url};

use super::llm::{ChatMessage, ChatModel, ChatRequest};
use super::prompts;

const MAX_RESULTS: usize = 8;
const CHUNK_SIZE: usize = 1000;
const MAX_CHUNKS: usize = 6;

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait PageReader: Send + Sync {
    async fn summarize(&self, url: &Url) -> anyhow::Result<String>;
}

pub struct DuckDuckGoSearch {
    client: Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        // Instant answer API, no key required
        let resp: serde_json::Value = self
            .client
            .get("https://api.duckduckgo.com/")
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut snippets = Vec::new();
        if let Some(text) = resp["AbstractText"].as_str().filter(|t| !t.is_empty()) {
            snippets.push(text.to_string());
        }
        if let Some(related) = resp["RelatedTopics"].as_array() {
            for item in related {
                // grouped topics nest their entries one level down
                let entries = item["Topics"].as_array().cloned().unwrap_or_else(|| vec![item.clone()]);
                for entry in entries {
                    if let Some(text) = entry["Text"].as_str() {
                        snippets.push(text.to_string());
                    }
                }
            }
        }
        snippets.truncate(MAX_RESULTS);

        if snippets.is_empty() {
            Ok(format!("No web results for \"{query}\"."))
        } else {
            Ok(snippets.join("\n"))
        }
    }
}

/// Fetches a page, strips markup, and asks the chat model for a summary of
/// dish names and ingredients.
pub struct PageSummarizer {
    client: Client,
    model: Arc<dyn ChatModel>,
}

impl PageSummarizer {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            model,
        })
    }
}

#[async_trait]
impl PageReader for PageSummarizer {
    async fn summarize(&self, url: &Url) -> anyhow::Result<String> {
        let html = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let text = html_to_text(&html);
        if text.is_empty() {
            anyhow::bail!("page {url} has no readable text");
        }
        let excerpt = chunk_text(&text, CHUNK_SIZE)
            .into_iter()
            .take(MAX_CHUNKS)
            .collect::<Vec<_>>()
            .join("\n");

        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompts::summarize_page(&excerpt))],
            max_tokens: Some(400),
            ..Default::default()
        };
        Ok(self.model.complete(&request).await?)
    }
}

lazy_static! {
    static ref SCRIPT_OR_STYLE: Regex =
        Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Visible text of an HTML document with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_code, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Splits into pieces of at most `size` characters, preferring whitespace boundaries.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() {
        if rest.chars().count() <= size {
            chunks.push(rest);
            break;
        }
        let hard_end = rest
            .char_indices()
            .nth(size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let end = rest[..hard_end]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(hard_end);
        chunks.push(rest[..end].trim_end());
        rest = rest[end..].trim_start();
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_tags_and_entities() {
        let html = r#"<html><head><style>p { color: red }</style><script>var x = "<p>";</script></head>
            <body><h1>Dal&nbsp;Makhani</h1><p>Urad dal &amp; rajma,
            slow cooked.</p></body></html>"#;
        assert_eq!(html_to_text(html), "Dal Makhani Urad dal & rajma, slow cooked.");
    }

    #[test]
    fn chunks_respect_size_and_word_boundaries() {
        let text = "alpha beta gamma delta epsilon";
        let chunks = chunk_text(text, 11);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta", "epsilon"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 11));
    }

    #[test]
    fn chunking_handles_multibyte_text() {
        let text = "पनीर टिक्का मसाला";
        let chunks = chunk_text(text, 5);
        assert_eq!(chunks.concat().replace(' ', ""), text.replace(' ', ""));
    }
}
