//! Notion page sink.
//!
//! Creates one database page per meeting: summary, action-item checklist,
//! decisions, and the full transcript inside a collapsible toggle. Notion
//! caps a rich_text element at 2000 characters, so long text is chunked.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::{DocumentSink, NotesPage, PublishError};

const NOTION_VERSION: &str = "2022-06-28";
const TEXT_CHUNK_SIZE: usize = 2000;

#[derive(Debug, Deserialize)]
struct CreatePageResponse {
    url: String,
}

pub struct NotionSink {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    database_id: String,
}

impl NotionSink {
    pub fn new(api_key: String, database_id: String, endpoint: Option<String>) -> Self {
        let base_url = endpoint.unwrap_or_else(|| "https://api.notion.com/v1".to_string());

        info!("Initialized Notion sink for database {}", database_id);

        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            database_id,
        }
    }
}

fn rich_text(content: &str) -> Value {
    json!([ { "type": "text", "text": { "content": content } } ])
}

fn heading(text: &str) -> Value {
    json!({ "heading_2": { "rich_text": rich_text(text) } })
}

fn paragraph(text: &str) -> Value {
    // Notion rejects empty paragraph text.
    let text = if text.is_empty() { " " } else { text };
    json!({ "paragraph": { "rich_text": rich_text(text) } })
}

fn todo_item(text: &str) -> Value {
    json!({ "to_do": { "rich_text": rich_text(text), "checked": false } })
}

fn bulleted_item(text: &str) -> Value {
    json!({ "bulleted_list_item": { "rich_text": rich_text(text) } })
}

fn chunk_text(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return vec![" "];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut cut = rest.len().min(TEXT_CHUNK_SIZE);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

fn toggle_with_text(heading_text: &str, content: &str) -> Value {
    let children: Vec<Value> = chunk_text(content).into_iter().map(paragraph).collect();
    json!({ "toggle": { "rich_text": rich_text(heading_text), "children": children } })
}

/// Assemble the block children for a notes page.
fn page_blocks(page: &NotesPage) -> Vec<Value> {
    let mut blocks = vec![heading("Summary")];
    blocks.extend(chunk_text(&page.analysis.summary).into_iter().map(paragraph));

    blocks.push(heading("Action Items"));
    if page.analysis.action_items.is_empty() {
        blocks.push(paragraph("No action items."));
    }
    for item in &page.analysis.action_items {
        let mut line = item.text.clone();
        if let Some(owner) = &item.owner {
            line.push_str(&format!(" - {}", owner));
        }
        if let Some(deadline) = &item.deadline {
            line.push_str(&format!(" (due {})", deadline));
        }
        blocks.push(todo_item(&line));
    }

    blocks.push(heading("Decisions"));
    if page.analysis.decisions.is_empty() {
        blocks.push(paragraph("No decisions recorded."));
    }
    for decision in &page.analysis.decisions {
        blocks.push(bulleted_item(decision));
    }

    blocks.push(toggle_with_text("Transcript", &page.transcript));
    blocks
}

#[async_trait]
impl DocumentSink for NotionSink {
    async fn publish(&self, page: &NotesPage) -> Result<String, PublishError> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Name": { "title": rich_text(&page.title) },
                "Date": { "date": { "start": page.date.to_string() } }
            },
            "children": page_blocks(page)
        });

        let url = format!("{}/pages", self.base_url);
        debug!("Creating notes page '{}'", page.title);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Backend {
                reason: e.to_string(),
                retryable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| PublishError::Backend {
            reason: e.to_string(),
            retryable: true,
        })?;

        if !status.is_success() {
            error!("Notion page creation failed with status {}: {}", status, text);
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(PublishError::Backend {
                    reason: format!("status {}: {}", status, text),
                    retryable: true,
                });
            }
            return Err(PublishError::Rejected {
                reason: format!("status {}: {}", status, text),
            });
        }

        let parsed: CreatePageResponse =
            serde_json::from_str(&text).map_err(|e| PublishError::Backend {
                reason: format!("unparseable page response: {}", e),
                retryable: false,
            })?;

        info!("Notes page created: {}", parsed.url);
        Ok(parsed.url)
    }
}
