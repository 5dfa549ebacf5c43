//! Session transcript reader.
//!
//! Transcripts are JSON Lines. Each line is either a bare message
//! (`{"role": ..., "content": ...}`) or an envelope carrying one under
//! `message`. Lines that are not valid JSON are skipped.

use std::io;
use std::path::Path;

use serde_json::Value;

/// Parsed transcript entries, in file order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Value>,
}

impl Transcript {
    /// Read a transcript file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        Self { entries }
    }

    /// Raw entries.
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Value> {
        self.entries
    }

    /// Text of the most recent user message.
    pub fn last_user_request(&self) -> Option<String> {
        self.entries.iter().rev().find_map(user_text)
    }

    /// Text of the first user message.
    pub fn first_user_request(&self) -> Option<String> {
        self.entries.iter().find_map(user_text)
    }

    /// Tool-use counts by tool name, in first-seen order.
    pub fn tool_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();

        for entry in &self.entries {
            let message = message_of(entry);
            if role_of(entry, message) != Some("assistant") {
                continue;
            }
            let Some(blocks) = message.get("content").and_then(Value::as_array) else {
                continue;
            };

            for block in blocks {
                if block.get("type").and_then(Value::as_str) != Some("tool_use") {
                    continue;
                }
                let Some(name) = block.get("name").and_then(Value::as_str) else {
                    continue;
                };
                match counts.iter_mut().find(|(n, _)| n == name) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((name.to_string(), 1)),
                }
            }
        }

        counts
    }

    /// Total tool uses.
    pub fn tool_use_total(&self) -> usize {
        self.tool_counts().iter().map(|(_, count)| count).sum()
    }
}

fn message_of(entry: &Value) -> &Value {
    entry.get("message").filter(|m| m.is_object()).unwrap_or(entry)
}

fn role_of<'a>(entry: &'a Value, message: &'a Value) -> Option<&'a str> {
    message
        .get("role")
        .or_else(|| entry.get("role"))
        .or_else(|| entry.get("type"))
        .and_then(Value::as_str)
}

/// Plain text of a user message; tool results are not user requests.
fn user_text(entry: &Value) -> Option<String> {
    let message = message_of(entry);
    if role_of(entry, message) != Some("user") {
        return None;
    }

    let text = match message.get("content")? {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
