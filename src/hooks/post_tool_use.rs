//! Announce finished tool calls.

use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use super::{HookContext, HookInput, HookLog, HookOutcome};
use crate::llm::truncate_chars;

const ANNOUNCEMENT_LOG: &str = "voice_announcements.json";

fn input_str<'a>(tool_input: &'a Value, key: &str) -> Option<&'a str> {
    tool_input.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn file_name(tool_input: &Value) -> Option<String> {
    let path = input_str(tool_input, "file_path")?;
    Path::new(path).file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Rule-based summary of a tool call.
pub fn simple_summary(tool: &str, tool_input: &Value) -> String {
    match tool {
        "Task" => {
            let task = input_str(tool_input, "prompt").or_else(|| input_str(tool_input, "description"));
            match task.and_then(|t| t.split_once(':')) {
                Some((agent, detail)) => {
                    let detail = detail.trim();
                    let detail = if detail.chars().count() > 30 {
                        format!("{}...", truncate_chars(detail, 30))
                    } else {
                        detail.to_string()
                    };
                    format!("{} completed {detail}", agent.trim())
                }
                None => "Agent task completed".to_string(),
            }
        }
        "Write" => file_name(tool_input)
            .map_or_else(|| "File created".to_string(), |name| format!("Created {name}")),
        "Edit" | "MultiEdit" => file_name(tool_input)
            .map_or_else(|| "File updated".to_string(), |name| format!("Updated {name}")),
        _ => format!("{tool} completed"),
    }
}

fn summary_prompt(tool: &str, tool_input: &Value) -> String {
    let input = serde_json::to_string(tool_input).unwrap_or_default();
    format!(
        "Summarize this completed coding-assistant action in 3 to 7 spoken words. \
         Be specific about what changed.\n\nTool: {tool}\nInput: {}\n\n\
         Respond with only the summary.",
        truncate_chars(&input, 500)
    )
}

/// Handle a `PostToolUse` event.
pub fn post_tool_use_hook(input: &HookInput, ctx: &HookContext<'_>) -> anyhow::Result<HookOutcome> {
    let Some(tool) = input.tool_name.as_deref().filter(|t| !t.is_empty()) else {
        return Ok(HookOutcome::Skipped("no tool name".to_string()));
    };
    if ctx.config.quiet_tools.iter().any(|quiet| quiet == tool) {
        return Ok(HookOutcome::Skipped(format!("{tool} is quiet")));
    }

    let ai_summary = ctx.ask_phrase(summary_prompt(tool, &input.tool_input), 100);
    let ai_generated = ai_summary.is_some();
    let text = ai_summary.unwrap_or_else(|| simple_summary(tool, &input.tool_input));

    let provider = ctx.announce(&text);

    let log_dir = ctx.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    HookLog::new(&log_dir, ANNOUNCEMENT_LOG).bounded(ctx.config.max_log_entries).append(json!({
        "timestamp": Utc::now().to_rfc3339(),
        "tool": tool,
        "summary": text,
        "ai_generated": ai_generated,
        "tts_method": provider,
    }))?;

    Ok(HookOutcome::Announced { provider, text })
}
