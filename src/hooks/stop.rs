//! Session-end hook: record the stop event and announce completion.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::Value;

use super::{HookContext, HookInput, HookLog, HookOutcome, Transcript};
use crate::llm::truncate_chars;

const STOP_LOG: &str = "stop.json";
const CHAT_LOG: &str = "chat.json";

/// Generic completion announcements.
pub const COMPLETION_MESSAGES: [&str; 5] =
    ["Work complete!", "All done!", "Task finished!", "Job complete!", "Ready for next task!"];

const PERSONAL_MESSAGES: [&str; 5] =
    ["{name}, all set!", "Ready for you, {name}!", "Complete, {name}!", "{name}, we're done!", "Task finished, {name}!"];

/// Pick a completion message, addressing `name` 30% of the time.
pub fn completion_message<R: Rng + ?Sized>(name: Option<&str>, rng: &mut R) -> String {
    if let Some(name) = name {
        if rng.random_bool(0.3) {
            let template = PERSONAL_MESSAGES.choose(rng).copied().unwrap_or(PERSONAL_MESSAGES[0]);
            return template.replace("{name}", name);
        }
    }
    COMPLETION_MESSAGES.choose(rng).copied().unwrap_or(COMPLETION_MESSAGES[0]).to_string()
}

fn summary_prompt(transcript: &Transcript) -> Option<String> {
    let total = transcript.tool_use_total();
    if total == 0 {
        return None;
    }

    let mut context = vec![format!("Session completed with {total} operations")];
    if let Some(request) = transcript.first_user_request() {
        context.push(format!("User asked: {}", truncate_chars(&request, 200)));
    }
    let tools: Vec<String> = transcript
        .tool_counts()
        .into_iter()
        .take(10)
        .map(|(tool, count)| format!("{tool}: {count}"))
        .collect();
    context.push(format!("Tools used: {}", tools.join(", ")));

    Some(format!(
        "You are a coding assistant that just finished a work session. In 1 to 2 short \
         spoken sentences, in first person, tell the user what you accomplished.\n\n{}\n\n\
         Respond with only the summary.",
        context.join("\n")
    ))
}

/// Handle a `Stop` event.
pub fn stop_hook(
    input: &HookInput,
    raw: &Value,
    chat: bool,
    ctx: &HookContext<'_>,
) -> anyhow::Result<HookOutcome> {
    let log_dir = ctx.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    HookLog::new(&log_dir, STOP_LOG).append(raw.clone())?;

    let transcript = input.transcript();

    if chat {
        match &transcript {
            Some(transcript) => HookLog::new(&log_dir, CHAT_LOG).write_all(transcript.entries())?,
            None => tracing::debug!("No transcript to copy"),
        }
    }

    let summary = transcript
        .as_ref()
        .and_then(summary_prompt)
        .and_then(|prompt| ctx.ask_phrase(prompt, 300));

    let text = summary.unwrap_or_else(|| {
        let name = ctx.config.display_name();
        completion_message(name.as_deref(), &mut rand::rng())
    });

    let provider = ctx.announce(&text);
    Ok(HookOutcome::Announced { provider, text })
}
