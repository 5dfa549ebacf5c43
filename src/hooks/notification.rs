//! Host notification hook: speak what the assistant is waiting for.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::{HookContext, HookInput, HookLog, HookOutcome};
use crate::llm::truncate_chars;

const NOTIFICATION_LOG: &str = "notifications.json";

static USE_TOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)to use\s+(.+)$").expect("valid regex"));

/// Turn a host notification into a short phrase without any model.
pub fn spoken_notification(message: &str) -> String {
    let message = message.trim();
    let lower = message.to_lowercase();

    if lower.contains("permission") {
        if let Some(caps) = USE_TOOL.captures(message) {
            let tool = caps[1].trim().trim_end_matches('.');
            return format!("Permission needed for {tool}");
        }
        return "Claude needs your permission".to_string();
    }
    if lower.contains("waiting for your input") {
        return "Waiting for your response".to_string();
    }
    if lower.contains("idle") {
        return "Claude is ready".to_string();
    }

    let message = message.strip_prefix("Claude ").unwrap_or(message);
    if message.chars().count() > 50 {
        format!("{}...", truncate_chars(message, 47))
    } else {
        message.to_string()
    }
}

fn wants_smart_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("waiting") || lower.contains("idle") || lower.contains("permission")
}

fn smart_prompt(input: &HookInput, message: &str) -> String {
    let mut context = vec![format!("Notification: {message}")];
    if let Some(status) = &input.status {
        context.push(format!("Status: {status}"));
    }
    if let Some(reason) = &input.reason {
        context.push(format!("Reason: {reason}"));
    }
    if let Some(mode) = &input.permission_mode {
        context.push(format!("Permission mode: {mode}"));
    }
    if let Some(cwd) = &input.cwd {
        context.push(format!("Working directory: {}", cwd.display()));
    }
    if let Some(request) = input.transcript().and_then(|t| t.last_user_request()) {
        context.push(format!("Last user request: {}", truncate_chars(&request, 100)));
    }

    format!(
        "A coding assistant is waiting on its user. Write a spoken alert of 4 to 8 words \
         telling the user what it needs. Be specific, friendly, and natural.\n\n{}\n\n\
         Respond with only the alert text.",
        context.join("\n")
    )
}

/// Handle a `Notification` event.
pub fn notification_hook(input: &HookInput, ctx: &HookContext<'_>) -> anyhow::Result<HookOutcome> {
    let Some(message) = input.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(HookOutcome::Skipped("empty notification".to_string()));
    };

    let smart = wants_smart_message(message)
        .then(|| ctx.ask_phrase(smart_prompt(input, message), 100))
        .flatten();
    let text = smart.unwrap_or_else(|| spoken_notification(message));

    let provider = ctx.announce(&text);

    if ctx.config.desktop_notifications {
        send_desktop_notification(&text);
    }

    if let Some(log) = HookLog::in_existing_dir(&ctx.log_dir(), NOTIFICATION_LOG) {
        let log = log.bounded(ctx.config.max_log_entries);
        log.append(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "message": message,
            "spoken": text,
        }))?;
    }

    Ok(HookOutcome::Announced { provider, text })
}

/// Show a desktop notification (requires the `notifications` feature).
#[cfg(feature = "notifications")]
fn send_desktop_notification(text: &str) {
    use notify_rust::Notification;

    if let Err(e) = Notification::new()
        .summary("Titanium")
        .body(text)
        .appname("titanium")
        .timeout(5000)
        .show()
    {
        tracing::debug!(error = %e, "Desktop notification failed");
    }
}

#[cfg(not(feature = "notifications"))]
fn send_desktop_notification(_text: &str) {}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::llm::testing::ScriptedProvider;

    #[test]
    fn test_permission_names_tool() {
        assert_eq!(
            spoken_notification("Claude needs your permission to use Bash."),
            "Permission needed for Bash"
        );
        assert_eq!(spoken_notification("Permission required"), "Claude needs your permission");
    }

    #[test]
    fn test_waiting_and_idle() {
        assert_eq!(
            spoken_notification("Claude is waiting for your input"),
            "Waiting for your response"
        );
        assert_eq!(spoken_notification("Session idle for 60s"), "Claude is ready");
    }

    #[test]
    fn test_other_messages_trimmed() {
        assert_eq!(spoken_notification("Claude finished indexing"), "finished indexing");

        let long = "x".repeat(80);
        let spoken = spoken_notification(&long);
        assert_eq!(spoken.chars().count(), 50);
        assert!(spoken.ends_with("..."));
    }

    #[test]
    fn test_empty_message_skipped() {
        let harness = Harness::new();
        let llm = ScriptedProvider::failing();
        let input = HookInput { message: Some("  ".to_string()), ..HookInput::default() };

        let outcome = notification_hook(&input, &harness.context(&llm)).unwrap();
        assert!(matches!(outcome, HookOutcome::Skipped(_)));
        assert!(harness.spoken().is_empty());
    }

    #[test]
    fn test_smart_message_preferred() {
        let harness = Harness::new();
        let llm = ScriptedProvider::answering("\"Approve the pending file edit\"");
        let input = HookInput {
            message: Some("Claude is waiting for your input".to_string()),
            ..HookInput::default()
        };

        let outcome = notification_hook(&input, &harness.context(&llm)).unwrap();
        assert_eq!(
            outcome,
            HookOutcome::Announced {
                provider: "recording".to_string(),
                text: "Approve the pending file edit".to_string(),
            }
        );
        let request = &llm.requests.lock()[0];
        assert!(request.prompt.contains("waiting for your input"));
    }

    #[test]
    fn test_llm_failure_falls_back_and_logs() {
        let harness = Harness::new();
        std::fs::create_dir_all(harness.logs_dir()).unwrap();
        let llm = ScriptedProvider::failing();
        let input = HookInput {
            message: Some("Claude needs your permission to use Write".to_string()),
            ..HookInput::default()
        };

        notification_hook(&input, &harness.context(&llm)).unwrap();
        assert_eq!(harness.spoken(), vec!["Permission needed for Write".to_string()]);

        let entries = HookLog::new(&harness.logs_dir(), NOTIFICATION_LOG).entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["spoken"], "Permission needed for Write");
    }

    #[test]
    fn test_plain_message_skips_llm() {
        let harness = Harness::new();
        let llm = ScriptedProvider::answering("unused");
        let input =
            HookInput { message: Some("Build finished".to_string()), ..HookInput::default() };

        notification_hook(&input, &harness.context(&llm)).unwrap();
        assert_eq!(llm.request_count(), 0);
        assert_eq!(harness.spoken(), vec!["Build finished".to_string()]);
        assert!(!harness.logs_dir().exists());
    }
}
