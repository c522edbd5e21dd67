//! Desktop notification backends

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

pub const APP_NAME: &str = "QuoteWatch";

/// How long a notification helper process may run before it is killed
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a helper to completion, killing it if it outlives `limit`
async fn run_command(program: &str, args: &[&str], limit: Duration) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    let status = tokio::time::timeout(limit, cmd.status())
        .await
        .map_err(|_| {
            AppError::Notification(format!("{} did not finish within {:?}", program, limit))
        })?
        .map_err(|e| AppError::Notification(format!("{} unavailable: {}", program, e)))?;

    if !status.success() {
        return Err(AppError::Notification(format!(
            "{} exited with {}",
            program, status
        )));
    }
    Ok(())
}

/// Shows a notification to the user
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Backend ID (e.g., "notify-send", "osascript", "log")
    fn id(&self) -> &'static str;

    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log only
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn id(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        info!("[notification] {}: {}", title, body);
        Ok(())
    }
}

/// libnotify via `notify-send`
pub struct NotifySendNotifier;

#[async_trait]
impl Notifier for NotifySendNotifier {
    fn id(&self) -> &'static str {
        "notify-send"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        run_command(
            "notify-send",
            &["--app-name", APP_NAME, title, body],
            COMMAND_TIMEOUT,
        )
        .await
    }
}

/// macOS Notification Center via `osascript`
pub struct OsascriptNotifier;

/// AppleScript string literal
fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl Notifier for OsascriptNotifier {
    fn id(&self) -> &'static str {
        "osascript"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        let script = format!(
            "display notification {} with title {}",
            applescript_quote(body),
            applescript_quote(title)
        );

        run_command("osascript", &["-e", &script], COMMAND_TIMEOUT).await
    }
}

/// Pick the backend for the OS we are running on
pub fn platform_notifier() -> Arc<dyn Notifier> {
    notifier_for_os(std::env::consts::OS)
}

pub fn notifier_for_os(os: &str) -> Arc<dyn Notifier> {
    match os {
        "linux" | "freebsd" | "openbsd" | "netbsd" => Arc::new(NotifySendNotifier),
        "macos" => Arc::new(OsascriptNotifier),
        _ => Arc::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_selection() {
        assert_eq!(notifier_for_os("linux").id(), "notify-send");
        assert_eq!(notifier_for_os("macos").id(), "osascript");
        assert_eq!(notifier_for_os("windows").id(), "log");
        assert_eq!(notifier_for_os("haiku").id(), "log");
    }

    #[test]
    fn test_applescript_quoting() {
        assert_eq!(applescript_quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(applescript_quote(r"a\b"), r#""a\\b""#);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify("title", "body").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_helper_is_an_error() {
        let result = run_command("quotewatch-no-such-helper", &[], COMMAND_TIMEOUT).await;
        assert!(matches!(result, Err(AppError::Notification(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_helper_times_out() {
        let started = std::time::Instant::now();
        let result = run_command("sleep", &["5"], Duration::from_millis(200)).await;
        assert!(matches!(result, Err(AppError::Notification(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_helper_is_an_error() {
        assert!(run_command("true", &[], COMMAND_TIMEOUT).await.is_ok());
        assert!(run_command("false", &[], COMMAND_TIMEOUT).await.is_err());
    }
}
