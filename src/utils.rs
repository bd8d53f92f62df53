//! Utility functions shared across the bot, the providers and the relay.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Formats an optional byte count the way it is shown on menu buttons.
///
/// Unknown sizes render as `"N/A"`; known sizes as megabytes below one
/// gigabyte and gigabytes above.
///
/// # Examples
///
/// ```
/// use gramfetch::utils::human_readable_size;
/// assert_eq!(human_readable_size(Some(15 * 1024 * 1024)), "15.00 MB");
/// assert_eq!(human_readable_size(None), "N/A");
/// ```
#[must_use]
pub fn human_readable_size(size_bytes: Option<u64>) -> String {
    let Some(size_bytes) = size_bytes else {
        return "N/A".to_string();
    };
    let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
    if size_mb < 1024.0 {
        format!("{size_mb:.2} MB")
    } else {
        format!("{:.2} GB", size_mb / 1024.0)
    }
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use gramfetch::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Designed for transient network failures while talking to the Bot API;
/// the strategy adds jitter to avoid thundering herd.
///
/// # Errors
///
/// Returns the last error if all attempts fail.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_readable_size_unknown() {
        assert_eq!(human_readable_size(None), "N/A");
    }

    #[test]
    fn test_human_readable_size_megabytes() {
        assert_eq!(human_readable_size(Some(1024 * 1024)), "1.00 MB");
        assert_eq!(human_readable_size(Some(157 * 1024 * 1024)), "157.00 MB");
    }

    #[test]
    fn test_human_readable_size_gigabytes() {
        assert_eq!(
            human_readable_size(Some(3 * 1024 * 1024 * 1024)),
            "3.00 GB"
        );
        // one byte under the MB/GB boundary stays in megabytes
        assert_eq!(
            human_readable_size(Some(1024 * 1024 * 1024 - 1024 * 600)),
            "1023.41 MB"
        );
    }

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }
}
