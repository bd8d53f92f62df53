//! Per-chat dialogue state.
//!
//! Each variant carries exactly the data populated so far, so a transition
//! into a state whose prerequisites are missing is unrepresentable. The
//! dialogue storage keyed by chat id is the session store: created on
//! `/start`, cleared on every terminal transition.

use crate::config::SESSION_IDLE_TIMEOUT_SECS;
use crate::format::{DownloadKind, Rendition};
use crate::platform::PlatformTag;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Represents the current state of the user dialogue
#[derive(Clone, Serialize, Deserialize, Default)]
pub enum State {
    /// No active session
    #[default]
    Idle,
    /// Platform menu is showing
    SelectPlatform {
        /// Last user action
        touched: DateTime<Utc>,
    },
    /// Download-kind menu is showing
    SelectDownloadType {
        /// Chosen source platform
        platform: PlatformTag,
        /// Last user action
        touched: DateTime<Utc>,
    },
    /// Waiting for the user to paste a link
    AwaitLink {
        /// Chosen source platform
        platform: PlatformTag,
        /// Chosen download kind
        kind: DownloadKind,
        /// Last user action
        touched: DateTime<Utc>,
    },
    /// Video resolution menu is showing
    SelectVideoRendition {
        /// Platform the link resolved to
        platform: PlatformTag,
        /// Accepted source URL
        url: String,
        /// Candidate renditions backing the menu
        renditions: Vec<Rendition>,
        /// Last user action
        touched: DateTime<Utc>,
    },
    /// Audio quality menu is showing
    SelectAudioQuality {
        /// Platform the link resolved to
        platform: PlatformTag,
        /// Accepted source URL
        url: String,
        /// Candidate renditions backing the menu (may be empty; the menu
        /// always carries the guaranteed best-effort option)
        renditions: Vec<Rendition>,
        /// Last user action
        touched: DateTime<Utc>,
    },
}

impl State {
    /// Timestamp of the last user action, `None` when idle
    #[must_use]
    pub fn touched(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Idle => None,
            Self::SelectPlatform { touched }
            | Self::SelectDownloadType { touched, .. }
            | Self::AwaitLink { touched, .. }
            | Self::SelectVideoRendition { touched, .. }
            | Self::SelectAudioQuality { touched, .. } => Some(*touched),
        }
    }

    /// Whether the bounded idle window has elapsed. Idle never expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.touched().is_some_and(|touched| {
            now - touched > Duration::seconds(SESSION_IDLE_TIMEOUT_SECS)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_never_expires() {
        let state = State::Idle;
        assert!(!state.is_expired(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_expiry_window() {
        let touched = Utc::now();
        let state = State::SelectPlatform { touched };
        assert!(!state.is_expired(touched + Duration::seconds(SESSION_IDLE_TIMEOUT_SECS - 1)));
        assert!(state.is_expired(touched + Duration::seconds(SESSION_IDLE_TIMEOUT_SECS + 1)));
    }
}
