//! Size-tiered delivery of downloaded files.
//!
//! A file at or below the direct-upload ceiling goes inline through the
//! Bot API; between that and the relay ceiling it is handed to the
//! delegated relay process; above the relay ceiling it is rejected without
//! a transport attempt.
//!
//! Cleanup ownership is single and explicit: the router deletes the local
//! file on every terminal outcome - success or failure, direct or
//! rejected - with exactly one exception: a relay process that exits 0 has
//! already deleted the file itself, so ownership transfers there and
//! nowhere else.

use crate::config::{
    Settings, DIRECT_UPLOAD_LIMIT_BYTES, RELAY_UPLOAD_LIMIT_BYTES, RELAY_WAIT_TIMEOUT_SECS,
};
use crate::format::DownloadKind;
use std::path::Path;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use thiserror::Error;
use tracing::{info, warn};

/// Which transport path a payload takes, decided purely by size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Inline through the Bot API
    Direct,
    /// Through the delegated relay process
    Relayed,
    /// No transport attempt at all
    Rejected,
}

impl Route {
    /// Pick the route for a payload of `size` bytes.
    #[must_use]
    pub const fn for_size(size: u64) -> Self {
        if size <= DIRECT_UPLOAD_LIMIT_BYTES {
            Self::Direct
        } else if size <= RELAY_UPLOAD_LIMIT_BYTES {
            Self::Relayed
        } else {
            Self::Rejected
        }
    }
}

/// Terminal delivery failure. The local file has been removed by the time
/// any of these is returned.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The downloaded file vanished before delivery started
    #[error("local file missing: {0}")]
    MissingFile(String),

    /// Payload exceeds even the relay ceiling
    #[error("file of {size} bytes exceeds the relay ceiling")]
    TooLarge {
        /// Size of the rejected payload
        size: u64,
    },

    /// The payload needs the relay, but its identity is not configured
    #[error("relay identity is not configured")]
    RelayNotConfigured,

    /// The relay process could not be launched or awaited
    #[error("relay process could not be run: {0}")]
    RelayLaunch(#[source] std::io::Error),

    /// The relay process exited nonzero
    #[error("relay process failed with exit code {code:?}")]
    RelayFailed {
        /// Exit code when the process was not killed by a signal
        code: Option<i32>,
    },

    /// The relay process outlived its bounded wait
    #[error("relay process timed out")]
    RelayTimeout,

    /// The Bot API timed out while streaming the payload
    #[error("transport timed out while sending the file")]
    TransportTimeout,

    /// The Bot API rejected the payload
    #[error("transport rejected the file: {0}")]
    Transport(#[source] teloxide::RequestError),
}

/// Successful delivery, tagged with the path the payload took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent inline through the Bot API
    Direct,
    /// Handed off to the relay, which confirmed the send
    Relayed,
}

/// Deliver a local file to a chat and reclaim the local storage.
///
/// Exactly one of {direct transport call, relay invocation, no attempt}
/// happens per call.
///
/// # Errors
///
/// Returns a [`DeliveryError`] describing the terminal failure; see the
/// module docs for cleanup ownership.
pub async fn deliver(
    bot: &Bot,
    settings: &Settings,
    local_path: &Path,
    chat: ChatId,
    caption: &str,
    kind: DownloadKind,
) -> Result<Delivery, DeliveryError> {
    let size = match tokio::fs::metadata(local_path).await {
        Ok(meta) => meta.len(),
        Err(_) => {
            return Err(DeliveryError::MissingFile(
                local_path.display().to_string(),
            ))
        }
    };

    match Route::for_size(size) {
        Route::Direct => {
            let result = send_direct(bot, local_path, chat, caption, kind).await;
            remove_local(local_path).await;
            result.map(|()| Delivery::Direct)
        }
        Route::Relayed => match relay_upload(settings, local_path, chat, caption).await {
            Ok(()) => Ok(Delivery::Relayed),
            Err(e) => {
                remove_local(local_path).await;
                Err(e)
            }
        },
        Route::Rejected => {
            warn!(size, path = %local_path.display(), "payload exceeds relay ceiling");
            remove_local(local_path).await;
            Err(DeliveryError::TooLarge { size })
        }
    }
}

async fn send_direct(
    bot: &Bot,
    local_path: &Path,
    chat: ChatId,
    caption: &str,
    kind: DownloadKind,
) -> Result<(), DeliveryError> {
    let payload = InputFile::file(local_path.to_path_buf());
    let sent = match kind {
        DownloadKind::Video => {
            bot.send_video(chat, payload)
                .caption(caption)
                .supports_streaming(true)
                .await
        }
        DownloadKind::Audio => bot.send_audio(chat, payload).caption(caption).await,
    };

    match sent {
        Ok(_) => {
            info!(path = %local_path.display(), "file sent through direct transport");
            Ok(())
        }
        Err(e) if is_timeout(&e) => Err(DeliveryError::TransportTimeout),
        Err(e) => Err(DeliveryError::Transport(e)),
    }
}

fn is_timeout(err: &teloxide::RequestError) -> bool {
    matches!(err, teloxide::RequestError::Network(e) if e.is_timeout())
}

/// Run the relay process and interpret its exit status as the sole success
/// signal. On exit 0 the relay has deleted the file itself.
async fn relay_upload(
    settings: &Settings,
    local_path: &Path,
    chat: ChatId,
    caption: &str,
) -> Result<(), DeliveryError> {
    let Some(relay) = settings.relay() else {
        warn!("relay tier hit without a configured relay identity");
        return Err(DeliveryError::RelayNotConfigured);
    };

    let mut child = tokio::process::Command::new(&relay.command)
        .arg(chat.0.to_string())
        .arg(local_path)
        .arg(caption)
        .env("RELAY_BOT_TOKEN", &relay.bot_token)
        .env("RELAY_API_URL", &relay.api_url)
        .kill_on_drop(true)
        .spawn()
        .map_err(DeliveryError::RelayLaunch)?;

    info!(command = %relay.command, path = %local_path.display(), "relay process started");

    let wait = Duration::from_secs(RELAY_WAIT_TIMEOUT_SECS);
    let status = match tokio::time::timeout(wait, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return Err(DeliveryError::RelayLaunch(e)),
        Err(_) => {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill timed-out relay process");
            }
            return Err(DeliveryError::RelayTimeout);
        }
    };

    if status.success() {
        info!(path = %local_path.display(), "relay confirmed the send");
        Ok(())
    } else {
        Err(DeliveryError::RelayFailed {
            code: status.code(),
        })
    }
}

/// Best-effort removal; a failed cleanup is logged and swallowed.
async fn remove_local(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "local file removed"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove local file"),
    }
}
