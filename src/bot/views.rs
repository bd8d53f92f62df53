//! Menus and user-facing texts.
//!
//! The menu builders are pure: given the same rendition list they produce
//! the same ordered option set. Selection ordering here (ascending by
//! size) is deliberately distinct from the provider's descending list
//! order - small options first reads better on a phone keyboard.

use crate::bot::callback::Callback;
use crate::config::{MAX_MENU_BUTTONS, RENDITION_SIZE_CEILING_BYTES};
use crate::delivery::DeliveryError;
use crate::format::{AudioEncoding, DownloadKind, Rendition, BEST_RENDITION_ID};
use crate::platform::PlatformTag;
use crate::utils::truncate_str;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

const MAX_LABEL_CHARS: usize = 32;

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback(
        "❌ Cancel",
        Callback::Cancel.encode(),
    )]
}

/// The fixed platform-choice menu.
#[must_use]
pub fn platform_menu() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for pair in PlatformTag::ALL.chunks(2) {
        rows.push(
            pair.iter()
                .map(|&tag| {
                    InlineKeyboardButton::callback(
                        tag.display_name(),
                        Callback::Platform(tag).encode(),
                    )
                })
                .collect(),
        );
    }
    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

/// The video/audio choice menu for a platform.
#[must_use]
pub fn download_type_menu(platform: PlatformTag) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback(
                "🎬 Video",
                Callback::DownloadType {
                    kind: DownloadKind::Video,
                    platform,
                }
                .encode(),
            ),
            InlineKeyboardButton::callback(
                "🎵 Audio",
                Callback::DownloadType {
                    kind: DownloadKind::Audio,
                    platform,
                }
                .encode(),
            ),
        ],
        cancel_row(),
    ])
}

/// Sort key for video selection ordering: known size, else parsed
/// resolution, else 0.
fn video_sort_key(r: &Rendition) -> u64 {
    r.size_bytes.unwrap_or_else(|| {
        let digits = r.label.strip_suffix('p').unwrap_or(&r.label);
        digits.parse().unwrap_or(0)
    })
}

/// Build the video resolution menu.
///
/// Renditions with a known size above the ceiling are excluded; unknown
/// sizes are never excluded at this stage. Returns `None` when nothing
/// survives.
#[must_use]
pub fn video_rendition_menu(
    renditions: &[Rendition],
    platform: PlatformTag,
) -> Option<InlineKeyboardMarkup> {
    let mut selectable: Vec<&Rendition> = renditions
        .iter()
        .filter(|r| !r.size_bytes.is_some_and(|size| size > RENDITION_SIZE_CEILING_BYTES))
        .collect();
    selectable.sort_by_key(|r| video_sort_key(r));
    selectable.truncate(MAX_MENU_BUTTONS);

    if selectable.is_empty() {
        return None;
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = selectable
        .into_iter()
        .map(|r| {
            vec![InlineKeyboardButton::callback(
                format!("{} ({})", truncate_str(&r.label, MAX_LABEL_CHARS), r.human_size()),
                Callback::VideoRendition {
                    rendition_id: r.id.clone(),
                    platform,
                }
                .encode(),
            )]
        })
        .collect();
    rows.push(cancel_row());
    Some(InlineKeyboardMarkup::new(rows))
}

/// Build the audio quality menu.
///
/// The guaranteed best-effort mp3 option leads; concrete renditions, when
/// the provider supplied any, follow in descending bitrate order. The
/// guaranteed option has no precondition, so this builder cannot come up
/// empty.
#[must_use]
pub fn audio_quality_menu(
    renditions: &[Rendition],
    platform: PlatformTag,
) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        "🎵 Best quality (mp3)",
        Callback::AudioQuality {
            rendition_id: BEST_RENDITION_ID.to_string(),
            encoding: AudioEncoding::Mp3,
            platform,
        }
        .encode(),
    )]];

    let mut concrete: Vec<&Rendition> = renditions.iter().collect();
    concrete.sort_by(|a, b| {
        b.bitrate_kbps
            .unwrap_or(0)
            .cmp(&a.bitrate_kbps.unwrap_or(0))
    });

    for r in concrete.into_iter().take(MAX_MENU_BUTTONS - 1) {
        rows.push(vec![InlineKeyboardButton::callback(
            format!("{} ({})", truncate_str(&r.label, MAX_LABEL_CHARS), r.human_size()),
            Callback::AudioQuality {
                rendition_id: r.id.clone(),
                encoding: AudioEncoding::Mp3,
                platform,
            }
            .encode(),
        )]);
    }

    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

/// Map a delivery failure to the text shown to the user.
#[must_use]
pub fn delivery_failure_text(err: &DeliveryError) -> &'static str {
    match err {
        DeliveryError::MissingFile(_) => "Sorry, the download failed on our side. Try again.",
        DeliveryError::TooLarge { .. } => {
            "The file is larger than 2 GB, which is more than this bot can deliver. Pick a smaller format."
        }
        DeliveryError::RelayNotConfigured => {
            "This file needs the large-file uploader, which is not configured here. Pick a format under 30 MB."
        }
        DeliveryError::RelayLaunch(_)
        | DeliveryError::RelayFailed { .. }
        | DeliveryError::RelayTimeout => {
            "Uploading through the large-file relay failed. Try a smaller format."
        }
        DeliveryError::TransportTimeout => {
            "Upload timed out. The file may be too large or the network too slow."
        }
        DeliveryError::Transport(_) => "An unexpected error occurred while sending your file.",
    }
}
