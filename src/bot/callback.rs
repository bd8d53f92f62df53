//! Callback token encoding for inline keyboard buttons.
//!
//! Tokens are compact strings carrying enough information for the
//! controller to resume without re-querying a provider:
//!
//! - `platform_<tag>`
//! - `dltype_<kind>_<platform>`
//! - `res_video_<renditionId>_<platform>`
//! - `res_audio_<renditionIdOrBest>[-<encoding>]_<platform>`
//! - `cancel`
//!
//! The audio token uses `-` to separate a rendition id from the target
//! encoding; ids containing `-` without a trailing encoding still parse,
//! with the encoding defaulting to mp3.

use crate::format::{AudioEncoding, DownloadKind};
use crate::platform::PlatformTag;

/// Parsed button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// Platform menu choice
    Platform(PlatformTag),
    /// Download-kind menu choice
    DownloadType {
        /// Chosen kind
        kind: DownloadKind,
        /// Platform the menu was built for
        platform: PlatformTag,
    },
    /// Video resolution menu choice
    VideoRendition {
        /// Opaque rendition id, round-trips to the provider
        rendition_id: String,
        /// Platform the menu was built for
        platform: PlatformTag,
    },
    /// Audio quality menu choice
    AudioQuality {
        /// Opaque rendition id, or `best` for the guaranteed option
        rendition_id: String,
        /// Target encoding
        encoding: AudioEncoding,
        /// Platform the menu was built for
        platform: PlatformTag,
    },
    /// The cancel button, accepted in any state
    Cancel,
}

impl Callback {
    /// Render the token embedded in a button payload.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Platform(tag) => format!("platform_{tag}"),
            Self::DownloadType { kind, platform } => format!("dltype_{kind}_{platform}"),
            Self::VideoRendition {
                rendition_id,
                platform,
            } => format!("res_video_{rendition_id}_{platform}"),
            Self::AudioQuality {
                rendition_id,
                encoding,
                platform,
            } => format!("res_audio_{rendition_id}-{encoding}_{platform}"),
            Self::Cancel => "cancel".to_string(),
        }
    }

    /// Parse a token; `None` for anything malformed or unknown.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        if data == "cancel" {
            return Some(Self::Cancel);
        }
        if let Some(rest) = data.strip_prefix("platform_") {
            return rest.parse().ok().map(Self::Platform);
        }
        if let Some(rest) = data.strip_prefix("dltype_") {
            let (kind, platform) = rest.split_once('_')?;
            return Some(Self::DownloadType {
                kind: kind.parse().ok()?,
                platform: platform.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("res_video_") {
            let (rendition_id, platform) = rest.rsplit_once('_')?;
            if rendition_id.is_empty() {
                return None;
            }
            return Some(Self::VideoRendition {
                rendition_id: rendition_id.to_string(),
                platform: platform.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("res_audio_") {
            let (body, platform) = rest.rsplit_once('_')?;
            if body.is_empty() {
                return None;
            }
            let platform = platform.parse().ok()?;
            // a trailing `-<encoding>` is optional; an id containing `-`
            // with no recognizable suffix is taken whole
            let (rendition_id, encoding) = match body.rsplit_once('-') {
                Some((id, enc)) if !id.is_empty() => match enc.parse::<AudioEncoding>() {
                    Ok(encoding) => (id.to_string(), encoding),
                    Err(()) => (body.to_string(), AudioEncoding::default()),
                },
                _ => (body.to_string(), AudioEncoding::default()),
            };
            return Some(Self::AudioQuality {
                rendition_id,
                encoding,
                platform,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip() {
        for tag in PlatformTag::ALL {
            let token = Callback::Platform(tag).encode();
            assert_eq!(Callback::parse(&token), Some(Callback::Platform(tag)));
        }
    }

    #[test]
    fn test_download_type_round_trip() {
        let cb = Callback::DownloadType {
            kind: DownloadKind::Audio,
            platform: PlatformTag::Youtube,
        };
        assert_eq!(cb.encode(), "dltype_audio_youtube");
        assert_eq!(Callback::parse("dltype_audio_youtube"), Some(cb));
    }

    #[test]
    fn test_video_rendition_round_trip() {
        let cb = Callback::VideoRendition {
            rendition_id: "hls-720".to_string(),
            platform: PlatformTag::Tiktok,
        };
        assert_eq!(cb.encode(), "res_video_hls-720_tiktok");
        assert_eq!(Callback::parse(&cb.encode()), Some(cb));
    }

    #[test]
    fn test_audio_with_encoding_round_trip() {
        let cb = Callback::AudioQuality {
            rendition_id: "best".to_string(),
            encoding: AudioEncoding::Mp3,
            platform: PlatformTag::Instagram,
        };
        assert_eq!(cb.encode(), "res_audio_best-mp3_instagram");
        assert_eq!(Callback::parse("res_audio_best-mp3_instagram"), Some(cb));
    }

    #[test]
    fn test_audio_dash_in_id_without_encoding() {
        // "hls-160" holds a dash but no recognizable encoding suffix; the
        // id is taken whole and the encoding defaults
        assert_eq!(
            Callback::parse("res_audio_hls-160_youtube"),
            Some(Callback::AudioQuality {
                rendition_id: "hls-160".to_string(),
                encoding: AudioEncoding::Mp3,
                platform: PlatformTag::Youtube,
            })
        );
    }

    #[test]
    fn test_audio_dash_in_id_with_encoding() {
        assert_eq!(
            Callback::parse("res_audio_hls-160-m4a_youtube"),
            Some(Callback::AudioQuality {
                rendition_id: "hls-160".to_string(),
                encoding: AudioEncoding::M4a,
                platform: PlatformTag::Youtube,
            })
        );
    }

    #[test]
    fn test_cancel() {
        assert_eq!(Callback::parse("cancel"), Some(Callback::Cancel));
        assert_eq!(Callback::Cancel.encode(), "cancel");
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert_eq!(Callback::parse(""), None);
        assert_eq!(Callback::parse("platform_vimeo"), None);
        assert_eq!(Callback::parse("dltype_video"), None);
        assert_eq!(Callback::parse("res_video__youtube"), None);
        assert_eq!(Callback::parse("res_audio_"), None);
        assert_eq!(Callback::parse("unknown_token"), None);
    }
}
