//! Source platform identification.
//!
//! Classifies a raw URL into one of the supported content hosts by
//! case-insensitive pattern matching. `Other` is the catch-all that the
//! provider registry maps to the default extractor.

use lazy_regex::lazy_regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static RE_YOUTUBE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"youtube\.com|youtu\.be");
static RE_TIKTOK: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"tiktok\.com|vm\.tiktok\.com|vt\.tiktok\.com");

/// Closed set of supported source platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformTag {
    /// youtube.com / youtu.be
    Youtube,
    /// instagram.com
    Instagram,
    /// tiktok.com and its short-link subdomains
    Tiktok,
    /// Anything else, served by the default provider
    Other,
}

impl PlatformTag {
    /// All platforms in menu order
    pub const ALL: [Self; 4] = [Self::Youtube, Self::Instagram, Self::Tiktok, Self::Other];

    /// Wire name used in callback tokens
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Other => "other",
        }
    }

    /// Label shown on the platform menu button
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Youtube => "YouTube",
            Self::Instagram => "Instagram",
            Self::Tiktok => "TikTok",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Self::Youtube),
            "instagram" => Ok(Self::Instagram),
            "tiktok" => Ok(Self::Tiktok),
            "other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

/// Classify a URL into a platform tag. Pure, never fails; unmatched hosts
/// fall through to [`PlatformTag::Other`].
#[must_use]
pub fn identify(url: &str) -> PlatformTag {
    let url = url.to_lowercase();
    if RE_YOUTUBE.is_match(&url) {
        PlatformTag::Youtube
    } else if url.contains("instagram.com") {
        PlatformTag::Instagram
    } else if RE_TIKTOK.is_match(&url) {
        PlatformTag::Tiktok
    } else {
        PlatformTag::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_youtube() {
        assert_eq!(
            identify("https://www.youtube.com/watch?v=abc"),
            PlatformTag::Youtube
        );
        assert_eq!(identify("https://YOUTU.BE/abc"), PlatformTag::Youtube);
    }

    #[test]
    fn test_identify_instagram() {
        assert_eq!(
            identify("https://www.Instagram.com/reel/xyz/"),
            PlatformTag::Instagram
        );
    }

    #[test]
    fn test_identify_tiktok() {
        assert_eq!(
            identify("https://www.tiktok.com/@u/video/1"),
            PlatformTag::Tiktok
        );
        assert_eq!(identify("https://vm.tiktok.com/ZM1/"), PlatformTag::Tiktok);
        assert_eq!(identify("https://vt.tiktok.com/ZS2/"), PlatformTag::Tiktok);
    }

    #[test]
    fn test_identify_fallback() {
        assert_eq!(identify("https://vimeo.com/12345"), PlatformTag::Other);
        assert_eq!(identify("not a url at all"), PlatformTag::Other);
    }

    #[test]
    fn test_identify_is_idempotent() {
        let url = "https://youtu.be/dQw4w9WgXcQ";
        assert_eq!(identify(url), identify(url));
    }

    #[test]
    fn test_tag_round_trip() {
        for tag in PlatformTag::ALL {
            assert_eq!(tag.as_str().parse::<PlatformTag>(), Ok(tag));
        }
        assert_eq!("vimeo".parse::<PlatformTag>(), Err(()));
    }
}
