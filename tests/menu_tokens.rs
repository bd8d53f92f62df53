//! Every button a menu produces must carry a token the callback parser
//! accepts - otherwise a click would dead-end the conversation.

use gramfetch::bot::callback::Callback;
use gramfetch::bot::views::{
    audio_quality_menu, download_type_menu, platform_menu, video_rendition_menu,
};
use gramfetch::format::{DownloadKind, Rendition};
use gramfetch::platform::PlatformTag;
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

fn tokens(markup: &InlineKeyboardMarkup) -> Vec<String> {
    markup
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|b| match &b.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

fn assert_all_parse(markup: &InlineKeyboardMarkup) {
    for token in tokens(markup) {
        assert!(
            Callback::parse(&token).is_some(),
            "token {token:?} does not parse"
        );
    }
}

fn sample_renditions(kind: DownloadKind) -> Vec<Rendition> {
    vec![
        Rendition {
            id: "hls-audio-160".to_string(),
            kind,
            label: "160k".to_string(),
            ext: "m4a".to_string(),
            size_bytes: Some(4 * 1024 * 1024),
            bitrate_kbps: Some(160),
            has_audio: true,
        },
        Rendition {
            id: "22".to_string(),
            kind,
            label: "720p".to_string(),
            ext: "mp4".to_string(),
            size_bytes: None,
            bitrate_kbps: None,
            has_audio: true,
        },
    ]
}

#[test]
fn platform_menu_tokens_round_trip() {
    let menu = platform_menu();
    assert_eq!(tokens(&menu).len(), PlatformTag::ALL.len() + 1);
    assert_all_parse(&menu);
}

#[test]
fn download_type_menu_tokens_round_trip() {
    for tag in PlatformTag::ALL {
        assert_all_parse(&download_type_menu(tag));
    }
}

#[test]
fn video_menu_tokens_round_trip() {
    let renditions = sample_renditions(DownloadKind::Video);
    for tag in PlatformTag::ALL {
        let menu = video_rendition_menu(&renditions, tag).expect("menu");
        assert_all_parse(&menu);
    }
}

#[test]
fn audio_menu_tokens_round_trip_even_with_dashed_ids() {
    let renditions = sample_renditions(DownloadKind::Audio);
    for tag in PlatformTag::ALL {
        let menu = audio_quality_menu(&renditions, tag);
        assert_all_parse(&menu);

        // the dashed id must survive the encode/parse cycle intact
        let all = tokens(&menu);
        let dashed = all
            .iter()
            .find(|t| t.contains("hls-audio-160"))
            .expect("dashed id token present");
        match Callback::parse(dashed) {
            Some(Callback::AudioQuality { rendition_id, .. }) => {
                assert_eq!(rendition_id, "hls-audio-160");
            }
            other => panic!("unexpected parse result: {other:?}"),
        }
    }
}
