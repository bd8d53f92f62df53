//! Conversation handlers - the state machine driving one download per
//! session.
//!
//! `/start` opens a session and shows the platform menu; button callbacks
//! and the link message walk it forward; a fetch + delivery, a cancel, or
//! the idle window ending all clear the session. Sessions are keyed per
//! chat by the dialogue storage, so concurrent users never share state.

use crate::bot::callback::Callback;
use crate::bot::resilient::{edit_message_safe, send_message_resilient};
use crate::bot::state::State;
use crate::bot::views;
use crate::config::Settings;
use crate::delivery;
use crate::format::{
    AudioEncoding, DownloadKind, FormatProvider, ProviderRegistry, Rendition, BEST_RENDITION_ID,
};
use crate::platform::{identify, PlatformTag};
use crate::utils::human_readable_size;
use anyhow::{anyhow, Result};
use chrono::Utc;
use lazy_regex::lazy_regex;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

static RE_URL: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"^https?://");

/// Caption attached to every delivered file
const DONE_CAPTION: &str = "✅ Done!\nThanks for using this bot 😊";

/// Dialogue handle for the conversation state machine
pub type BotDialogue = Dialogue<State, InMemStorage<State>>;

/// Supported bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Open a fresh session
    #[command(description = "start a new download.")]
    Start,
    /// Abort the current session
    #[command(description = "cancel the current operation.")]
    Cancel,
    /// Liveness probe
    #[command(description = "check that the bot is alive.")]
    Healthcheck,
}

/// Everything a flow step needs to edit the menu message and advance the
/// dialogue
struct Flow<'a> {
    bot: &'a Bot,
    dialogue: &'a BotDialogue,
    registry: &'a ProviderRegistry,
    chat: ChatId,
    msg_id: MessageId,
}

/// `/start` - open a fresh session and show the platform menu.
///
/// # Errors
///
/// Returns an error if the menu cannot be sent or the dialogue updated.
pub async fn start(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    info!(chat_id = msg.chat.id.0, "session opened");
    bot.send_message(msg.chat.id, "Welcome! 👋\nPick a platform:")
        .reply_markup(views::platform_menu())
        .await?;
    dialogue
        .update(State::SelectPlatform { touched: Utc::now() })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// `/cancel` - clear the session from any state.
///
/// # Errors
///
/// Returns an error if the confirmation cannot be sent.
pub async fn cancel(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
    bot.send_message(msg.chat.id, "Operation cancelled.").await?;
    Ok(())
}

/// `/healthcheck`
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn healthcheck(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, "OK").await?;
    Ok(())
}

/// Route a plain message through the current state.
///
/// # Errors
///
/// Returns an error on Telegram API or dialogue storage failures.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    registry: Arc<ProviderRegistry>,
) -> Result<()> {
    let state = dialogue
        .get()
        .await
        .map_err(|e| anyhow!(e.to_string()))?
        .unwrap_or_default();

    if state.is_expired(Utc::now()) {
        dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
        bot.send_message(
            msg.chat.id,
            "Session expired due to inactivity. Send /start to begin again.",
        )
        .await?;
        return Ok(());
    }

    match state {
        State::AwaitLink { platform, kind, .. } => {
            handle_link(&bot, &msg, &dialogue, &registry, platform, kind).await
        }
        State::Idle => {
            bot.send_message(msg.chat.id, "Send /start to begin.").await?;
            Ok(())
        }
        _ => {
            bot.send_message(msg.chat.id, "Use the buttons above, or /cancel to start over.")
                .await?;
            Ok(())
        }
    }
}

/// A message received while a link is expected.
async fn handle_link(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    registry: &ProviderRegistry,
    platform: PlatformTag,
    kind: DownloadKind,
) -> Result<()> {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send the link as plain text.")
            .await?;
        return Ok(());
    };
    let url = text.trim().to_string();
    if !RE_URL.is_match(&url) {
        bot.send_message(msg.chat.id, "That does not look like a link. Try again.")
            .await?;
        return Ok(());
    }

    let detected = identify(&url);
    let effective = if platform == PlatformTag::Other {
        detected
    } else {
        if detected != platform && detected != PlatformTag::Other {
            info!(chosen = %platform, detected = %detected, "link host differs from chosen platform");
        }
        platform
    };

    let status = send_message_resilient(bot, msg.chat.id, "🔎 Fetching available formats...").await?;
    let flow = Flow {
        bot,
        dialogue,
        registry,
        chat: msg.chat.id,
        msg_id: status.id,
    };

    match kind {
        DownloadKind::Video => present_video_menu(&flow, platform, effective, url).await,
        DownloadKind::Audio => present_audio_menu(&flow, effective, url).await,
    }
}

/// Recoverable dead end: explain and fall back to the download-kind menu.
async fn route_back_to_kind(flow: &Flow<'_>, platform: PlatformTag, reason: &str) -> Result<()> {
    let text = format!("{reason}\nWhat do you want to download?");
    edit_message_safe(
        flow.bot,
        flow.chat,
        flow.msg_id,
        &text,
        Some(views::download_type_menu(platform)),
    )
    .await;
    flow.dialogue
        .update(State::SelectDownloadType {
            platform,
            touched: Utc::now(),
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

async fn present_video_menu(
    flow: &Flow<'_>,
    chosen: PlatformTag,
    effective: PlatformTag,
    url: String,
) -> Result<()> {
    let renditions = flow.registry.get(effective).list_video_renditions(&url).await;
    if renditions.is_empty() {
        return route_back_to_kind(
            flow,
            chosen,
            "Could not find any formats. Make sure the link is correct and public.",
        )
        .await;
    }

    let Some(menu) = views::video_rendition_menu(&renditions, effective) else {
        return route_back_to_kind(
            flow,
            chosen,
            "Sorry, no formats under 2 GB were found for that video.",
        )
        .await;
    };

    edit_message_safe(flow.bot, flow.chat, flow.msg_id, "Pick a resolution:", Some(menu)).await;
    flow.dialogue
        .update(State::SelectVideoRendition {
            platform: effective,
            url,
            renditions,
            touched: Utc::now(),
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

async fn present_audio_menu(flow: &Flow<'_>, effective: PlatformTag, url: String) -> Result<()> {
    // an absent ladder is fine: the menu always carries the guaranteed
    // best-effort option
    let renditions = flow
        .registry
        .get(effective)
        .list_audio_renditions(&url)
        .await
        .unwrap_or_default();
    let menu = views::audio_quality_menu(&renditions, effective);

    edit_message_safe(flow.bot, flow.chat, flow.msg_id, "Pick audio quality:", Some(menu)).await;
    flow.dialogue
        .update(State::SelectAudioQuality {
            platform: effective,
            url,
            renditions,
            touched: Utc::now(),
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// What the user picked off a rendition menu
enum Choice {
    Video {
        rendition_id: String,
    },
    Audio {
        rendition_id: String,
        encoding: AudioEncoding,
    },
}

impl Choice {
    const fn kind(&self) -> DownloadKind {
        match self {
            Self::Video { .. } => DownloadKind::Video,
            Self::Audio { .. } => DownloadKind::Audio,
        }
    }
}

/// Route a button press through the current state.
///
/// # Errors
///
/// Returns an error on Telegram API or dialogue storage failures.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BotDialogue,
    registry: Arc<ProviderRegistry>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let flow = Flow {
        bot: &bot,
        dialogue: &dialogue,
        registry: &registry,
        chat: message.chat().id,
        msg_id: message.id(),
    };

    let Some(callback) = Callback::parse(data) else {
        warn!(data, "unparseable callback token");
        edit_message_safe(&bot, flow.chat, flow.msg_id, "Invalid selection data.", None).await;
        dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
        return Ok(());
    };

    let state = dialogue
        .get()
        .await
        .map_err(|e| anyhow!(e.to_string()))?
        .unwrap_or_default();

    if state.is_expired(Utc::now()) {
        dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
        edit_message_safe(
            &bot,
            flow.chat,
            flow.msg_id,
            "Session expired due to inactivity. Send /start to begin again.",
            None,
        )
        .await;
        return Ok(());
    }

    dispatch_callback(&flow, &settings, callback, state).await
}

/// Reconcile a parsed token with the current state; anything that does not
/// line up is a stale menu, not an error.
async fn dispatch_callback(
    flow: &Flow<'_>,
    settings: &Settings,
    callback: Callback,
    state: State,
) -> Result<()> {
    match (callback, state) {
        (Callback::Cancel, _) => {
            edit_message_safe(flow.bot, flow.chat, flow.msg_id, "Operation cancelled.", None)
                .await;
            flow.dialogue
                .exit()
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            Ok(())
        }
        (Callback::Platform(tag), State::SelectPlatform { .. }) => {
            platform_chosen(flow, tag).await
        }
        (Callback::DownloadType { kind, platform }, State::SelectDownloadType { .. }) => {
            kind_chosen(flow, platform, kind).await
        }
        (
            Callback::VideoRendition {
                rendition_id,
                platform,
            },
            State::SelectVideoRendition { url, renditions, .. },
        ) if known_rendition(&renditions, &rendition_id) => {
            finalize(flow, settings, platform, &url, Choice::Video { rendition_id }).await
        }
        (
            Callback::AudioQuality {
                rendition_id,
                encoding,
                platform,
            },
            State::SelectAudioQuality { url, renditions, .. },
        ) if rendition_id == BEST_RENDITION_ID || known_rendition(&renditions, &rendition_id) => {
            finalize(
                flow,
                settings,
                platform,
                &url,
                Choice::Audio {
                    rendition_id,
                    encoding,
                },
            )
            .await
        }
        _ => {
            edit_message_safe(
                flow.bot,
                flow.chat,
                flow.msg_id,
                "That menu is no longer active. Send /start to begin again.",
                None,
            )
            .await;
            Ok(())
        }
    }
}

fn known_rendition(renditions: &[Rendition], id: &str) -> bool {
    renditions.iter().any(|r| r.id == id)
}

async fn platform_chosen(flow: &Flow<'_>, tag: PlatformTag) -> Result<()> {
    edit_message_safe(
        flow.bot,
        flow.chat,
        flow.msg_id,
        &format!(
            "You picked {}.\nWhat do you want to download?",
            tag.display_name()
        ),
        Some(views::download_type_menu(tag)),
    )
    .await;
    flow.dialogue
        .update(State::SelectDownloadType {
            platform: tag,
            touched: Utc::now(),
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

async fn kind_chosen(flow: &Flow<'_>, platform: PlatformTag, kind: DownloadKind) -> Result<()> {
    edit_message_safe(
        flow.bot,
        flow.chat,
        flow.msg_id,
        &format!("Send me the {} link:", platform.display_name()),
        None,
    )
    .await;
    flow.dialogue
        .update(State::AwaitLink {
            platform,
            kind,
            touched: Utc::now(),
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Fetch the chosen rendition and hand it to the delivery router. The
/// session is cleared whatever the outcome.
async fn finalize(
    flow: &Flow<'_>,
    settings: &Settings,
    platform: PlatformTag,
    url: &str,
    choice: Choice,
) -> Result<()> {
    let kind = choice.kind();
    edit_message_safe(
        flow.bot,
        flow.chat,
        flow.msg_id,
        "⚙️ Downloading... this can take a while.",
        None,
    )
    .await;
    let action = match kind {
        DownloadKind::Video => ChatAction::UploadVideo,
        DownloadKind::Audio => ChatAction::UploadVoice,
    };
    let _ = flow.bot.send_chat_action(flow.chat, action).await;

    let provider = flow.registry.get(platform);
    let fetched = match &choice {
        Choice::Video { rendition_id } => provider.fetch_video(url, rendition_id).await,
        Choice::Audio {
            rendition_id,
            encoding,
        } => provider.fetch_audio(url, rendition_id, *encoding).await,
    };

    match fetched {
        None => {
            edit_message_safe(
                flow.bot,
                flow.chat,
                flow.msg_id,
                "Sorry, the download failed on our side. Try another format or link.",
                None,
            )
            .await;
        }
        Some(path) => {
            let size = tokio::fs::metadata(&path).await.map(|m| m.len()).ok();
            edit_message_safe(
                flow.bot,
                flow.chat,
                flow.msg_id,
                &format!("⬆️ Uploading ({})...", human_readable_size(size)),
                None,
            )
            .await;

            match delivery::deliver(flow.bot, settings, &path, flow.chat, DONE_CAPTION, kind).await
            {
                Ok(_) => {
                    // the file message is the confirmation; drop the
                    // progress message like the menu it grew out of
                    let _ = flow.bot.delete_message(flow.chat, flow.msg_id).await;
                }
                Err(e) => {
                    warn!(url, error = %e, "delivery failed");
                    edit_message_safe(
                        flow.bot,
                        flow.chat,
                        flow.msg_id,
                        views::delivery_failure_text(&e),
                        None,
                    )
                    .await;
                }
            }
        }
    }

    flow.dialogue
        .exit()
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}
