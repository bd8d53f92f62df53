//! Delegated large-file relay.
//!
//! Invoked as an isolated, single-purpose process by the delivery router:
//!
//! ```text
//! relay <chat_id> <file_path> <caption>
//! ```
//!
//! The relay reads its own identity from the environment (`RELAY_BOT_TOKEN`,
//! optional `RELAY_API_URL` pointing at a self-hosted Bot API server that
//! lifts the upload ceiling). Exit code 0 is the sole success signal and
//! implies the file has been deleted here; any failure exits 1 and leaves
//! the file for the caller to clean up.

use dotenvy::dotenv;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "ogg", "opus", "aac", "flac", "wav"];

#[tokio::main]
async fn main() {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 3 {
        error!("usage: relay <chat_id> <file_path> <caption>");
        return 1;
    }

    let Ok(chat_id) = args[0].parse::<i64>() else {
        error!(raw = %args[0], "chat id is not a valid number");
        return 1;
    };
    let path = Path::new(&args[1]);
    if !path.exists() {
        error!(path = %path.display(), "file not found");
        return 1;
    }
    let caption = args[2].clone();

    let Ok(token) = std::env::var("RELAY_BOT_TOKEN") else {
        error!("RELAY_BOT_TOKEN is not set");
        return 1;
    };
    let mut bot = Bot::new(token);
    if let Ok(api_url) = std::env::var("RELAY_API_URL") {
        if !api_url.is_empty() {
            match reqwest::Url::parse(&api_url) {
                Ok(url) => bot = bot.set_api_url(url),
                Err(e) => {
                    error!(api_url, error = %e, "RELAY_API_URL is not a valid URL");
                    return 1;
                }
            }
        }
    }

    info!(chat_id, path = %path.display(), "relay: sending file");
    match send_file(&bot, ChatId(chat_id), path, &caption).await {
        Ok(()) => {
            info!("relay: send confirmed");
            // success implies cleanup; a failed removal is not a failed send
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "relay: failed to remove file");
            }
            0
        }
        Err(e) => {
            error!(error = %e, "relay: send failed");
            1
        }
    }
}

async fn send_file(
    bot: &Bot,
    chat: ChatId,
    path: &Path,
    caption: &str,
) -> Result<(), teloxide::RequestError> {
    let payload = InputFile::file(path.to_path_buf());
    let is_audio = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()));

    if is_audio {
        bot.send_audio(chat, payload).caption(caption).await?;
    } else {
        bot.send_video(chat, payload)
            .caption(caption)
            .supports_streaming(true)
            .await?;
    }
    Ok(())
}
