#![deny(missing_docs)]
//! gramfetch - a conversational Telegram media fetcher
//!
//! A Telegram bot that walks a user through platform, download kind and
//! quality selection, fetches the chosen rendition through yt-dlp, and
//! delivers the file either directly or through a delegated relay process
//! for payloads above the direct-upload ceiling.

/// Telegram bot implementation (dialogue state machine, menus, handlers)
pub mod bot;
/// Configuration management
pub mod config;
/// Size-tiered delivery of downloaded files
pub mod delivery;
/// Format providers backed by yt-dlp
pub mod format;
/// Source platform identification
pub mod platform;
pub mod utils;
