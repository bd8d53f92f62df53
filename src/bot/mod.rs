/// Callback token encoding for inline keyboards
pub mod callback;
/// Command, message and callback handlers
pub mod handlers;
/// Resilient Telegram API wrappers
pub mod resilient;
/// User state and dialogue management
pub mod state;
/// Menus and user-facing texts
pub mod views;
