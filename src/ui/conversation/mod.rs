//! Conversation UI components for the chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod palette;
pub mod scroll;
pub mod store;

pub use commands::get_help_text;
pub use manager::{ConversationAction, ConversationManager};
