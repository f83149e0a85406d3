#[path = "handlers/chat.rs"]
mod chat;

#[path = "handlers/conversations.rs"]
mod conversations;

#[path = "handlers/helpers.rs"]
mod helpers;

pub use chat::handle_chat_stream;
pub use conversations::{delete_conversation, get_conversation, health};
