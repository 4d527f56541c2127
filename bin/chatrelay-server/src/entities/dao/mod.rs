pub mod conversation;
pub mod message;

pub use conversation::Conversation;
pub use message::{Message, MessageRole};
