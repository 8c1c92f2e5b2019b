//! Conversation context: the ordered turn log and its compaction policy

mod compaction;
mod history;

pub use compaction::{CompactionConfig, CompactionResult, Compactor};
pub use history::{ConversationMemory, Role, ToolCall, Turn};
