pub mod chat;
pub mod conversation;
pub mod message;
pub mod status;
pub mod timestamp;

pub use chat::{ChatRequest, ChatResponse};
pub use conversation::{
    ConversationDetail, ConversationList, ConversationSummary, ThreadId, UNTITLED_CONVERSATION,
};
pub use message::{Message, Role};
pub use status::{HealthResponse, StatsResponse, HEALTHY_STATUS};
pub use timestamp::Timestamp;
