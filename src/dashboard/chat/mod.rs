//! 助手会话模块
//!
//! 线性会话记录、请求/响应回合，以及独立于会话记录的"同步"操作

pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use listener::{ConversationListener, EmptyConversationListener};
pub use models::{Author, ConversationTurn, SyncOutcome, TurnKind};
pub use service::ConversationSession;
