//! MediAI 仪表盘客户端核心
//!
//! 文件上传登记（UploadRegistry）和助手会话（ConversationSession）两个状态管理器，
//! 均只依赖 `RemoteClient` 能力。

pub mod api;
pub mod chat;
pub mod client;
pub mod error;
pub mod remote;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出远端实现
pub use api::HttpRemoteClient;
