//! 文件上传登记模块
//!
//! 维护客户端视角下"有哪些文件、处于什么状态"，并与服务端文件列表对账

pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use listener::{EmptyUploadListener, UploadListener};
pub use models::{FileId, FileOrigin, FileState, LocalFile, TrackedFile};
pub use service::{UploadRegistry, UploadTask};
