pub mod dashboard;

// 重新导出常用类型，方便外部使用
pub use dashboard::{
    chat::{ConversationSession, ConversationTurn, SyncOutcome},
    client::{ClientConfig, DashboardClient},
    error::DashboardError,
    remote::{FileLocator, QueryReply, RemoteClient, RemoteError},
    upload::{FileId, FileState, LocalFile, TrackedFile, UploadRegistry, UploadTask},
};
