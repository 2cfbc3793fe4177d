//! 客户端核心的错误分类
//!
//! 这些错误都不会导致进程退出：上传失败落到文件条目的 `Error` 状态，
//! 查询失败落到会话中的占位回复，其余（列表、删除、同步）返回给调用方并记录日志。

use crate::dashboard::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// 文件列表响应格式错误或不可达
    #[error("文件列表不可用: {0}")]
    ListUnavailable(#[source] RemoteError),

    /// 上传被拒绝或服务不可达
    #[error("文件上传失败 [{name}]: {source}")]
    TransferFailure { name: String, source: RemoteError },

    /// 删除被拒绝或服务不可达
    #[error("文件删除失败 [{name}]: {source}")]
    DeletionFailure { name: String, source: RemoteError },

    /// 助手响应缺少 response 字段
    #[error("助手响应缺少 response 字段")]
    QueryMalformed,

    /// 助手服务不可达
    #[error("助手服务不可达: {0}")]
    QueryUnreachable(#[source] RemoteError),

    /// 同步状态检查失败
    #[error("同步状态检查失败: {0}")]
    SyncFailure(#[source] RemoteError),
}
