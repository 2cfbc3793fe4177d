//! 远端能力接口
//!
//! 文档存储和助手服务统一抽象为 `RemoteClient`，状态管理器只通过它访问网络。

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// 远端调用失败的原因
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// 连接失败、超时等传输层错误
    #[error("请求失败: {0}")]
    Transport(String),
    /// 服务端返回非 2xx 状态
    #[error("HTTP 错误 {status}: {body}")]
    Status { status: u16, body: String },
    /// 响应体无法解析为约定的格式
    #[error("响应格式错误: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

/// 助手查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryReply {
    /// 响应中带有非空的 `response` 字段
    Answer(String),
    /// 响应是合法 JSON，但缺少 `response` 字段
    Malformed,
}

/// 文件预览地址，由外部查看器解析
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocator(String);

impl FileLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 远端能力（文档存储 + 助手服务）
///
/// 所有网络方法都不重试、不超时，失败原样返回给调用方处理。
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// 获取服务端已有的文件名列表
    async fn list_files(&self) -> Result<Vec<String>, RemoteError>;

    /// 上传文件内容
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        name: &str,
        media_kind: &str,
    ) -> Result<(), RemoteError>;

    /// 按文件名删除服务端文件
    async fn delete_file(&self, name: &str) -> Result<(), RemoteError>;

    /// 向助手发起一次查询
    async fn query_assistant(&self, text: &str) -> Result<QueryReply, RemoteError>;

    /// 检查同步状态，返回内容对客户端不透明
    async fn check_sync_status(&self) -> Result<serde_json::Value, RemoteError>;

    /// 生成文件预览地址（纯命名约定，不访问网络）
    fn resolve_file_locator(&self, name: &str) -> FileLocator;
}
