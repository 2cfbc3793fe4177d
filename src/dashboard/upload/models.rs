//! 上传登记的本地模型定义

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// 文件条目的唯一标识
///
/// 服务端发现的文件以文件名作为标识；本地上传一律使用新生成的 UUID，
/// 保证同名文件并发上传时互不干扰。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// 为本地上传生成新的标识
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 服务端文件使用文件名作为标识
    pub fn from_server_name(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 文件条目状态：`Uploading → Complete | Error`，后两者为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Uploading,
    Complete,
    Error,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FileState::Uploading)
    }
}

/// 条目来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOrigin {
    /// 服务端列表中发现
    Server,
    /// 本地选择或拖入
    Local,
}

/// 登记中的文件条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFile {
    pub identity: FileId,
    pub display_name: String,
    /// 未知大小（服务端发现的文件）时为 0
    pub byte_size: u64,
    pub media_kind: String,
    /// 0..=100
    pub progress_percent: u8,
    pub state: FileState,
    pub origin: FileOrigin,
    pub tracked_at: DateTime<Utc>,
}

impl TrackedFile {
    /// 服务端列表中新发现的文件，直接视为已完成
    pub(crate) fn from_server(name: String, default_media_kind: &str) -> Self {
        Self {
            identity: FileId::from_server_name(&name),
            display_name: name,
            byte_size: 0,
            media_kind: default_media_kind.to_string(),
            progress_percent: 100,
            state: FileState::Complete,
            origin: FileOrigin::Server,
            tracked_at: Utc::now(),
        }
    }

    /// 本地开始上传的文件
    pub(crate) fn pending_upload(file: &LocalFile) -> Self {
        Self {
            identity: FileId::generate(),
            display_name: file.name.clone(),
            byte_size: file.byte_size(),
            media_kind: file.media_kind.clone(),
            progress_percent: 0,
            state: FileState::Uploading,
            origin: FileOrigin::Local,
            tracked_at: Utc::now(),
        }
    }

    /// 结算上传结果，成功和失败都把进度置为 100（表示不再有后续进度）
    pub(crate) fn settle(&mut self, state: FileState) {
        self.state = state;
        self.progress_percent = 100;
    }
}

/// 用户选择的本地文件
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub media_kind: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, media_kind: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_kind: media_kind.into(),
            bytes,
        }
    }

    /// 从磁盘读取文件，按扩展名推断媒体类型
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("无效的文件名: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("读取文件失败: {}", path.display()))?;
        let media_kind = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();
        Ok(Self {
            name,
            media_kind,
            bytes,
        })
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
