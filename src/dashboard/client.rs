//! 仪表盘客户端
//!
//! 在同一个 `RemoteClient` 上组合上传登记和助手会话，对应仪表盘页面挂载两个组件。

use crate::dashboard::api::HttpRemoteClient;
use crate::dashboard::chat::{
    models::DEFAULT_WELCOME_TEXT, ConversationListener, ConversationSession, SyncOutcome,
};
use crate::dashboard::error::DashboardError;
use crate::dashboard::remote::RemoteClient;
use crate::dashboard::upload::{UploadListener, UploadRegistry};
use anyhow::{Context, Result};
use reqwest::Url;
use std::sync::Arc;
use tracing::{info, warn};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 远端服务基础地址
    pub api_base_url: String,
    /// 会话开场白
    pub welcome_text: String,
    /// 服务端列出的文件使用的默认媒体类型
    pub default_media_kind: String,
    /// 上传表单中的文件字段名
    pub upload_field: String,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
            default_media_kind: "pdf".to_string(),
            upload_field: "file".to_string(),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_welcome_text(mut self, text: impl Into<String>) -> Self {
        self.welcome_text = text.into();
        self
    }

    pub fn with_default_media_kind(mut self, kind: impl Into<String>) -> Self {
        self.default_media_kind = kind.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 仪表盘客户端
pub struct DashboardClient {
    config: ClientConfig,
    uploads: UploadRegistry,
    conversation: ConversationSession,
}

impl DashboardClient {
    /// 使用 HTTP 远端创建客户端
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.api_base_url)
            .with_context(|| format!("无效的 API 地址: {}", config.api_base_url))?;

        let http_client = reqwest::ClientBuilder::new()
            .build()
            .context("创建 HTTP 客户端失败")?;
        let remote = HttpRemoteClient::new(
            http_client,
            config.api_base_url.clone(),
            config.upload_field.clone(),
        );

        info!("[Client] 创建仪表盘客户端，API: {}", config.api_base_url);
        Ok(Self::with_remote(config, Arc::new(remote)))
    }

    /// 使用任意 `RemoteClient` 实现创建客户端
    pub fn with_remote(config: ClientConfig, remote: Arc<dyn RemoteClient>) -> Self {
        let uploads = UploadRegistry::new(remote.clone(), config.default_media_kind.clone());
        let conversation = ConversationSession::new(remote, &config.welcome_text);
        Self {
            config,
            uploads,
            conversation,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 注册上传监听器（应在开始上传之前注册）
    pub fn set_upload_listener(&mut self, listener: Arc<dyn UploadListener>) {
        self.uploads.set_listener(listener);
    }

    /// 注册会话监听器
    pub fn set_conversation_listener(&mut self, listener: Arc<dyn ConversationListener>) {
        self.conversation.set_listener(listener);
    }

    pub fn uploads(&self) -> &UploadRegistry {
        &self.uploads
    }

    pub fn conversation(&self) -> &ConversationSession {
        &self.conversation
    }

    /// 挂载时的初始对账，失败只记录日志，返回新增条目数
    pub async fn mount(&self) -> usize {
        match self.uploads.reconcile_from_server().await {
            Ok(added) => added,
            Err(e) => {
                warn!("[Client] ⚠️ 初始文件对账失败，稍后可通过同步重试: {}", e);
                0
            }
        }
    }

    /// "同步新上传"：先让服务端检查同步，检查成功后再与文件列表对账
    pub async fn sync_new_uploads(&self) -> Result<SyncOutcome, DashboardError> {
        let outcome = self.conversation.request_sync().await?;
        if let SyncOutcome::Synced(_) = &outcome {
            if let Err(e) = self.uploads.reconcile_from_server().await {
                warn!("[Client] ⚠️ 同步后对账失败: {}", e);
            }
        }
        Ok(outcome)
    }
}
