//! 仪表盘 HTTP API 客户端
//!
//! 负责文件存储和助手服务相关的全部 HTTP 请求

use crate::dashboard::remote::{FileLocator, QueryReply, RemoteClient, RemoteError};
use crate::dashboard::types::{
    ensure_success, read_json_body, DeleteFileReq, FileListResp, QueryReq, QueryResp,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 基于 reqwest 的 `RemoteClient` 实现
pub struct HttpRemoteClient {
    client: reqwest::Client,
    api_base_url: String,
    upload_field: String,
}

impl HttpRemoteClient {
    /// 创建新的 HTTP API 客户端
    ///
    /// `client` 可以在外部预先配置默认请求头等
    pub fn new(client: reqwest::Client, api_base_url: String, upload_field: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            upload_field,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn list_files(&self) -> Result<Vec<String>, RemoteError> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url("files");

        info!("[DashAPI] 📡 请求文件列表");
        debug!("[DashAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await?;

        let resp: FileListResp = read_json_body(response, "文件列表").await?;
        info!("[DashAPI] ✅ 服务端文件数: {}", resp.files.len());
        Ok(resp.files)
    }

    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        name: &str,
        media_kind: &str,
    ) -> Result<(), RemoteError> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url("upload");

        info!("[DashAPI] 📤 上传文件: {} ({} 字节)", name, bytes.len());
        debug!(
            "[DashAPI]   请求URL: {}, 类型: {}, 操作ID: {}",
            url, media_kind, operation_id
        );

        let part = Part::bytes(bytes).file_name(name.to_string());
        // 服务端默认类型（如 "pdf"）不是合法 MIME，此时不带 Content-Type
        let part = if media_kind.contains('/') {
            part.mime_str(media_kind)?
        } else {
            part
        };
        let form = Form::new().part(self.upload_field.clone(), part);

        let response = self
            .client
            .post(&url)
            .header("operationID", &operation_id)
            .multipart(form)
            .send()
            .await?;

        ensure_success(response, "文件上传").await
    }

    async fn delete_file(&self, name: &str) -> Result<(), RemoteError> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url("delete");

        info!("[DashAPI] 🗑️ 删除文件: {}", name);
        debug!("[DashAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .delete(&url)
            .header("operationID", &operation_id)
            .json(&DeleteFileReq { filename: name })
            .send()
            .await?;

        ensure_success(response, "文件删除").await
    }

    async fn query_assistant(&self, text: &str) -> Result<QueryReply, RemoteError> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url("query");

        info!("[DashAPI] 💬 发起助手查询");
        debug!(
            "[DashAPI]   请求URL: {}, 查询长度: {}, 操作ID: {}",
            url,
            text.len(),
            operation_id
        );

        let response = self
            .client
            .post(&url)
            .header("operationID", &operation_id)
            .json(&QueryReq { query: text })
            .send()
            .await?;

        let resp: QueryResp = read_json_body(response, "助手查询").await?;
        match resp.into_answer() {
            Some(answer) => Ok(QueryReply::Answer(answer)),
            None => {
                warn!("[DashAPI] ⚠️ 助手响应缺少 response 字段");
                Ok(QueryReply::Malformed)
            }
        }
    }

    async fn check_sync_status(&self) -> Result<serde_json::Value, RemoteError> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.url("check");

        info!("[DashAPI] 🔄 检查同步状态");
        debug!("[DashAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await?;

        read_json_body(response, "同步检查").await
    }

    fn resolve_file_locator(&self, name: &str) -> FileLocator {
        match Url::parse(&self.api_base_url) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push("uploads").push(name);
                }
                FileLocator::new(url.to_string())
            }
            Err(e) => {
                warn!(
                    "[DashAPI] ⚠️ 无法解析 API 地址 {}: {}，按原样拼接预览地址",
                    self.api_base_url, e
                );
                FileLocator::new(format!("{}/uploads/{}", self.api_base_url, name))
            }
        }
    }
}
