//! 远端 HTTP 接口的请求/响应 DTO

use crate::dashboard::remote::RemoteError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// 文件列表响应：`{ "files": ["a.pdf", ...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct FileListResp {
    pub files: Vec<String>,
}

/// 删除请求体
#[derive(Debug, Serialize)]
pub struct DeleteFileReq<'a> {
    pub filename: &'a str,
}

/// 助手查询请求体
#[derive(Debug, Serialize)]
pub struct QueryReq<'a> {
    pub query: &'a str,
}

/// 助手查询响应，`response` 可能缺失或为 null
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResp {
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

impl QueryResp {
    /// 取出非空的字符串回复；缺失、null、空串或非字符串都视为没有回复
    pub fn into_answer(self) -> Option<String> {
        match self.response {
            Some(serde_json::Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// 读取响应 body：非 2xx 返回 `Status`，其余按 JSON 反序列化
pub(crate) async fn read_json_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T, RemoteError> {
    let status = response.status();

    // body 只能读取一次
    let body_bytes = response.bytes().await?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body: body_str.into_owned(),
        });
    }

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        RemoteError::Malformed(e.to_string())
    })
}

/// 只检查状态码，不关心 body 内容
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<(), RemoteError> {
    let status = response.status();
    if status.is_success() {
        debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    error!(
        "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
        operation_name, status, body
    );
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}
