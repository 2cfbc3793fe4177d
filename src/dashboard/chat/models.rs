//! 会话本地模型定义

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 默认开场白
pub const DEFAULT_WELCOME_TEXT: &str = "Welcome! How can I assist you?";
/// 助手响应缺少 response 字段时的占位回复
pub const NO_RESPONSE_TEXT: &str = "Error: No response";
/// 助手服务不可达时的占位回复
pub const UNREACHABLE_TEXT: &str = "Error: Could not connect to server";

/// 同步按钮文案
pub const SYNC_LABEL_IDLE: &str = "Sync New Uploads";
pub const SYNC_LABEL_BUSY: &str = "Syncing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// 回合类型，UI 可据此区分占位回复，无需比较文本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnKind {
    Reply,
    Welcome,
    NoResponse,
    Unreachable,
}

/// 会话中的一个回合，追加后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub text: String,
    pub author: Author,
    pub kind: TurnKind,
    pub sent_at: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(text: impl Into<String>, author: Author, kind: TurnKind) -> Self {
        Self {
            text: text.into(),
            author,
            kind,
            sent_at: Utc::now(),
        }
    }

    pub(crate) fn user(text: &str) -> Self {
        Self::new(text, Author::User, TurnKind::Reply)
    }

    pub(crate) fn welcome(text: &str) -> Self {
        Self::new(text, Author::Assistant, TurnKind::Welcome)
    }

    pub(crate) fn assistant(text: String) -> Self {
        Self::new(text, Author::Assistant, TurnKind::Reply)
    }

    pub(crate) fn no_response() -> Self {
        Self::new(NO_RESPONSE_TEXT, Author::Assistant, TurnKind::NoResponse)
    }

    pub(crate) fn unreachable() -> Self {
        Self::new(UNREACHABLE_TEXT, Author::Assistant, TurnKind::Unreachable)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, TurnKind::NoResponse | TurnKind::Unreachable)
    }
}

/// `request_sync` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// 检查完成，附带服务端返回的内容
    Synced(serde_json::Value),
    /// 已有同步在进行中，本次未发起请求
    AlreadyInFlight,
}
