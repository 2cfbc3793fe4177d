//! 助手会话服务层
//!
//! 会话记录只追加不修改。每次非空发送先追加用户回合，再在响应结算时追加
//! 恰好一个助手回合（正常回复或占位回复），多个请求重叠时按完成顺序追加。

use crate::dashboard::chat::listener::{ConversationListener, EmptyConversationListener};
use crate::dashboard::chat::models::{
    ConversationTurn, SyncOutcome, SYNC_LABEL_BUSY, SYNC_LABEL_IDLE,
};
use crate::dashboard::error::DashboardError;
use crate::dashboard::remote::{QueryReply, RemoteClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// 同步进行中标志的守卫，离开作用域（包括 future 被丢弃）时清除标志
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 助手会话
#[derive(Clone)]
pub struct ConversationSession {
    remote: Arc<dyn RemoteClient>,
    transcript: Arc<Mutex<Vec<ConversationTurn>>>,
    /// 输入框中尚未发送的内容
    input: Arc<Mutex<String>>,
    syncing: Arc<AtomicBool>,
    listener: Arc<dyn ConversationListener>,
}

impl ConversationSession {
    /// 创建会话并写入开场白（使用默认空监听器）
    pub fn new(remote: Arc<dyn RemoteClient>, welcome_text: &str) -> Self {
        Self::with_listener(remote, welcome_text, Arc::new(EmptyConversationListener))
    }

    /// 创建会话并写入开场白（带自定义监听器）
    pub fn with_listener(
        remote: Arc<dyn RemoteClient>,
        welcome_text: &str,
        listener: Arc<dyn ConversationListener>,
    ) -> Self {
        Self {
            remote,
            transcript: Arc::new(Mutex::new(vec![ConversationTurn::welcome(welcome_text)])),
            input: Arc::new(Mutex::new(String::new())),
            syncing: Arc::new(AtomicBool::new(false)),
            listener,
        }
    }

    pub fn set_listener(&mut self, listener: Arc<dyn ConversationListener>) {
        self.listener = listener;
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Vec<ConversationTurn>> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_input(&self) -> MutexGuard<'_, String> {
        self.input.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 会话记录快照
    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.lock_transcript().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_transcript().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_transcript().is_empty()
    }

    pub fn input(&self) -> String {
        self.lock_input().clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        *self.lock_input() = text.into();
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// 同步按钮文案
    pub fn sync_label(&self) -> &'static str {
        if self.is_syncing() {
            SYNC_LABEL_BUSY
        } else {
            SYNC_LABEL_IDLE
        }
    }

    fn push_turn(&self, turn: &ConversationTurn) {
        self.lock_transcript().push(turn.clone());
    }

    async fn notify_turn(&self, turn: &ConversationTurn) {
        match serde_json::to_string(turn) {
            Ok(json) => self.listener.on_turn_appended(json).await,
            Err(e) => error!("[Chat] 序列化回合失败: {}", e),
        }
    }

    /// 发送输入框中的内容
    pub async fn submit_input(&self) -> Option<ConversationTurn> {
        let text = self.input();
        self.send_message(&text).await
    }

    /// 发送一条消息，返回追加的助手回合
    ///
    /// 去除空白后为空时什么都不做并返回 `None`，会话记录和输入框保持不变。
    /// 查询在后台任务中执行，丢弃本 future 后助手回合仍会在结算时追加。
    pub async fn send_message(&self, text: &str) -> Option<ConversationTurn> {
        if text.trim().is_empty() {
            debug!("[Chat] 忽略空白消息");
            return None;
        }

        // 先追加用户回合并清空输入框，再发起网络请求
        let user_turn = ConversationTurn::user(text);
        self.push_turn(&user_turn);
        self.lock_input().clear();
        info!("[Chat] 💬 发送消息，长度: {}", text.len());

        let session = self.clone();
        let query = text.to_string();
        let handle = tokio::spawn(async move {
            session.notify_turn(&user_turn).await;

            let reply = match session.remote.query_assistant(&query).await {
                Ok(QueryReply::Answer(answer)) => {
                    info!("[Chat] ✅ 收到助手回复，长度: {}", answer.len());
                    ConversationTurn::assistant(answer)
                }
                Ok(QueryReply::Malformed) => {
                    warn!("[Chat] ⚠️ {}", DashboardError::QueryMalformed);
                    ConversationTurn::no_response()
                }
                Err(e) => {
                    error!("[Chat] ❌ {}", DashboardError::QueryUnreachable(e));
                    ConversationTurn::unreachable()
                }
            };

            session.push_turn(&reply);
            session.notify_turn(&reply).await;
            reply
        });

        match handle.await {
            Ok(reply) => Some(reply),
            Err(e) => {
                error!("[Chat] ❌ 查询任务异常终止: {}", e);
                None
            }
        }
    }

    /// 请求服务端同步新上传的文件
    ///
    /// 同一时间最多一个检查在进行；进行中再次调用直接返回 `AlreadyInFlight`。
    /// 无论成功失败，结算时都会清除进行中标志。不会修改会话记录。
    pub async fn request_sync(&self) -> Result<SyncOutcome, DashboardError> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[Sync] ⏳ 已有同步在进行中，忽略本次请求");
            return Ok(SyncOutcome::AlreadyInFlight);
        }
        let guard = SyncGuard {
            flag: &self.syncing,
        };

        info!("[Sync] 🔄 开始检查同步状态");
        self.listener.on_sync_status_changed(true).await;

        let result = self.remote.check_sync_status().await;
        drop(guard);
        self.listener.on_sync_status_changed(false).await;

        match result {
            Ok(payload) => {
                info!("[Sync] ✅ 同步检查完成: {}", payload);
                Ok(SyncOutcome::Synced(payload))
            }
            Err(e) => {
                let err = DashboardError::SyncFailure(e);
                error!("[Sync] ❌ {}", err);
                Err(err)
            }
        }
    }
}
