//! 会话监听器回调接口

use async_trait::async_trait;

/// 会话监听器
#[async_trait]
pub trait ConversationListener: Send + Sync {
    /// 会话追加了一个回合，参数为该回合的 JSON 字符串
    async fn on_turn_appended(&self, turn_json: String);

    /// 同步状态变化（true 表示进行中）
    async fn on_sync_status_changed(&self, syncing: bool);
}

/// 空实现（默认监听器）
pub struct EmptyConversationListener;

#[async_trait]
impl ConversationListener for EmptyConversationListener {
    async fn on_turn_appended(&self, _turn_json: String) {}
    async fn on_sync_status_changed(&self, _syncing: bool) {}
}
