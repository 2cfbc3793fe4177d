//! 上传登记监听器回调接口

use crate::dashboard::upload::models::FileState;
use async_trait::async_trait;

/// 上传登记监听器，UI 通过它在状态变化后重新渲染
#[async_trait]
pub trait UploadListener: Send + Sync {
    /// 文件列表发生变更（新增、结算或删除），参数为完整列表的 JSON 数组字符串
    async fn on_file_list_changed(&self, files_json: String);

    /// 某个上传结算完成
    async fn on_upload_settled(&self, identity: String, state: FileState);

    /// 预览地址变更，`None` 表示关闭预览
    async fn on_preview_changed(&self, locator: Option<String>);
}

/// 默认空实现（无操作）
pub struct EmptyUploadListener;

#[async_trait]
impl UploadListener for EmptyUploadListener {
    async fn on_file_list_changed(&self, _files_json: String) {}
    async fn on_upload_settled(&self, _identity: String, _state: FileState) {}
    async fn on_preview_changed(&self, _locator: Option<String>) {}
}
