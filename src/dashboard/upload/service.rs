//! 上传登记服务层
//!
//! 维护文件条目集合：与服务端列表对账、跟踪并发上传、按服务端确认删除。
//! 每个上传任务只持有自己的 `FileId`，结算时只修改该标识对应的条目。

use crate::dashboard::error::DashboardError;
use crate::dashboard::remote::{FileLocator, RemoteClient, RemoteError};
use crate::dashboard::upload::listener::{EmptyUploadListener, UploadListener};
use crate::dashboard::upload::models::{FileId, FileState, LocalFile, TrackedFile};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 一次进行中的上传
///
/// 丢弃 `UploadTask` 不会中止传输，结果仍会写回登记。
pub struct UploadTask {
    identity: FileId,
    display_name: String,
    handle: JoinHandle<Result<(), DashboardError>>,
}

impl UploadTask {
    pub fn identity(&self) -> &FileId {
        &self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 等待结算：`Ok` 表示条目已变为 `Complete`，`Err` 表示已变为 `Error`
    pub async fn settled(self) -> Result<(), DashboardError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(DashboardError::TransferFailure {
                name: self.display_name,
                source: RemoteError::Transport(format!("上传任务异常终止: {}", e)),
            }),
        }
    }
}

/// 文件上传登记
#[derive(Clone)]
pub struct UploadRegistry {
    remote: Arc<dyn RemoteClient>,
    files: Arc<Mutex<Vec<TrackedFile>>>,
    preview: Arc<Mutex<Option<FileLocator>>>,
    listener: Arc<dyn UploadListener>,
    /// 服务端列出的文件使用的默认媒体类型
    default_media_kind: String,
}

impl UploadRegistry {
    /// 创建空登记（使用默认空监听器）
    pub fn new(remote: Arc<dyn RemoteClient>, default_media_kind: impl Into<String>) -> Self {
        Self::with_listener(remote, default_media_kind, Arc::new(EmptyUploadListener))
    }

    /// 创建空登记（带自定义监听器）
    pub fn with_listener(
        remote: Arc<dyn RemoteClient>,
        default_media_kind: impl Into<String>,
        listener: Arc<dyn UploadListener>,
    ) -> Self {
        Self {
            remote,
            files: Arc::new(Mutex::new(Vec::new())),
            preview: Arc::new(Mutex::new(None)),
            listener,
            default_media_kind: default_media_kind.into(),
        }
    }

    /// 替换监听器；已经开始的上传仍回调旧监听器
    pub fn set_listener(&mut self, listener: Arc<dyn UploadListener>) {
        self.listener = listener;
    }

    fn lock_files(&self) -> MutexGuard<'_, Vec<TrackedFile>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_preview(&self) -> MutexGuard<'_, Option<FileLocator>> {
        self.preview.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前全部条目（按加入顺序）
    pub fn snapshot(&self) -> Vec<TrackedFile> {
        self.lock_files().clone()
    }

    pub fn get(&self, identity: &FileId) -> Option<TrackedFile> {
        self.lock_files()
            .iter()
            .find(|f| &f.identity == identity)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_files().is_empty()
    }

    /// 当前预览地址
    pub fn preview(&self) -> Option<FileLocator> {
        self.lock_preview().clone()
    }

    async fn notify_list_changed(&self) {
        let snapshot = self.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => self.listener.on_file_list_changed(json).await,
            Err(e) => error!("[Upload] 序列化文件列表失败: {}", e),
        }
    }

    /// 与服务端文件列表对账
    ///
    /// 只追加尚未登记的文件名（按标识或显示名判断），已有条目（包括上传中的）
    /// 不做任何修改。返回新增条目数。列表不可用时保持现有状态不变。
    pub async fn reconcile_from_server(&self) -> Result<usize, DashboardError> {
        info!("[Upload] 📡 开始与服务端文件列表对账");

        let names = match self.remote.list_files().await {
            Ok(names) => names,
            Err(e) => {
                let err = DashboardError::ListUnavailable(e);
                error!("[Upload] ❌ {}，保持本地列表不变", err);
                return Err(err);
            }
        };

        let (added, total) = {
            let mut files = self.lock_files();
            let mut known: HashSet<String> = files
                .iter()
                .flat_map(|f| [f.identity.to_string(), f.display_name.clone()])
                .collect();

            let mut added = 0;
            for name in names {
                // insert 返回 false 表示已登记（也顺带去掉列表内的重复名）
                if !known.insert(name.clone()) {
                    debug!("[Upload]   文件 {} 已登记，跳过", name);
                    continue;
                }
                info!("[Upload]   新增服务端文件: {}", name);
                files.push(TrackedFile::from_server(name, &self.default_media_kind));
                added += 1;
            }
            (added, files.len())
        };

        info!(
            "[Upload] ✅ 对账完成，新增: {}, 当前条目数: {}",
            added, total
        );
        if added > 0 {
            self.notify_list_changed().await;
        }
        Ok(added)
    }

    /// 开始上传一个本地文件
    ///
    /// 条目在返回前已以 `Uploading`/0 登记，随后在后台任务中传输。
    /// 登记和启动传输之间没有 await，丢弃本 future 不会留下无人结算的条目。
    pub async fn begin_upload(&self, file: LocalFile) -> UploadTask {
        let entry = TrackedFile::pending_upload(&file);
        let identity = entry.identity.clone();
        let display_name = entry.display_name.clone();

        info!(
            "[Upload] 📤 登记上传: {} ({} 字节), 标识: {}",
            display_name, entry.byte_size, identity
        );
        self.lock_files().push(entry);

        let registry = self.clone();
        let task_identity = identity.clone();
        let handle = tokio::spawn(async move {
            let LocalFile {
                name,
                media_kind,
                bytes,
            } = file;
            let result = registry
                .remote
                .upload_file(bytes, &name, &media_kind)
                .await;
            registry.settle_upload(&task_identity, name, result).await
        });
        self.notify_list_changed().await;

        UploadTask {
            identity,
            display_name,
            handle,
        }
    }

    /// 批量开始上传（选择或拖入多个文件），每个文件独立上传
    pub async fn begin_uploads(&self, files: Vec<LocalFile>) -> Vec<UploadTask> {
        let mut tasks = Vec::with_capacity(files.len());
        for file in files {
            tasks.push(self.begin_upload(file).await);
        }
        tasks
    }

    /// 把上传结果写回对应标识的条目
    async fn settle_upload(
        &self,
        identity: &FileId,
        name: String,
        result: Result<(), RemoteError>,
    ) -> Result<(), DashboardError> {
        let state = if result.is_ok() {
            FileState::Complete
        } else {
            FileState::Error
        };

        let found = {
            let mut files = self.lock_files();
            match files.iter_mut().find(|f| &f.identity == identity) {
                Some(entry) => {
                    entry.settle(state);
                    true
                }
                None => false,
            }
        };

        if found {
            self.notify_list_changed().await;
            self.listener
                .on_upload_settled(identity.to_string(), state)
                .await;
        } else {
            debug!(
                "[Upload] 条目 {} 已被移除，丢弃上传结算结果: {:?}",
                identity, state
            );
        }

        match result {
            Ok(()) => {
                info!("[Upload] ✅ 上传完成: {} ({})", name, identity);
                Ok(())
            }
            Err(source) => {
                let err = DashboardError::TransferFailure { name, source };
                error!("[Upload] ❌ {} ({})", err, identity);
                Err(err)
            }
        }
    }

    /// 删除文件：服务端确认后才移除本地条目
    ///
    /// 删除按显示名进行；同名的多个条目会一起移除。
    pub async fn remove_file(&self, display_name: &str) -> Result<(), DashboardError> {
        info!("[Upload] 🗑️ 请求删除文件: {}", display_name);

        if let Err(source) = self.remote.delete_file(display_name).await {
            let err = DashboardError::DeletionFailure {
                name: display_name.to_string(),
                source,
            };
            warn!("[Upload] ⚠️ {}，保留本地条目", err);
            return Err(err);
        }

        let removed = {
            let mut files = self.lock_files();
            let before = files.len();
            files.retain(|f| f.display_name != display_name);
            before - files.len()
        };

        info!(
            "[Upload] ✅ 服务端已删除 {}，移除本地条目数: {}",
            display_name, removed
        );
        if removed > 0 {
            self.notify_list_changed().await;
        }
        Ok(())
    }

    /// 选择预览文件，返回外部查看器使用的地址
    pub async fn select_for_preview(&self, display_name: &str) -> FileLocator {
        let locator = self.remote.resolve_file_locator(display_name);
        debug!("[Upload] 👁️ 预览文件: {} -> {}", display_name, locator);
        *self.lock_preview() = Some(locator.clone());
        self.listener
            .on_preview_changed(Some(locator.to_string()))
            .await;
        locator
    }

    /// 关闭预览
    pub async fn clear_preview(&self) {
        let previous = self.lock_preview().take();
        if previous.is_some() {
            debug!("[Upload] 关闭预览");
            self.listener.on_preview_changed(None).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::testing::{init_test_logger, wait_until, ScriptedRemote};
    use std::sync::atomic::Ordering;

    fn pdf(name: &str, size: usize) -> LocalFile {
        LocalFile::new(name, "application/pdf", vec![0u8; size])
    }

    fn registry_over(remote: &Arc<ScriptedRemote>) -> UploadRegistry {
        UploadRegistry::new(remote.clone(), "pdf")
    }

    fn names(registry: &UploadRegistry) -> Vec<String> {
        registry
            .snapshot()
            .into_iter()
            .map(|f| f.display_name)
            .collect()
    }

    #[tokio::test]
    async fn test_reconcile_then_upload_scenario() {
        init_test_logger();
        let remote = ScriptedRemote::new()
            .with_listing(&["a.pdf", "b.pdf"])
            .gate_uploads()
            .into_arc();
        let registry = registry_over(&remote);

        assert_eq!(registry.reconcile_from_server().await.unwrap(), 2);
        let files = registry.snapshot();
        assert_eq!(names(&registry), vec!["a.pdf", "b.pdf"]);
        for f in &files {
            assert_eq!(f.state, FileState::Complete);
            assert_eq!(f.byte_size, 0);
            assert_eq!(f.progress_percent, 100);
            assert_eq!(f.media_kind, "pdf");
        }

        let task = registry.begin_upload(pdf("c.pdf", 500)).await;
        let pending = registry.get(task.identity()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(pending.state, FileState::Uploading);
        assert_eq!(pending.progress_percent, 0);
        assert_eq!(pending.byte_size, 500);

        remote.open_uploads(1);
        let identity = task.identity().clone();
        task.settled().await.unwrap();

        let done = registry.get(&identity).unwrap();
        assert_eq!(done.state, FileState::Complete);
        assert_eq!(done.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_and_skips_uploading() {
        init_test_logger();
        let remote = ScriptedRemote::new()
            .with_listing(&["a.pdf", "a.pdf", "c.pdf"])
            .gate_uploads()
            .into_arc();
        let registry = registry_over(&remote);

        let task = registry.begin_upload(pdf("c.pdf", 10)).await;

        assert_eq!(registry.reconcile_from_server().await.unwrap(), 1);
        assert_eq!(registry.reconcile_from_server().await.unwrap(), 0);
        assert_eq!(names(&registry), vec!["c.pdf", "a.pdf"]);

        let uploading = registry.get(task.identity()).unwrap();
        assert_eq!(uploading.state, FileState::Uploading);
        assert_eq!(uploading.progress_percent, 0);
        assert_eq!(uploading.byte_size, 10);

        remote.open_uploads(1);
        task.settled().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_listing_leaves_state_untouched() {
        init_test_logger();
        let remote = ScriptedRemote::new().with_listing(&["a.pdf"]).into_arc();
        let registry = registry_over(&remote);
        registry.reconcile_from_server().await.unwrap();

        *remote.listing.lock().unwrap() =
            Err(RemoteError::Malformed("files 不是数组".to_string()));
        let result = registry.reconcile_from_server().await;

        assert!(matches!(result, Err(DashboardError::ListUnavailable(_))));
        assert_eq!(names(&registry), vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn test_concurrent_same_name_uploads_are_isolated() {
        init_test_logger();
        let remote = ScriptedRemote::new()
            .with_listing(&["a.pdf"])
            .gate_uploads()
            .into_arc();
        let registry = registry_over(&remote);
        registry.reconcile_from_server().await.unwrap();
        let server_entry = registry.snapshot()[0].clone();

        let first = registry.begin_upload(pdf("scan.pdf", 1)).await;
        let second = registry.begin_upload(pdf("scan.pdf", 2)).await;
        assert_ne!(first.identity(), second.identity());
        wait_until(|| remote.upload_calls.load(Ordering::SeqCst) == 2).await;

        // 只放行一个，另一个必须保持上传中
        remote.open_uploads(1);
        wait_until(|| {
            registry
                .snapshot()
                .iter()
                .filter(|f| f.state == FileState::Complete && f.display_name == "scan.pdf")
                .count()
                == 1
        })
        .await;
        let still_uploading: Vec<_> = registry
            .snapshot()
            .into_iter()
            .filter(|f| f.state == FileState::Uploading)
            .collect();
        assert_eq!(still_uploading.len(), 1);
        assert_eq!(still_uploading[0].progress_percent, 0);

        remote.open_uploads(1);
        let (first_id, second_id) = (first.identity().clone(), second.identity().clone());
        first.settled().await.unwrap();
        second.settled().await.unwrap();

        assert_eq!(registry.get(&first_id).unwrap().byte_size, 1);
        assert_eq!(registry.get(&second_id).unwrap().byte_size, 2);
        let untouched = registry.get(&server_entry.identity).unwrap();
        assert_eq!(untouched.state, server_entry.state);
        assert_eq!(untouched.tracked_at, server_entry.tracked_at);
    }

    #[tokio::test]
    async fn test_failed_upload_is_retained_as_error() {
        init_test_logger();
        let remote = ScriptedRemote::new().into_arc();
        remote.fail_upload(
            "bad.pdf",
            RemoteError::Status {
                status: 413,
                body: "too large".to_string(),
            },
        );
        let registry = registry_over(&remote);

        let tasks = registry
            .begin_uploads(vec![pdf("good.pdf", 5), pdf("bad.pdf", 5)])
            .await;
        let ids: Vec<FileId> = tasks.iter().map(|t| t.identity().clone()).collect();
        let results: Vec<_> =
            futures_util::future::join_all(tasks.into_iter().map(|t| t.settled())).await;

        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(DashboardError::TransferFailure { name, .. }) if name == "bad.pdf"
        ));

        let good = registry.get(&ids[0]).unwrap();
        let bad = registry.get(&ids[1]).unwrap();
        assert_eq!(good.state, FileState::Complete);
        assert_eq!(bad.state, FileState::Error);
        assert_eq!(bad.progress_percent, 100);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_delete_keeps_entry() {
        init_test_logger();
        let remote = ScriptedRemote::new()
            .with_listing(&["a.pdf", "b.pdf"])
            .into_arc();
        remote.fail_delete("a.pdf", RemoteError::Transport("connection refused".to_string()));
        let registry = registry_over(&remote);
        registry.reconcile_from_server().await.unwrap();
        let before = registry.snapshot();

        let result = registry.remove_file("a.pdf").await;
        assert!(matches!(result, Err(DashboardError::DeletionFailure { .. })));
        let after = registry.snapshot();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].identity, before[0].identity);
        assert_eq!(after[0].state, before[0].state);

        registry.remove_file("b.pdf").await.unwrap();
        assert_eq!(names(&registry), vec!["a.pdf"]);
        assert_eq!(remote.delete_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_settlement_after_removal_is_dropped() {
        init_test_logger();
        let remote = ScriptedRemote::new().gate_uploads().into_arc();
        let registry = registry_over(&remote);

        let task = registry.begin_upload(pdf("draft.pdf", 3)).await;
        registry.remove_file("draft.pdf").await.unwrap();
        assert!(registry.is_empty());

        remote.open_uploads(1);
        task.settled().await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_listener_does_not_orphan_upload() {
        struct StalledListener;

        #[async_trait::async_trait]
        impl UploadListener for StalledListener {
            async fn on_file_list_changed(&self, _files_json: String) {
                std::future::pending::<()>().await;
            }
            async fn on_upload_settled(&self, _identity: String, _state: FileState) {}
            async fn on_preview_changed(&self, _locator: Option<String>) {}
        }

        init_test_logger();
        let remote = ScriptedRemote::new().into_arc();
        let registry =
            UploadRegistry::with_listener(remote.clone(), "pdf", Arc::new(StalledListener));

        {
            let fut = registry.begin_upload(pdf("ecg.pdf", 8));
            tokio::pin!(fut);
            assert!(futures_util::poll!(fut.as_mut()).is_pending());
        }

        // 调用方放弃等待后，传输仍然发出并结算到条目上
        wait_until(|| remote.upload_calls.load(Ordering::SeqCst) == 1).await;
        wait_until(|| {
            registry
                .snapshot()
                .first()
                .is_some_and(|f| f.state == FileState::Complete)
        })
        .await;
        let entry = &registry.snapshot()[0];
        assert_eq!(entry.display_name, "ecg.pdf");
        assert_eq!(entry.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_preview_selection_is_local() {
        let remote = ScriptedRemote::new().into_arc();
        let registry = registry_over(&remote);

        let locator = registry.select_for_preview("a.pdf").await;
        assert_eq!(locator.as_str(), "http://remote.test/uploads/a.pdf");
        assert_eq!(registry.preview(), Some(locator));

        registry.clear_preview().await;
        assert_eq!(registry.preview(), None);
        assert_eq!(remote.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(remote.delete_calls.load(Ordering::SeqCst), 0);
    }
}
