//! 单测共用的工具：日志初始化和脚本化的 `RemoteClient`

use crate::dashboard::remote::{FileLocator, QueryReply, RemoteClient, RemoteError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::Semaphore;

static INIT_LOGGER: Once = Once::new();

pub(crate) fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        // 打开当前 crate 的 debug，关闭底层 HTTP 库的 debug 噪音
        let filter_layer = EnvFilter::new(
            "info,mediai_client_core=debug,hyper_util::client=info,reqwest=info",
        );

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    });
}

/// 按脚本返回结果的远端实现
///
/// 每类调用可选一个闸门（0 许可的信号量），测试通过 `open_*` 逐个放行，
/// 以便在结算之前检查本地状态。
pub(crate) struct ScriptedRemote {
    pub listing: Mutex<Result<Vec<String>, RemoteError>>,
    /// 按文件名指定上传结果，未指定时成功
    pub upload_results: Mutex<HashMap<String, RemoteError>>,
    /// 按文件名指定删除结果，未指定时成功
    pub delete_results: Mutex<HashMap<String, RemoteError>>,
    pub query_reply: Mutex<Result<QueryReply, RemoteError>>,
    pub sync_result: Mutex<Result<serde_json::Value, RemoteError>>,

    pub list_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub sync_calls: AtomicUsize,

    upload_gate: Option<Semaphore>,
    query_gate: Option<Semaphore>,
    sync_gate: Option<Semaphore>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self {
            listing: Mutex::new(Ok(Vec::new())),
            upload_results: Mutex::new(HashMap::new()),
            delete_results: Mutex::new(HashMap::new()),
            query_reply: Mutex::new(Ok(QueryReply::Answer("ok".to_string()))),
            sync_result: Mutex::new(Ok(serde_json::json!({ "status": "ok" }))),
            list_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            sync_calls: AtomicUsize::new(0),
            upload_gate: None,
            query_gate: None,
            sync_gate: None,
        }
    }

    pub fn with_listing(self, names: &[&str]) -> Self {
        *self.listing.lock().unwrap() = Ok(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn gate_uploads(mut self) -> Self {
        self.upload_gate = Some(Semaphore::new(0));
        self
    }

    pub fn gate_queries(mut self) -> Self {
        self.query_gate = Some(Semaphore::new(0));
        self
    }

    pub fn gate_sync(mut self) -> Self {
        self.sync_gate = Some(Semaphore::new(0));
        self
    }

    pub fn fail_upload(&self, name: &str, error: RemoteError) {
        self.upload_results
            .lock()
            .unwrap()
            .insert(name.to_string(), error);
    }

    pub fn fail_delete(&self, name: &str, error: RemoteError) {
        self.delete_results
            .lock()
            .unwrap()
            .insert(name.to_string(), error);
    }

    pub fn set_query_reply(&self, reply: Result<QueryReply, RemoteError>) {
        *self.query_reply.lock().unwrap() = reply;
    }

    pub fn set_sync_result(&self, result: Result<serde_json::Value, RemoteError>) {
        *self.sync_result.lock().unwrap() = result;
    }

    pub fn open_uploads(&self, n: usize) {
        if let Some(gate) = &self.upload_gate {
            gate.add_permits(n);
        }
    }

    pub fn open_queries(&self, n: usize) {
        if let Some(gate) = &self.query_gate {
            gate.add_permits(n);
        }
    }

    pub fn open_sync(&self, n: usize) {
        if let Some(gate) = &self.sync_gate {
            gate.add_permits(n);
        }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

async fn pass(gate: &Option<Semaphore>) {
    if let Some(gate) = gate {
        gate.acquire().await.expect("闸门已关闭").forget();
    }
}

#[async_trait]
impl RemoteClient for ScriptedRemote {
    async fn list_files(&self) -> Result<Vec<String>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing.lock().unwrap().clone()
    }

    async fn upload_file(
        &self,
        _bytes: Vec<u8>,
        name: &str,
        _media_kind: &str,
    ) -> Result<(), RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        pass(&self.upload_gate).await;
        match self.upload_results.lock().unwrap().get(name) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn delete_file(&self, name: &str) -> Result<(), RemoteError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        match self.delete_results.lock().unwrap().get(name) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn query_assistant(&self, _text: &str) -> Result<QueryReply, RemoteError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        pass(&self.query_gate).await;
        self.query_reply.lock().unwrap().clone()
    }

    async fn check_sync_status(&self) -> Result<serde_json::Value, RemoteError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        pass(&self.sync_gate).await;
        self.sync_result.lock().unwrap().clone()
    }

    fn resolve_file_locator(&self, name: &str) -> FileLocator {
        FileLocator::new(format!("http://remote.test/uploads/{}", name))
    }
}

/// 反复让出执行权，直到条件成立
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("等待条件超时");
}
