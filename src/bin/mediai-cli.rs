//! MediAI 仪表盘 CLI 客户端
//!
//! 非交互式 CLI，用于对接本地服务测试上传、删除、问答和同步功能

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use mediai_client_core::dashboard::chat::ConversationListener;
use mediai_client_core::dashboard::upload::{LocalFile, UploadListener};
use mediai_client_core::{ClientConfig, DashboardClient, FileState, SyncOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// MediAI 仪表盘 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "mediai-cli")]
#[command(about = "MediAI 仪表盘 CLI 客户端 - 用于测试文件上传和助手会话", long_about = None)]
struct Args {
    /// 远端服务地址
    #[arg(long, default_value = "http://localhost:8000")]
    api_url: String,

    /// 日志级别（默认: info,mediai_client_core=debug）
    #[arg(long, default_value = "info,mediai_client_core=debug")]
    log_level: String,

    /// 日志文件路径，设为空字符串时只输出到控制台
    #[arg(long, default_value = "mediai-cli.log")]
    log_file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出服务端已有文件
    List,
    /// 上传一个或多个本地文件
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// 按文件名删除服务端文件
    Delete { name: String },
    /// 向助手提问
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// 同步新上传的文件
    Sync,
    /// 输出文件预览地址
    Preview { name: String },
}

/// 初始化日志：控制台始终输出，指定了日志文件时追加写入文件（不带颜色）
fn init_logger(log_level: &str, log_file: &str) -> Result<()> {
    use anyhow::Context;
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG 优先于 --log-level
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false)
        .with_ansi(true);

    let file_layer = if log_file.is_empty() {
        None
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("无法打开日志文件 {}", log_file))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_ansi(false),
        )
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if log_file.is_empty() {
        info!("[CLI] 📝 日志级别: {}，仅输出到控制台", log_level);
    } else {
        info!("[CLI] 📝 日志级别: {}，同时写入 {}", log_level, log_file);
    }
    Ok(())
}

/// 设置监听器（输出所有状态变化）
fn setup_listeners(client: &mut DashboardClient) {
    struct CliUploadListener;
    #[async_trait::async_trait]
    impl UploadListener for CliUploadListener {
        async fn on_file_list_changed(&self, files_json: String) {
            info!("[CLI/Upload] 📂 文件列表变更: {}", files_json);
        }

        async fn on_upload_settled(&self, identity: String, state: FileState) {
            match state {
                FileState::Complete => info!("[CLI/Upload] ✅ 上传完成: {}", identity),
                _ => error!("[CLI/Upload] ❌ 上传结束: {} -> {:?}", identity, state),
            }
        }

        async fn on_preview_changed(&self, locator: Option<String>) {
            info!("[CLI/Upload] 👁️ 预览: {:?}", locator);
        }
    }
    client.set_upload_listener(Arc::new(CliUploadListener));

    struct CliConversationListener;
    #[async_trait::async_trait]
    impl ConversationListener for CliConversationListener {
        async fn on_turn_appended(&self, turn_json: String) {
            info!("[CLI/Chat] 💬 新回合: {}", turn_json);
        }

        async fn on_sync_status_changed(&self, syncing: bool) {
            info!("[CLI/Chat] 🔄 同步中: {}", syncing);
        }
    }
    client.set_conversation_listener(Arc::new(CliConversationListener));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level, &args.log_file)?;

    info!("[CLI] 🚀 MediAI 仪表盘 CLI 客户端");
    info!("[CLI] 🌐 服务地址: {}", args.api_url);

    let config = ClientConfig::new().with_api_base_url(args.api_url.clone());
    let mut client = DashboardClient::new(config)?;
    setup_listeners(&mut client);

    match args.command {
        Command::List => {
            client.mount().await;
            let files = client.uploads().snapshot();
            info!("[CLI] 📋 文件列表（共 {} 个）:", files.len());
            for f in &files {
                info!("[CLI]   - {}", f.display_name);
            }
        }
        Command::Upload { paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(LocalFile::from_path(path).await?);
            }
            let tasks = client.uploads().begin_uploads(files).await;
            let results = join_all(tasks.into_iter().map(|t| t.settled())).await;
            let failed = results.iter().filter(|r| r.is_err()).count();
            if failed > 0 {
                warn!("[CLI] ⚠️ {} 个文件上传失败", failed);
            } else {
                info!("[CLI] ✅ 全部 {} 个文件上传成功", results.len());
            }
        }
        Command::Delete { name } => {
            client.mount().await;
            client.uploads().remove_file(&name).await?;
            info!("[CLI] ✅ 已删除: {}", name);
        }
        Command::Ask { text } => {
            let text = text.join(" ");
            if let Some(reply) = client.conversation().send_message(&text).await {
                info!("[CLI] 🤖 {}", reply.text);
            }
        }
        Command::Sync => match client.sync_new_uploads().await? {
            SyncOutcome::Synced(payload) => {
                info!("[CLI] ✅ 同步完成: {}", payload);
                info!("[CLI] 📋 当前文件数: {}", client.uploads().len());
            }
            SyncOutcome::AlreadyInFlight => info!("[CLI] ⏳ 已有同步在进行中"),
        },
        Command::Preview { name } => {
            let locator = client.uploads().select_for_preview(&name).await;
            println!("{}", locator);
        }
    }

    Ok(())
}
