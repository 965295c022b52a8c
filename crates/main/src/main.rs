//! 主应用程序入口
//!
//! 加载配置，装配服务，启动 Telegram 长轮询。

use std::path::Path;
use std::sync::Arc;

use config::{AppConfig, LogConfig};
use infrastructure::{run_with_restart, Infrastructure};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    dotenv::dotenv().ok();

    let config = AppConfig::load()?;
    let _guard = init_logging(&config.log)?;
    info!(config = %config.sanitize(), "配置加载完成");

    let infra = Infrastructure::connect(&config)?;
    match infra.client.get_me().await {
        Ok(me) => info!(bot = ?me.username, "已连接 Telegram"),
        Err(e) => warn!(error = %e, "获取机器人信息失败，继续启动"),
    }

    let poller = Arc::new(infra.poller());
    let polling = run_with_restart(infra.backoff(), || {
        let poller = poller.clone();
        async move { poller.run().await }
    });

    tokio::select! {
        _ = polling => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            let stats = infra.matchmaker.stats().await;
            let known_users = infra.identity.len().await;
            info!(
                waiting = stats.waiting,
                sessions = stats.sessions,
                pending_confirmations = stats.pending_confirmations,
                known_users,
                "收到退出信号，机器人停止"
            );
        }
    }

    Ok(())
}

/// 控制台输出 + 可选的文件输出。返回的 guard 必须存活到进程结束，否则文件日志会丢失。
fn init_logging(log: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log.filter))
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter()?);

    let (file, guard) = match log.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("日志文件路径无效: {}", path.display()))?;
            std::fs::create_dir_all(directory).ok();

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter()?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}
