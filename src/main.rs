//! confwatch 演示程序入口
//!
//! 监控配置目录，并按固定间隔打印查询结果

use anyhow::{bail, Context, Result};
use clap::Parser;
use confwatch::cli::Args;
use confwatch::logging::{LogConfig, LoggingSystem};
use confwatch::settings::Settings;
use confwatch::ConfigCache;
use std::time::Duration;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    let settings_path = args.settings_path();
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("加载设置失败: {}", settings_path.display()))?;
    let settings = args.apply(settings).context("设置无效")?;

    // 初始化日志系统
    let log_config = LogConfig::from_settings(&settings.log).context("日志设置无效")?;
    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("confwatch v{} 启动", confwatch::VERSION);
    debug!("运行设置: {:?}", settings);

    let cache = ConfigCache::new();
    if !cache.watch_directory(&settings.directory) {
        bail!("无法监控配置目录: {}", settings.directory.display());
    }

    run_poll_loop(&cache, &settings).await;

    info!("confwatch 退出");
    Ok(())
}

/// 按间隔打印查询结果，直到达到轮询次数或收到退出信号
async fn run_poll_loop(cache: &ConfigCache, settings: &Settings) {
    let mut ticker = tokio::time::interval(Duration::from_millis(settings.poll_interval_ms));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut rounds = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                for lookup in &settings.lookups {
                    println!("{} := {}", lookup, cache.load(&lookup.file, &lookup.key));
                }

                rounds += 1;
                if settings.iterations > 0 && rounds >= settings.iterations {
                    break;
                }
            }
        }
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use futures::stream::StreamExt;
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook_tokio::Signals;

        match Signals::new([SIGINT, SIGTERM]) {
            Ok(mut signals) => {
                if let Some(signal) = signals.next().await {
                    info!("接收到信号 {signal}，开始退出...");
                }
            }
            Err(e) => {
                warn!("注册信号处理器失败: {e}，仅监听 Ctrl+C");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("监听 Ctrl+C 失败: {e}");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("接收到 Ctrl+C，开始退出..."),
            Err(e) => {
                warn!("监听 Ctrl+C 失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
}
