//! leakscope 主程序
//!
//! `serve` 启动边缘 API 服务，`check` 在本机运行一次泄漏检测并输出报告，`test` 校验配置文件

mod cli;
mod error;
mod observability;

use clap::Parser;
use leakscope::report;
use leakscope::service::{EdgeService, ServiceManager};
use leakscope_common::ConfigError;
use leakscope_common::config::LeakscopeConfig;
use observability::init_observability;
use probe::LeakTestRun;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use tracing::{error, info, warn};

// 标准输出留给报告，启动信息写到标准错误
macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

const SYSTEM_CONFIG_PATH: &str = "/etc/leakscope/config.toml";

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { ref config_file } => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        Commands::Serve => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;
            let config = ApplicationLauncher::load_config(&config_path)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(ApplicationLauncher::run_server(config))
        }
        Commands::Check { export, json } => {
            let config = match ApplicationLauncher::locate_config_file(&cli.config)? {
                Some(path) => ApplicationLauncher::load_config(&path)?,
                None => {
                    bootstrap_info!("No config file found, using built-in defaults");
                    LeakscopeConfig::default()
                }
            };

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(ApplicationLauncher::run_check(config, export, json))
        }
    }
}

impl ApplicationLauncher {
    fn fallback_paths() -> Vec<PathBuf> {
        vec![
            // 1. Current working directory
            PathBuf::from("config.toml"),
            // 2. System config directory
            PathBuf::from(SYSTEM_CONFIG_PATH),
        ]
    }

    /// Locate the config file; `Ok(None)` when no default location has one
    fn locate_config_file(provided_path: &PathBuf) -> Result<Option<PathBuf>> {
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(Some(provided_path.clone()));
            }
            bootstrap_error!("Provided config file not found: {:?}", provided_path);
            return Err(Error::custom(format!(
                "Config file not found: {provided_path:?}"
            )));
        }

        for path in Self::fallback_paths() {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        if let Some(path) = Self::locate_config_file(provided_path)? {
            return Ok(path);
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in Self::fallback_paths().iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: leakscope --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 加载并验证配置，只有警告时继续
    fn load_config(config_path: &Path) -> Result<LeakscopeConfig> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);

        let config = LeakscopeConfig::from_file(config_path).map_err(|e| {
            bootstrap_error!("❌ 配置加载失败: {}", e);
            Error::from(e)
        })?;

        if let Err(errors) = config.validate() {
            for (i, err) in errors.iter().enumerate() {
                if err.starts_with("Warning:") {
                    bootstrap_info!("  {}. ⚠️  {}", i + 1, err);
                } else {
                    bootstrap_error!("  {}. ❌ {}", i + 1, err);
                }
            }
            let critical: Vec<String> = errors
                .into_iter()
                .filter(|err| !err.starts_with("Warning:"))
                .collect();
            if !critical.is_empty() {
                bootstrap_error!("❌ 配置验证失败，请修复上述错误");
                return Err(ConfigError::Validation { errors: critical }.into());
            }
        }

        Ok(config)
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();

        match LeakscopeConfig::from_file(config_path) {
            Ok(config) => {
                info!("✅ 配置文件解析成功: {:?}", config_path);

                match config.validate() {
                    Ok(()) => {
                        info!("✅ 配置验证通过");
                    }
                    Err(errors) => {
                        error!("❌ 配置验证发现问题:");
                        for (i, err) in errors.iter().enumerate() {
                            if err.starts_with("Warning:") {
                                info!("  {}. ⚠️  {}", i + 1, err);
                            } else {
                                error!("  {}. ❌ {}", i + 1, err);
                            }
                        }
                        let has_errors = errors.iter().any(|e| !e.starts_with("Warning:"));
                        if has_errors {
                            return Err(Error::service_validation("配置验证失败".to_string()));
                        }
                    }
                }

                info!("✅ 完整配置验证通过");
                Ok(())
            }
            Err(e) => {
                error!("❌ 配置文件解析失败: {}", e);
                Err(Error::service_validation(format!("配置解析失败: {e}")))
            }
        }
    }

    fn register_metrics() {
        if let Err(e) = leakscope_common::metrics::register_metrics() {
            warn!(
                "Prometheus metrics registration warning (may already be registered): {}",
                e
            );
        }
    }

    /// 运行边缘 API 服务
    async fn run_server(config: LeakscopeConfig) -> Result<()> {
        let _observability_guard = init_observability(&config)?;
        info!("🚀 启动 leakscope 边缘 API 服务 ({})", config.name);

        Self::register_metrics();
        info!("✅ Prometheus metrics registry 初始化成功");

        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(10);
        setup_ctrl_c_handler(shutdown_tx.clone()).await;

        let mut service_manager = ServiceManager::new(config.clone(), shutdown_tx.clone());
        info!("📊 计划启动的服务:");
        info!("  - Edge API (/, /api/dns-leak, /api/advanced-ip, /api/proxy-detection)");
        service_manager.add_service(Box::new(EdgeService::new()));

        let handle_futs: Vec<JoinHandle<()>> = service_manager
            .start_all()
            .await
            .map_err(|e| Error::service_startup(format!("HTTP 服务启动失败: {e}")))?;

        Self::display_service_info(&config);

        for handle in handle_futs {
            if let Err(e) = handle.await {
                error!("Service task terminated unexpectedly: {}", e);
                let _ = shutdown_tx.send(());
            }
        }
        service_manager.stop_all().await?;

        info!("🛑 所有服务已安全关闭");
        Ok(())
    }

    /// 在本机运行一次检测
    async fn run_check(
        config: LeakscopeConfig,
        export: Option<Option<PathBuf>>,
        json: bool,
    ) -> Result<()> {
        let _observability_guard = init_observability(&config)?;
        Self::register_metrics();

        if !config.edge.is_enabled() {
            info!("Edge API not configured, edge sections will be skipped");
        }

        let mut run = LeakTestRun::from_config(&config.probe, &config.edge)?;

        // JSON 模式下不打印实时事件，保证标准输出只有 JSON
        let printer = (!json).then(|| {
            let mut events = run.subscribe();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    println!("{}", report::render_event(&event));
                }
            })
        });

        let report = run.run().await;
        drop(run);
        if let Some(printer) = printer {
            printer.await?;
        }

        if json {
            println!("{}", report.to_json()?);
        } else {
            println!();
            print!("{}", report::render(&report));
        }

        if let Some(path) = export {
            let path = path.unwrap_or_else(|| PathBuf::from(report.export_file_name()));
            std::fs::write(&path, report.to_json()?)?;
            bootstrap_info!("📄 Report exported to {:?}", path);
        }

        Ok(())
    }

    /// 显示服务信息
    fn display_service_info(config: &LeakscopeConfig) {
        info!("✅ 所有服务已启动");

        match config.bind.http {
            Some(ref http_config) => {
                let http_url = http_config.public_url();
                info!("📡 HTTP 服务器监听在: {}:{}", http_config.ip, http_config.port);
                info!("🔧 可用的API端点:");
                info!("  - {}/", http_url);
                info!("  - {}/api/dns-leak", http_url);
                info!("  - {}/api/advanced-ip", http_url);
                info!("  - {}/api/proxy-detection", http_url);
                info!("  - {}/metrics", http_url);
            }
            None => info!("📡 没有配置 HTTP 服务器"),
        }
    }
}

/// 设置Ctrl-C信号处理程序
async fn setup_ctrl_c_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听Ctrl-C信号: {}", e);
            return;
        }
        info!("收到Ctrl-C信号，开始优雅关闭...");
        let _ = shutdown_tx.send(());
    });
}
