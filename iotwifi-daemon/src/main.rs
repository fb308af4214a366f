use anyhow::{Context, Result};
use iotwifi_core::{
    config::{AdapterConfig, GatewayConfig},
    lifecycle::Lifecycle,
    traits::AdapterManager,
    worker::WorkerExit,
};
use std::sync::Arc;
use tokio::net::TcpListener;

// --- 1. 选择后端实现 ---
const BACKEND_COUNT: usize =
    cfg!(feature = "backend_wpa_cli") as usize + cfg!(feature = "backend_mock") as usize;
const _: () = assert!(
    BACKEND_COUNT == 1,
    "Select exactly ONE backend feature: backend_wpa_cli (default) \
     or backend_mock (with --no-default-features)."
);

#[cfg(feature = "backend_wpa_cli")]
fn get_backend(adapter_config: AdapterConfig) -> Arc<dyn AdapterManager> {
    tracing::info!(iface = %adapter_config.interface, "🚀 Using wpa_cli backend");
    use iotwifi_core::backends::wpa_cli::WpaCliBackend;
    Arc::new(WpaCliBackend::new(adapter_config))
}

#[cfg(all(feature = "backend_mock", not(feature = "backend_wpa_cli")))]
fn get_backend(_adapter_config: AdapterConfig) -> Arc<dyn AdapterManager> {
    tracing::info!("🚀 Using Mock backend");
    use iotwifi_core::backends::mock::MockAdapter;
    Arc::new(MockAdapter::new().with_delay(std::time::Duration::from_secs(2)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::load().context("Failed to load gateway config")?;

    // 1. 初始化日志（这是入口点的职责）
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting IoT Wifi...");

    // 2. 调用网关核心逻辑
    match run(config).await {
        Ok(exit) => {
            tracing::info!(?exit, "Exiting.");
            Ok(())
        }
        Err(e) => {
            // 3. 处理顶层错误
            tracing::error!("❌ Gateway failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(config: GatewayConfig) -> Result<WorkerExit> {
    if !config.boot_delay().is_zero() {
        tracing::info!("Boot delay: sleeping {:?}", config.boot_delay());
        tokio::time::sleep(config.boot_delay()).await;
    }

    let adapter_config = AdapterConfig::load(&config.adapter_config_path)
        .context("Failed to load adapter config")?;
    let backend = get_backend(adapter_config);

    let lifecycle = Lifecycle::new();
    let on_signal = lifecycle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C");
            on_signal.begin_shutdown();
        }
    });

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    let exit = iotwifi_core::run_gateway(listener, &config, backend, lifecycle).await?;
    Ok(exit)
}
