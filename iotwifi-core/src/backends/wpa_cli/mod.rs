// 后端：wpa_cli（调用 wpa_cli -i <iface> 控制 wpa_supplicant）

use crate::backends::utils::{parse_scan_results, parse_status};
use crate::config::AdapterConfig;
use crate::structs::{Connection, Credentials, Network, StatusResult};
use crate::traits::AdapterManager;
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;

const CONNECT_POLL: Duration = Duration::from_secs(1);

/// `set_network ssid` value. Hex form is taken verbatim by wpa_supplicant,
/// so quotes and non-ASCII bytes in the ssid need no escaping.
fn ssid_arg(ssid: &str) -> String {
    ssid.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// `set_network psk` value: 64 hex digits are a raw PSK and go unquoted,
/// anything else is a passphrase.
fn psk_arg(psk: &str) -> String {
    if psk.len() == 64 && psk.bytes().all(|b| b.is_ascii_hexdigit()) {
        psk.to_string()
    } else {
        format!("\"{}\"", psk)
    }
}

#[derive(Debug, Clone)]
pub struct WpaCliBackend {
    config: AdapterConfig,
}

impl WpaCliBackend {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Runs `wpa_cli -i <iface> <args...>` and returns trimmed stdout.
    ///
    /// Error messages only ever name the wpa_cli command, never its
    /// arguments, because `set_network ... psk` carries the passphrase.
    async fn wpa_cli(&self, args: &[&str]) -> Result<String> {
        let command = args.first().copied().unwrap_or_default();
        let output = Command::new("wpa_cli")
            .arg("-i")
            .arg(&self.config.interface)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!(
                "wpa_cli {} failed: {}",
                command,
                error_msg.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout == "FAIL" {
            return Err(Error::CommandFailed(format!("wpa_cli {} returned FAIL", command)));
        }
        Ok(stdout)
    }

    /// Polls status until the supplicant reports `COMPLETED` or the connect timeout passes.
    async fn wait_for_completed(&self, ssid: &str) -> Result<StatusResult> {
        let deadline = Instant::now() + self.config.connect_timeout();
        loop {
            let status = self.status().await?;
            if status.get("wpa_state").map(String::as_str) == Some("COMPLETED") {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(Error::Adapter(format!(
                    "Timed out connecting to {} (wpa_state={})",
                    ssid,
                    status.get("wpa_state").map(String::as_str).unwrap_or("UNKNOWN")
                )));
            }
            sleep(CONNECT_POLL).await;
        }
    }
}

#[async_trait]
impl AdapterManager for WpaCliBackend {
    async fn status(&self) -> Result<StatusResult> {
        let output = self.wpa_cli(&["status"]).await?;
        Ok(parse_status(&output))
    }

    async fn disconnect(&self) {
        if let Err(e) = self.wpa_cli(&["disconnect"]).await {
            tracing::warn!("wpa_cli disconnect failed: {}", e);
        }
    }

    async fn connect_network(&self, credentials: &Credentials) -> Result<Connection> {
        tracing::info!(
            ssid = %credentials.ssid,
            iface = %self.config.interface,
            "Connecting via wpa_cli"
        );

        let added = self.wpa_cli(&["add_network"]).await?;
        let net_id = added
            .lines()
            .last()
            .unwrap_or_default()
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::CommandFailed(format!("Unexpected add_network reply: {}", added)))?
            .to_string();

        let ssid = ssid_arg(&credentials.ssid);
        let configured: Result<StatusResult> = async {
            self.wpa_cli(&["set_network", &net_id, "ssid", &ssid]).await?;
            if credentials.psk.is_empty() {
                self.wpa_cli(&["set_network", &net_id, "key_mgmt", "NONE"]).await?;
            } else {
                let psk = psk_arg(&credentials.psk);
                self.wpa_cli(&["set_network", &net_id, "psk", &psk]).await?;
            }
            self.wpa_cli(&["select_network", &net_id]).await?;
            self.wait_for_completed(&credentials.ssid).await
        }
        .await;

        match configured {
            Ok(status) => {
                tracing::info!(ssid = %credentials.ssid, "✅ Connected");
                Ok(Connection {
                    ssid: credentials.ssid.clone(),
                    state: "COMPLETED".to_string(),
                    ip: status.get("ip_address").cloned().unwrap_or_default(),
                    message: "Connection established".to_string(),
                })
            }
            Err(e) => {
                // 清理失败的网络配置
                let _ = self.wpa_cli(&["remove_network", &net_id]).await;
                Err(e)
            }
        }
    }

    async fn scan_networks(&self) -> Result<Vec<Network>> {
        self.wpa_cli(&["scan"]).await?;

        // 等待一会儿以获取结果
        sleep(self.config.scan_wait()).await;

        let output = self.wpa_cli(&["scan_results"]).await?;
        let networks = parse_scan_results(&output);
        tracing::debug!("wpa_cli scan found {} networks", networks.len());
        Ok(networks)
    }

    /// Polls supplicant status and logs `wpa_state` transitions.
    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        let mut last_state: Option<String> = None;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => match self.status().await {
                    Ok(status) => {
                        let state = status.get("wpa_state").cloned();
                        if state != last_state {
                            tracing::info!(
                                iface = %self.config.interface,
                                wpa_state = state.as_deref().unwrap_or("UNKNOWN"),
                                "Supplicant state changed"
                            );
                            last_state = state;
                        }
                    }
                    Err(e) => tracing::warn!("Status poll failed: {}", e),
                },
            }
        }
    }
}
