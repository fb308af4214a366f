use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supplicant status as reported by the adapter manager (`wpa_state`, `ssid`, `ip_address`, ...).
pub type StatusResult = BTreeMap<String, String>;

/// 扫描到的单个 Wi-Fi 网络
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub bssid: String,
    pub frequency: String,
    pub signal_level: String, // dBm，保留 wpa_cli 的原始文本
    pub flags: String,        // 例如 "[WPA2-PSK-CCMP][ESS]"
    pub ssid: String,
}

/// 一次连接尝试的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub ssid: String,
    pub state: String,
    pub ip: String,
    pub message: String,
}

/// /connect 的请求体
///
/// `psk` may be empty for open networks. Lives only as long as the request.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub ssid: String,
    #[serde(default)]
    pub psk: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("psk", &if self.psk.is_empty() { "(empty)" } else { "********" })
            .finish()
    }
}
