use crate::structs::{Connection, Credentials, Network, StatusResult};
use crate::traits::AdapterManager;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Number of calls the mock received, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub status: usize,
    pub disconnect: usize,
    pub connect: usize,
    pub scan: usize,
    pub cycles: usize,
}

#[derive(Debug, Default)]
struct Counters {
    status: AtomicUsize,
    disconnect: AtomicUsize,
    connect: AtomicUsize,
    scan: AtomicUsize,
    cycles: AtomicUsize,
}

/// A mock adapter manager for local development and tests.
/// It simulates scanning and connecting without any real hardware interaction.
#[derive(Debug)]
pub struct MockAdapter {
    delay: Duration,
    cycle: Duration,
    scan_error: Option<String>,
    status_error: Option<String>,
    connected: Mutex<Option<String>>,
    counters: Counters,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            cycle: Duration::from_secs(1),
            scan_error: None,
            status_error: None,
            connected: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// Simulated latency of every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Period of one background event-loop cycle.
    pub fn with_cycle(mut self, cycle: Duration) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn failing_scan(mut self, message: impl Into<String>) -> Self {
        self.scan_error = Some(message.into());
        self
    }

    pub fn failing_status(mut self, message: impl Into<String>) -> Self {
        self.status_error = Some(message.into());
        self
    }

    pub fn calls(&self) -> MockCalls {
        MockCalls {
            status: self.counters.status.load(Ordering::SeqCst),
            disconnect: self.counters.disconnect.load(Ordering::SeqCst),
            connect: self.counters.connect.load(Ordering::SeqCst),
            scan: self.counters.scan.load(Ordering::SeqCst),
            cycles: self.counters.cycles.load(Ordering::SeqCst),
        }
    }

    fn connected_ssid(&self) -> Option<String> {
        self.connected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_connected(&self, ssid: Option<String>) {
        *self
            .connected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = ssid;
    }

    fn fake_networks() -> Vec<Network> {
        let network = |bssid: &str, frequency: &str, signal: &str, flags: &str, ssid: &str| {
            Network {
                bssid: bssid.to_string(),
                frequency: frequency.to_string(),
                signal_level: signal.to_string(),
                flags: flags.to_string(),
                ssid: ssid.to_string(),
            }
        };
        let wpa2 = "[WPA2-PSK-CCMP][ESS]";

        vec![
            network("b8:27:eb:00:00:01", "2437", "-38", wpa2, "MyHomeWiFi"),
            network("b8:27:eb:00:00:02", "2412", "-61", "[ESS]", "CafeGuest"),
            network("b8:27:eb:00:00:03", "5180", "-72", wpa2, "Neighbor's Network"),
            network("b8:27:eb:00:00:04", "2462", "-44", wpa2, "xfinitywifi"),
            network("b8:27:eb:00:00:05", "2437", "-79", wpa2, "HiddenNetwork"),
        ]
    }
}

#[async_trait]
impl AdapterManager for MockAdapter {
    async fn status(&self) -> Result<StatusResult> {
        self.counters.status.fetch_add(1, Ordering::SeqCst);
        sleep(self.delay).await;

        if let Some(message) = &self.status_error {
            return Err(Error::Adapter(message.clone()));
        }

        let mut status = StatusResult::new();
        match self.connected_ssid() {
            Some(ssid) => {
                status.insert("wpa_state".to_string(), "COMPLETED".to_string());
                status.insert("ssid".to_string(), ssid);
                status.insert("ip_address".to_string(), "192.168.1.50".to_string());
            }
            None => {
                status.insert("wpa_state".to_string(), "DISCONNECTED".to_string());
            }
        }
        Ok(status)
    }

    async fn disconnect(&self) {
        self.counters.disconnect.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("🤖 [MockAdapter] Disconnecting (simulated).");
        sleep(self.delay).await;
        self.set_connected(None);
    }

    async fn connect_network(&self, credentials: &Credentials) -> Result<Connection> {
        self.counters.connect.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            ssid = %credentials.ssid,
            "🤖 [MockAdapter] Attempting to connect (psk {})",
            if credentials.psk.is_empty() { "empty" } else { "set" }
        );
        sleep(self.delay).await;

        // Simulate a failure for a specific network for testing purposes
        if credentials.ssid.is_empty() {
            return Err(Error::Adapter("ssid must not be empty".to_string()));
        }
        if credentials.ssid == "xfinitywifi" {
            tracing::debug!("🤖 [MockAdapter] Connection failed to '{}'", credentials.ssid);
            return Err(Error::Adapter("Simulated connection failure".to_string()));
        }

        self.set_connected(Some(credentials.ssid.clone()));
        Ok(Connection {
            ssid: credentials.ssid.clone(),
            state: "COMPLETED".to_string(),
            ip: "192.168.1.50".to_string(),
            message: "Connection successful".to_string(),
        })
    }

    async fn scan_networks(&self) -> Result<Vec<Network>> {
        self.counters.scan.fetch_add(1, Ordering::SeqCst);
        sleep(self.delay).await;

        if let Some(message) = &self.scan_error {
            return Err(Error::Adapter(message.clone()));
        }

        let networks = Self::fake_networks();
        tracing::debug!("🤖 [MockAdapter] Found {} networks.", networks.len());
        Ok(networks)
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = sleep(self.cycle) => {
                    self.counters.cycles.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_then_status_reports_completed() {
        let mock = MockAdapter::new();
        let creds = Credentials {
            ssid: "MyHomeWiFi".to_string(),
            psk: "hunter22".to_string(),
        };

        let connection = mock.connect_network(&creds).await.unwrap();
        assert_eq!(connection.ssid, "MyHomeWiFi");

        let status = mock.status().await.unwrap();
        assert_eq!(status["wpa_state"], "COMPLETED");
        assert_eq!(status["ssid"], "MyHomeWiFi");

        mock.disconnect().await;
        assert_eq!(mock.status().await.unwrap()["wpa_state"], "DISCONNECTED");
        assert_eq!(mock.calls().status, 2);
    }

    #[tokio::test]
    async fn simulated_failure_network() {
        let mock = MockAdapter::new();
        let creds = Credentials {
            ssid: "xfinitywifi".to_string(),
            psk: String::new(),
        };
        let err = mock.connect_network(&creds).await.unwrap_err();
        assert_eq!(err.to_string(), "Simulated connection failure");
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let mock = MockAdapter::new().with_cycle(Duration::from_millis(5));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });
        mock.run(token).await.unwrap();
        assert!(mock.calls().cycles > 0);
    }
}
