use crate::structs::{Network, StatusResult};

/// Parse `wpa_cli scan_results` output into Vec<Network>.
///
/// The first line is the column header; hidden networks (empty ssid) are skipped.
pub fn parse_scan_results(output: &str) -> Vec<Network> {
    let mut networks = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() >= 5 {
            let ssid = parts[4].to_string();

            if ssid.is_empty() || ssid == "\\x00" {
                continue;
            }

            networks.push(Network {
                bssid: parts[0].to_string(),
                frequency: parts[1].to_string(),
                signal_level: parts[2].to_string(),
                flags: parts[3].to_string(),
                ssid,
            });
        }
    }
    networks
}

/// Parse `wpa_cli status` output (`key=value` per line).
pub fn parse_status(output: &str) -> StatusResult {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_results_skip_header_and_hidden() {
        let output = "bssid / frequency / signal level / flags / ssid\n\
                      b8:27:eb:11:22:33\t2437\t-45\t[WPA2-PSK-CCMP][ESS]\thome-net\n\
                      b8:27:eb:44:55:66\t2412\t-80\t[ESS]\t\n\
                      b8:27:eb:77:88:99\t5180\t-60\t[ESS]\tcafe\n";
        let networks = parse_scan_results(output);
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].ssid, "home-net");
        assert_eq!(networks[0].bssid, "b8:27:eb:11:22:33");
        assert_eq!(networks[0].signal_level, "-45");
        assert_eq!(networks[1].frequency, "5180");
    }

    #[test]
    fn status_is_split_on_first_equals() {
        let output = "bssid=b8:27:eb:11:22:33\nssid=a=b\nwpa_state=COMPLETED\n\
                      ip_address=192.168.1.7\ngarbage\n";
        let status = parse_status(output);
        assert_eq!(status["wpa_state"], "COMPLETED");
        assert_eq!(status["ssid"], "a=b");
        assert_eq!(status["ip_address"], "192.168.1.7");
        assert!(!status.contains_key("garbage"));
    }
}
