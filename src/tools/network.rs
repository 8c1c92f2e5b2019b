//! Network builtin tools: interfaces, connectivity, WiFi status

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{ParamSpec, Tool};
use crate::Result;

/// Budget for a single reachability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Well-known DNS endpoints used as reachability targets
const PROBE_HOSTS: &[(&str, &str)] = &[
    ("8.8.8.8:53", "Google DNS"),
    ("1.1.1.1:53", "Cloudflare DNS"),
    ("208.67.222.222:53", "OpenDNS"),
];

/// Reports network interfaces and addresses via platform probes
pub struct NetworkInfoTool;

#[async_trait]
impl Tool for NetworkInfoTool {
    fn name(&self) -> &str {
        "get_network_info"
    }

    fn description(&self) -> &str {
        "Get network interfaces and IP addresses"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn call(&self, _arguments: &Value) -> Result<String> {
        let mut info = String::from("Network information:\n");

        #[cfg(target_os = "linux")]
        if let Ok(output) = tokio::process::Command::new("ip")
            .args(["-brief", "addr"])
            .output()
            .await
        {
            let text = String::from_utf8_lossy(&output.stdout);
            for line in text.lines().filter(|l| !l.starts_with("lo ")) {
                info.push_str(line.trim());
                info.push('\n');
            }
        }

        #[cfg(target_os = "macos")]
        if let Ok(output) = tokio::process::Command::new("ifconfig").output().await {
            let text = String::from_utf8_lossy(&output.stdout);
            for line in text.lines().filter(|l| l.trim_start().starts_with("inet ")) {
                info.push_str(line.trim());
                info.push('\n');
            }
        }

        // The address a default route actually uses; no packet is sent
        if let Some(ip) = primary_ip() {
            info.push_str(&format!("Primary IP: {ip}\n"));
        }

        if info.lines().count() <= 1 {
            return Ok("No active network interfaces found.".to_string());
        }
        Ok(info.trim_end().to_string())
    }
}

/// The local address the OS picks for outbound traffic
fn primary_ip() -> Option<String> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

/// Checks internet reachability against well-known DNS servers
pub struct CheckInternetTool;

#[async_trait]
impl Tool for CheckInternetTool {
    fn name(&self) -> &str {
        "check_internet"
    }

    fn description(&self) -> &str {
        "Check whether the internet connection is working"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn call(&self, _arguments: &Value) -> Result<String> {
        for (addr, name) in PROBE_HOSTS {
            match tokio::time::timeout(PROBE_TIMEOUT, tokio::net::TcpStream::connect(addr)).await {
                Ok(Ok(_)) => {
                    return Ok(format!("Internet is connected. Successfully reached {name}."));
                }
                Ok(Err(e)) => tracing::debug!(host = name, error = %e, "probe failed"),
                Err(_) => tracing::debug!(host = name, "probe timed out"),
            }
        }
        Ok("No internet connection detected. Could not reach any DNS servers.".to_string())
    }
}

/// Reports the active WiFi network, signal strength, and security
pub struct WifiInfoTool;

#[async_trait]
impl Tool for WifiInfoTool {
    fn name(&self) -> &str {
        "get_wifi_info"
    }

    fn description(&self) -> &str {
        "Get the WiFi network name, signal strength, and security type"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    async fn call(&self, _arguments: &Value) -> Result<String> {
        // NetworkManager first, iwconfig for minimal systems
        if let Ok(output) = tokio::process::Command::new("nmcli")
            .args(["-t", "-f", "ACTIVE,SSID,SIGNAL,SECURITY", "device", "wifi"])
            .output()
            .await
        {
            if output.status.success() {
                let text = String::from_utf8_lossy(&output.stdout);
                return Ok(summarize_nmcli(&text));
            }
        }

        if let Ok(output) = tokio::process::Command::new("iwconfig").output().await {
            let text = String::from_utf8_lossy(&output.stdout);
            if let Some(line) = text.lines().find(|l| l.contains("ESSID")) {
                return Ok(format!("WiFi: {}", line.trim()));
            }
        }

        Ok("Could not determine WiFi status. NetworkManager or wireless tools not available."
            .to_string())
    }
}

/// Reduce `nmcli -t` wifi output to one spoken-friendly status line
fn summarize_nmcli(output: &str) -> String {
    for line in output.lines() {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 4 && parts[0] == "yes" {
            let ssid = if parts[1].is_empty() { "Hidden Network" } else { parts[1] };
            let signal = if parts[2].is_empty() { "unknown" } else { parts[2] };
            let security = if parts[3].is_empty() { "Open" } else { parts[3] };
            return format!(
                "WiFi connected: {ssid}\nSignal strength: {signal}%\nSecurity: {security}"
            );
        }
    }
    "WiFi available but not connected to any network.".to_string()
}
