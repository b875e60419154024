use serde::{Deserialize, Serialize};

/// Network-condition emulation parameters, mirroring the CDP
/// `Network.emulateNetworkConditions` shape. Throughputs are bytes/second;
/// `-1` means unthrottled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConditions {
    pub offline: bool,
    pub download_throughput: f64,
    pub upload_throughput: f64,
    pub latency_ms: u64,
}

impl NetworkConditions {
    /// Degraded 3G-class connection used by the unstable-connection scenario.
    pub fn slow_3g() -> Self {
        Self {
            offline: false,
            download_throughput: 1.5 * 1024.0 * 1024.0 / 8.0,
            upload_throughput: 750.0 * 1024.0 / 8.0,
            latency_ms: 300,
        }
    }

    /// Full connection loss.
    pub fn offline() -> Self {
        Self {
            offline: true,
            download_throughput: 0.0,
            upload_throughput: 0.0,
            latency_ms: 0,
        }
    }

    /// Restores an unthrottled connection.
    pub fn restored() -> Self {
        Self {
            offline: false,
            download_throughput: -1.0,
            upload_throughput: -1.0,
            latency_ms: 0,
        }
    }
}
