//! Configuration management.

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Read schedule poll interval in milliseconds
    #[serde(default = "default_poll")]
    pub poll: u64,

    /// Emulated board configuration
    #[serde(default)]
    pub board: BoardConfig,

    /// TCP line transport
    #[serde(default)]
    pub tcp: TcpConfig,

    /// Serial line transport
    #[serde(default)]
    pub serial: SerialConfig,

    /// HTTP and WebSocket server
    #[serde(default)]
    pub web: WebConfig,
}

/// Emulated board configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of direct pins (at most 100)
    #[serde(default = "default_pins")]
    pub pins: u8,

    /// ADC resolution in bits
    #[serde(default = "default_analog_bits")]
    pub analog_bits: u8,

    /// Reporting interval for registered reads without one, in milliseconds
    #[serde(default = "default_interval")]
    pub default_interval: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            pins: default_pins(),
            analog_bits: default_analog_bits(),
            default_interval: default_interval(),
        }
    }
}

/// TCP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Listen address (e.g., "0.0.0.0:5150")
    #[serde(default = "default_tcp_listen")]
    pub listen: String,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            enable: true,
            listen: default_tcp_listen(),
        }
    }
}

/// Serial transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default)]
    pub enable: bool,

    /// Serial port path
    #[serde(default = "default_serial_device")]
    pub device: String,

    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enable: false,
            device: default_serial_device(),
            baud: default_baud(),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Listen address (e.g., "0.0.0.0:8686")
    #[serde(default = "default_web_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: true,
            listen: default_web_listen(),
        }
    }
}

// Default value functions
fn default_poll() -> u64 {
    20
}

fn default_pins() -> u8 {
    20 // UNO R4: D0-D13, A0-A5
}

fn default_analog_bits() -> u8 {
    10
}

fn default_interval() -> u64 {
    pinlink_device::DEFAULT_READ_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_tcp_listen() -> String {
    "0.0.0.0:5150".to_string()
}

fn default_serial_device() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud() -> u32 {
    pinlink_proto::DEFAULT_BAUD_RATE
}

fn default_web_listen() -> String {
    "0.0.0.0:8686".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        if usize::from(config.board.pins) > usize::from(pinlink_proto::codes::PIN_END) + 1 {
            anyhow::bail!(
                "board.pins must be at most {}",
                pinlink_proto::codes::PIN_END + 1
            );
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll: default_poll(),
            board: BoardConfig::default(),
            tcp: TcpConfig::default(),
            serial: SerialConfig::default(),
            web: WebConfig::default(),
        }
    }
}
