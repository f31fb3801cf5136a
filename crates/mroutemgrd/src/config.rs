//! Configuration file support for mroutemgrd
//!
//! Loads and validates the daemon settings and static multicast routes from
//! TOML. Default location: /etc/sonic/mroutemgrd.toml
//!
//! ```toml
//! [daemon]
//! ipv6 = false
//!
//! [[mroute]]
//! source = "*"
//! group = "239.1.1.1"
//! inbound = "eth0"
//! outbound = ["eth1", "eth2"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sonic_mroute_types::{GroupAddress, SourceAddress};
use tracing::warn;

use crate::error::{MroutemgrdError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/sonic/mroutemgrd.toml";

/// Daemon-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Enable IPv4 multicast routing
    #[serde(default = "default_true")]
    pub ipv4: bool,

    /// Enable IPv6 multicast routing
    #[serde(default = "default_true")]
    pub ipv6: bool,

    /// IPv6 multicast forwarding switch, written on enable
    #[serde(default = "default_mc_forwarding_sysctl")]
    pub mc_forwarding_sysctl: Option<PathBuf>,

    /// TTL threshold for outbound interfaces when a route sets none
    #[serde(default = "default_ttl")]
    pub default_ttl: u8,
}

/// One static multicast route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Sender address, `*` for any
    #[serde(default = "default_source")]
    pub source: SourceAddress,

    pub group: GroupAddress,

    /// Interface the traffic arrives on
    pub inbound: String,

    /// Interfaces the traffic is forwarded to
    pub outbound: Vec<String>,

    /// Per-route TTL threshold (IPv4 only)
    #[serde(default)]
    pub ttl: Option<u8>,
}

/// Complete mroutemgrd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MroutemgrdConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default, rename = "mroute")]
    pub routes: Vec<RouteConfig>,
}

fn default_true() -> bool {
    true
}

fn default_mc_forwarding_sysctl() -> Option<PathBuf> {
    Some(PathBuf::from("/proc/sys/net/ipv6/conf/all/mc_forwarding"))
}

fn default_ttl() -> u8 {
    1
}

fn default_source() -> SourceAddress {
    SourceAddress::Any
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            ipv4: default_true(),
            ipv6: default_true(),
            mc_forwarding_sysctl: default_mc_forwarding_sysctl(),
            default_ttl: default_ttl(),
        }
    }
}

impl RouteConfig {
    /// TTL threshold for this route's outbound interfaces
    pub fn ttl_or(&self, default: u8) -> u8 {
        self.ttl.unwrap_or(default)
    }

    pub fn validate(&self) -> Result<()> {
        self.source.check_family(&self.group)?;

        if self.inbound.is_empty() {
            return Err(MroutemgrdError::config(format!(
                "{}: inbound interface missing",
                self
            )));
        }
        if self.outbound.is_empty() {
            return Err(MroutemgrdError::config(format!(
                "{}: no outbound interfaces",
                self
            )));
        }
        if self.outbound.iter().any(|o| *o == self.inbound) {
            return Err(MroutemgrdError::config(format!(
                "{}: inbound interface {} also listed as outbound",
                self, self.inbound
            )));
        }
        if self.ttl == Some(0) {
            return Err(MroutemgrdError::config(format!("{}: ttl must be > 0", self)));
        }
        Ok(())
    }
}

impl std::fmt::Display for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) from {}", self.source, self.group, self.inbound)
    }
}

impl MroutemgrdConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(MroutemgrdError::Io(e)),
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| MroutemgrdError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.daemon.default_ttl == 0 {
            return Err(MroutemgrdError::config("default_ttl must be > 0"));
        }
        for route in &self.routes {
            route.validate()?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MroutemgrdConfig {
    type Err = MroutemgrdError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(Path::new("<inline>"), s)
    }
}
