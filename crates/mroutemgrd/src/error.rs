//! Error types for mroutemgrd

use std::io;
use std::path::PathBuf;

use sonic_mroute::MrouteError;
use sonic_mroute_types::ParseError;
use thiserror::Error;

/// Multicast routing daemon errors
#[derive(Error, Debug)]
pub enum MroutemgrdError {
    /// Config file could not be parsed
    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config parsed but is inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Address or interface name did not parse
    #[error("Invalid value: {0}")]
    Parse(#[from] ParseError),

    /// Route refers to an interface that does not exist
    #[error("Unknown interface {0}")]
    UnknownInterface(String),

    /// Interface exists but was not given a VIF/MIF
    #[error("Interface {name} has no {kind}")]
    NoSlot { name: String, kind: &'static str },

    /// Interface enumeration failed
    #[error("Interface discovery failed: {0}")]
    Discovery(String),

    /// Multicast routing core error
    #[error(transparent)]
    Mroute(#[from] MrouteError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl MroutemgrdError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type for mroutemgrd operations
pub type Result<T> = std::result::Result<T, MroutemgrdError>;
