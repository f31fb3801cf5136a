//! mroutemgrd - static multicast routing daemon
//!
//! Reads static (*,G) and (S,G) routes from TOML, discovers local
//! interfaces and programs them into the kernel through `sonic-mroute`.

pub mod config;
pub mod discovery;
pub mod error;
pub mod mgr;

pub use config::{DaemonConfig, MroutemgrdConfig, RouteConfig, DEFAULT_CONFIG_PATH};
pub use discovery::discover_interfaces;
pub use error::{MroutemgrdError, Result};
pub use mgr::{build_route, ApplySummary, KernelMrouteMgr, MrouteMgr};
