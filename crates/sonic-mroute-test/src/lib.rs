//! Test infrastructure for the multicast routing control plane
//!
//! Provides:
//! - A fake kernel mroute API that records calls and models the MFC
//! - A recording sysctl writer with error injection
//! - Interface and route fixtures for common scenarios

pub mod fixtures;
mod kernel;
mod sysctl;

pub use fixtures::*;
pub use kernel::{FakeKernel, FakeSocket, KernelCall};
pub use sysctl::FakeSysctl;
