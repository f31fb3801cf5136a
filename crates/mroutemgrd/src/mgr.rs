//! Multicast Route Manager - drives both families from the static config

use sonic_mroute::{
    Family, Ipv4, Ipv6, Mroute, MrouteChannel, MrouteKernel, Outbound, RawMrouteKernel,
};
use sonic_mroute_types::{InterfaceTable, SlotIndex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{MroutemgrdConfig, RouteConfig};
use crate::error::{MroutemgrdError, Result};

/// Outcome of applying the configured routes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub applied: usize,
    pub failed: usize,
    /// Routes for a family that is not enabled
    pub skipped: usize,
}

/// Multicast Route Manager
///
/// Owns the IPv4 and IPv6 control channels and the interface table they
/// annotate.
pub struct MrouteMgr<K4: MrouteKernel<Ipv4>, K6: MrouteKernel<Ipv6>> {
    config: MroutemgrdConfig,
    interfaces: InterfaceTable,
    ipv4: MrouteChannel<Ipv4, K4>,
    ipv6: MrouteChannel<Ipv6, K6>,
}

/// Manager on the raw kernel sockets
pub type KernelMrouteMgr = MrouteMgr<RawMrouteKernel<Ipv4>, RawMrouteKernel<Ipv6>>;

impl KernelMrouteMgr {
    pub fn with_kernel(config: MroutemgrdConfig) -> Self {
        let ipv6: MrouteChannel<Ipv6, _> = MrouteChannel::new(RawMrouteKernel::new())
            .with_mc_forwarding_path(mc_forwarding_path(&config));
        Self::new(config, MrouteChannel::new(RawMrouteKernel::new()), ipv6)
    }
}

fn mc_forwarding_path(config: &MroutemgrdConfig) -> Option<std::path::PathBuf> {
    config
        .daemon
        .mc_forwarding_sysctl
        .clone()
        .filter(|path| !path.as_os_str().is_empty())
}

impl<K4: MrouteKernel<Ipv4>, K6: MrouteKernel<Ipv6>> MrouteMgr<K4, K6> {
    pub fn new(
        config: MroutemgrdConfig,
        ipv4: MrouteChannel<Ipv4, K4>,
        ipv6: MrouteChannel<Ipv6, K6>,
    ) -> Self {
        Self {
            config,
            interfaces: InterfaceTable::new(),
            ipv4,
            ipv6,
        }
    }

    /// Enable the configured families over `interfaces` and apply routes.
    ///
    /// A family that cannot be enabled is skipped unless the failure is
    /// fatal, in which case the error is returned.
    #[instrument(skip(self, interfaces))]
    pub fn start(&mut self, interfaces: InterfaceTable) -> Result<ApplySummary> {
        self.interfaces = interfaces;

        if self.config.daemon.ipv4 {
            enable_family(&mut self.ipv4, &mut self.interfaces)?;
        }
        if self.config.daemon.ipv6 {
            enable_family(&mut self.ipv6, &mut self.interfaces)?;
        }

        let summary = self.apply_routes();
        info!(
            applied = summary.applied,
            failed = summary.failed,
            skipped = summary.skipped,
            "Applied static multicast routes"
        );
        Ok(summary)
    }

    /// Add every configured route to its family's channel.
    pub fn apply_routes(&mut self) -> ApplySummary {
        let mut summary = ApplySummary::default();
        let default_ttl = self.config.daemon.default_ttl;

        for route in &self.config.routes {
            let result = if route.group.is_ipv4() {
                apply_route(&mut self.ipv4, route, &self.interfaces, default_ttl)
            } else {
                apply_route(&mut self.ipv6, route, &self.interfaces, default_ttl)
            };

            match result {
                Ok(true) => summary.applied += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!(route = %route, "Failed to apply route: {}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Release both control channels.
    pub fn stop(&mut self) {
        self.ipv4.disable();
        self.ipv6.disable();
    }

    /// Tear everything down and start again with a new config and interfaces.
    #[instrument(skip_all)]
    pub fn reload(
        &mut self,
        config: MroutemgrdConfig,
        interfaces: InterfaceTable,
    ) -> Result<ApplySummary> {
        self.stop();
        self.config = config;
        self.start(interfaces)
    }

    pub fn config(&self) -> &MroutemgrdConfig {
        &self.config
    }

    pub fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    pub fn ipv4(&self) -> &MrouteChannel<Ipv4, K4> {
        &self.ipv4
    }

    pub fn ipv6(&self) -> &MrouteChannel<Ipv6, K6> {
        &self.ipv6
    }

    pub fn ipv4_mut(&mut self) -> &mut MrouteChannel<Ipv4, K4> {
        &mut self.ipv4
    }

    pub fn ipv6_mut(&mut self) -> &mut MrouteChannel<Ipv6, K6> {
        &mut self.ipv6
    }
}

fn enable_family<F, K>(channel: &mut MrouteChannel<F, K>, interfaces: &mut InterfaceTable) -> Result<()>
where
    F: Family,
    K: MrouteKernel<F>,
{
    match channel.enable(interfaces) {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => {
            error!(family = F::NAME, "{}", e);
            Err(e.into())
        }
        Err(e) => {
            warn!(family = F::NAME, "{} multicast routing disabled: {}", F::NAME, e);
            Ok(())
        }
    }
}

/// Returns Ok(false) when the family is not enabled.
fn apply_route<F, K>(
    channel: &mut MrouteChannel<F, K>,
    route: &RouteConfig,
    interfaces: &InterfaceTable,
    default_ttl: u8,
) -> Result<bool>
where
    F: Family,
    K: MrouteKernel<F>,
{
    if !channel.is_enabled() {
        debug!(family = F::NAME, route = %route, "Family not enabled, skipping");
        return Ok(false);
    }

    let mroute = build_route::<F>(route, interfaces, default_ttl)?;
    channel.add(mroute)?;
    Ok(true)
}

/// Resolve a configured route's interface names to this family's slots.
pub fn build_route<F: Family>(
    route: &RouteConfig,
    interfaces: &InterfaceTable,
    default_ttl: u8,
) -> Result<Mroute<F>> {
    let mismatch = || {
        MroutemgrdError::config(format!("{}: not an {} route", route, F::NAME))
    };

    let group = F::from_ip(route.group.inner()).ok_or_else(mismatch)?;
    let sender = match route.source.host() {
        Some(addr) => Some(F::from_ip(addr).ok_or_else(mismatch)?),
        None => None,
    };

    let inbound = slot_of::<F>(interfaces, &route.inbound)?;
    let ttl = route.ttl_or(default_ttl);
    let mut outbound = F::Outbound::default();
    for name in &route.outbound {
        let slot = slot_of::<F>(interfaces, name)?;
        outbound.set(slot, ttl);
    }

    Ok(Mroute {
        sender,
        group,
        inbound,
        outbound,
    })
}

fn slot_of<F: Family>(interfaces: &InterfaceTable, name: &str) -> Result<SlotIndex> {
    let iface = interfaces
        .find_by_name(name)
        .ok_or_else(|| MroutemgrdError::UnknownInterface(name.to_string()))?;
    F::slot_of(iface).ok_or_else(|| MroutemgrdError::NoSlot {
        name: name.to_string(),
        kind: F::SLOT_KIND,
    })
}
