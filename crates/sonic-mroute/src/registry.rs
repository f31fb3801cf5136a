//! (*,G) templates and the (S,G) instances derived from them.
//!
//! The kernel only forwards (S,G) entries. A (*,G) route is therefore kept
//! here as a template, and every time the kernel reports a flow with no
//! matching entry, [`RouteRegistry::resolve_dynamic`] derives an (S,G)
//! instance from the first template with the same group and inbound
//! interface. Removing a template removes everything derived from it.

use tracing::{debug, warn};

use sonic_mroute_types::SlotIndex;

use crate::error::{MrouteError, MrouteResult};
use crate::family::Family;
use crate::installer;
use crate::kernel::KernelSocket;
use crate::route::{Flow, Mroute};

#[derive(Debug, Clone)]
pub struct RouteRegistry<F: Family> {
    /// Wildcard routes, in insertion order
    templates: Vec<Mroute<F>>,
    /// Concrete routes derived from templates
    instances: Vec<Mroute<F>>,
}

impl<F: Family> Default for RouteRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Family> RouteRegistry<F> {
    pub fn new() -> Self {
        Self {
            templates: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Add a route.
    ///
    /// Wildcards are stored as templates without touching the kernel.
    /// Concrete routes go straight to the kernel and are not tracked.
    pub fn add<S>(&mut self, socket: &mut S, route: Mroute<F>) -> MrouteResult<()>
    where
        S: KernelSocket<F> + ?Sized,
    {
        if !route.is_wildcard() {
            return installer::install(socket, &route);
        }

        debug!(family = F::NAME, group = %route.group, "Adding template {}", route);
        self.templates.push(route);
        Ok(())
    }

    /// Install an (S,G) route for a flow the kernel could not forward.
    pub fn resolve_dynamic<S>(&mut self, socket: &mut S, flow: &Flow<F>) -> MrouteResult<()>
    where
        S: KernelSocket<F> + ?Sized,
    {
        let Some(template) = self
            .templates
            .iter()
            .find(|t| t.matches(&flow.group, flow.inbound))
        else {
            debug!(family = F::NAME, "No (*,G) match for {}", flow);
            return Err(MrouteError::no_matching_template(flow.group, flow.inbound));
        };

        let route = flow.to_route(template.outbound.clone());
        self.track(&route);
        installer::install(socket, &route)
    }

    fn track(&mut self, route: &Mroute<F>) {
        let known = self
            .instances
            .iter()
            .any(|i| i.sender == route.sender && i.matches(&route.group, route.inbound));
        if known {
            return;
        }

        // Losing track of an instance only means it outlives its template.
        if let Err(e) = self.instances.try_reserve(1) {
            warn!(
                family = F::NAME,
                group = %route.group,
                "Not tracking {}, allocation failed: {}",
                route,
                e
            );
            return;
        }
        self.instances.push(route.clone());
    }

    /// Remove a route.
    ///
    /// For a wildcard, every matching template and every instance derived
    /// from it are dropped, the instances are removed from the kernel, and
    /// the result of removing the wildcard entry itself is returned.
    /// Concrete routes are removed from the kernel only.
    pub fn remove<S>(&mut self, socket: &mut S, route: &Mroute<F>) -> MrouteResult<()>
    where
        S: KernelSocket<F> + ?Sized,
    {
        if route.is_wildcard() {
            let (group, inbound) = (route.group, route.inbound);
            if self.templates.iter().any(|t| t.matches(&group, inbound)) {
                self.instances.retain(|instance| {
                    if !instance.matches(&group, inbound) {
                        return true;
                    }
                    // Already logged by the installer
                    let _ = installer::uninstall(socket, instance);
                    false
                });
                self.templates.retain(|t| !t.matches(&group, inbound));
            }
        }

        installer::uninstall(socket, route)
    }

    pub fn templates(&self) -> &[Mroute<F>] {
        &self.templates
    }

    pub fn instances(&self) -> &[Mroute<F>] {
        &self.instances
    }

    /// Instances derived from templates matching `template`'s group and inbound.
    pub fn instances_of<'a>(
        &'a self,
        template: &'a Mroute<F>,
    ) -> impl Iterator<Item = &'a Mroute<F>> + 'a {
        self.instances_for(template.group, template.inbound)
    }

    fn instances_for(
        &self,
        group: F::Addr,
        inbound: SlotIndex,
    ) -> impl Iterator<Item = &Mroute<F>> + '_ {
        self.instances
            .iter()
            .filter(move |i| i.matches(&group, inbound))
    }

    /// Forget every template and instance without touching the kernel.
    pub fn clear(&mut self) {
        self.templates.clear();
        self.instances.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.instances.is_empty()
    }
}
