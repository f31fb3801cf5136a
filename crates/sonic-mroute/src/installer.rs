//! Stateless kernel route installer.

use tracing::{info, warn};

use crate::error::{MrouteError, MrouteResult};
use crate::family::Family;
use crate::kernel::KernelSocket;
use crate::route::Mroute;

/// Install or update `route` in the kernel forwarding cache.
pub fn install<F, S>(socket: &mut S, route: &Mroute<F>) -> MrouteResult<()>
where
    F: Family,
    S: KernelSocket<F> + ?Sized,
{
    info!(
        family = F::NAME,
        source = %route.origin(),
        group = %route.group,
        inbound = route.inbound,
        "Adding {}",
        route
    );

    socket.add_route(route).map_err(|e| {
        let err = MrouteError::kernel(F::NAME, F::OPS.add_mfc, e);
        warn!(
            family = F::NAME,
            source = %route.origin(),
            group = %route.group,
            inbound = route.inbound,
            "Failed adding {}: {}",
            route,
            err
        );
        err
    })
}

/// Remove the kernel forwarding cache entry matching `route`'s origin and group.
pub fn uninstall<F, S>(socket: &mut S, route: &Mroute<F>) -> MrouteResult<()>
where
    F: Family,
    S: KernelSocket<F> + ?Sized,
{
    info!(
        family = F::NAME,
        source = %route.origin(),
        group = %route.group,
        inbound = route.inbound,
        "Removing {}",
        route
    );

    socket.del_route(route).map_err(|e| {
        let err = MrouteError::kernel(F::NAME, F::OPS.del_mfc, e);
        warn!(
            family = F::NAME,
            source = %route.origin(),
            group = %route.group,
            "Failed removing {}: {}",
            route,
            err
        );
        err
    })
}
