//! Raw socket implementation of the control channel.

#[cfg(target_os = "linux")]
mod linux {
    use std::io;
    use std::marker::PhantomData;
    use std::mem::size_of;
    use std::os::fd::AsRawFd;
    use std::ptr;

    use socket2::{Domain, Protocol, Socket, Type};
    use sonic_mroute_types::{Interface, SlotIndex};
    use tracing::trace;

    use super::super::{KernelSocket, MrouteCodec, MrouteKernel};
    use crate::route::Mroute;

    /// Opens raw IGMP / ICMPv6 sockets for multicast routing.
    #[derive(Debug)]
    pub struct RawMrouteKernel<F> {
        _family: PhantomData<fn() -> F>,
    }

    impl<F> RawMrouteKernel<F> {
        pub fn new() -> Self {
            Self {
                _family: PhantomData,
            }
        }
    }

    impl<F> Default for RawMrouteKernel<F> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<F: MrouteCodec> MrouteKernel<F> for RawMrouteKernel<F> {
        type Socket = RawMrouteSocket<F>;

        fn open(&self) -> io::Result<RawMrouteSocket<F>> {
            let socket = Socket::new(
                Domain::from(F::DOMAIN),
                Type::RAW,
                Some(Protocol::from(F::PROTOCOL)),
            )?;
            trace!(family = F::NAME, fd = socket.as_raw_fd(), "Opened mroute socket");
            Ok(RawMrouteSocket {
                socket,
                _family: PhantomData,
            })
        }
    }

    /// Raw control socket; closed when dropped.
    #[derive(Debug)]
    pub struct RawMrouteSocket<F> {
        socket: Socket,
        _family: PhantomData<fn() -> F>,
    }

    impl<F: MrouteCodec> RawMrouteSocket<F> {
        fn setsockopt<T>(&self, opt: i32, value: Option<&T>) -> io::Result<()> {
            let (ptr, len) = match value {
                Some(value) => (
                    value as *const T as *const libc::c_void,
                    size_of::<T>() as libc::socklen_t,
                ),
                None => (ptr::null(), 0),
            };
            // SAFETY: ptr is null with len 0 or points to a live T of len bytes
            let rc = unsafe { libc::setsockopt(self.socket.as_raw_fd(), F::LEVEL, opt, ptr, len) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl<F: MrouteCodec> KernelSocket<F> for RawMrouteSocket<F> {
        fn init(&mut self) -> io::Result<()> {
            let one: libc::c_int = 1;
            self.setsockopt(F::OPT_INIT, Some(&one))
        }

        fn done(&mut self) -> io::Result<()> {
            self.setsockopt::<libc::c_int>(F::OPT_DONE, None)
        }

        fn add_interface(&mut self, slot: SlotIndex, iface: &Interface) -> io::Result<()> {
            let ctl = F::encode_slot(slot, iface)?;
            self.setsockopt(F::OPT_ADD_SLOT, Some(&ctl))
        }

        fn add_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
            let ctl = F::encode_add(route);
            self.setsockopt(F::OPT_ADD_MFC, Some(&ctl))
        }

        fn del_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
            let ctl = F::encode_del(route);
            self.setsockopt(F::OPT_DEL_MFC, Some(&ctl))
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::*;

/// Mock implementation for non-Linux platforms (development only)
#[cfg(not(target_os = "linux"))]
mod mock {
    use std::io;
    use std::marker::PhantomData;

    use sonic_mroute_types::{Interface, SlotIndex};

    use super::super::{KernelSocket, MrouteKernel};
    use crate::family::Family;
    use crate::route::Mroute;

    #[derive(Debug)]
    pub struct RawMrouteKernel<F> {
        _family: PhantomData<fn() -> F>,
    }

    impl<F> RawMrouteKernel<F> {
        pub fn new() -> Self {
            Self {
                _family: PhantomData,
            }
        }
    }

    impl<F> Default for RawMrouteKernel<F> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<F: Family> MrouteKernel<F> for RawMrouteKernel<F> {
        type Socket = RawMrouteSocket<F>;

        fn open(&self) -> io::Result<RawMrouteSocket<F>> {
            Err(io::Error::from_raw_os_error(libc::ENOPROTOOPT))
        }
    }

    #[derive(Debug)]
    pub struct RawMrouteSocket<F> {
        _family: PhantomData<fn() -> F>,
    }

    #[allow(unused_variables)]
    impl<F: Family> KernelSocket<F> for RawMrouteSocket<F> {
        fn init(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn done(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn add_interface(&mut self, slot: SlotIndex, iface: &Interface) -> io::Result<()> {
            Ok(())
        }

        fn add_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
            Ok(())
        }

        fn del_route(&mut self, route: &Mroute<F>) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use mock::*;

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::error::ErrnoClass;
    use crate::family::Ipv4;
    use crate::kernel::MrouteKernel;

    #[test]
    fn test_open_without_privileges_is_classified() {
        // Raw sockets need CAP_NET_RAW; either outcome must be well-formed.
        let kernel = RawMrouteKernel::<Ipv4>::new();
        if let Err(err) = kernel.open() {
            let class = ErrnoClass::from_io(&err);
            assert!(matches!(
                class,
                ErrnoClass::PermissionDenied | ErrnoClass::ProtoNotAvailable | ErrnoClass::Other(_)
            ));
        }
    }
}
