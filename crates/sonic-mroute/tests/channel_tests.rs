//! Control channel lifecycle against the fake kernel

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use sonic_mroute::{
    ChannelState, Flow, Ipv4, Ipv6, Mroute, MrouteChannel, MrouteError, MAX_MC_VIFS,
};
use sonic_mroute_test::*;
use sonic_mroute_types::InterfaceTable;

#[test]
fn test_enable_assigns_slots_skipping_loopback() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    let mut interfaces = basic_interfaces();

    channel.enable(&mut interfaces).unwrap();

    assert_eq!(channel.state(), ChannelState::Enabled);
    assert_eq!(interfaces.find_by_name("eth0").unwrap().vif, Some(0));
    assert_eq!(interfaces.find_by_name("lo").unwrap().vif, None);
    assert_eq!(interfaces.find_by_name("eth1").unwrap().vif, Some(1));
    // IPv6 annotations untouched
    assert!(interfaces.iter().all(|i| i.mif.is_none()));

    assert_eq!(kernel.registered_interfaces(), vec![(0, 0), (1, 2)]);
    assert_eq!(channel.slots().len(), 2);
    assert!(channel.registry().is_empty());

    let calls = kernel.calls();
    assert_eq!(calls[0], KernelCall::Open);
    assert_eq!(calls[1], KernelCall::Init);
    assert_eq!(
        calls[2],
        KernelCall::AddInterface {
            slot: 0,
            ifindex: 0,
            name: "eth0".to_string()
        }
    );
}

#[test]
fn test_enable_twice_is_rejected() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    let mut interfaces = basic_interfaces();
    channel.enable(&mut interfaces).unwrap();

    let err = channel.enable(&mut interfaces).unwrap_err();
    assert!(matches!(err, MrouteError::AlreadyEnabled { family: "IPv4" }));
    assert!(channel.is_enabled());
    assert_eq!(kernel.open_sockets(), 1);
}

#[test]
fn test_open_unavailable_is_not_fatal() {
    let (mut channel, kernel, _) = fake_channel::<Ipv6>();
    kernel.fail_open(libc::ENOPROTOOPT);

    let err = channel.enable(&mut basic_interfaces()).unwrap_err();
    assert!(matches!(err, MrouteError::Unavailable { family: "IPv6" }));
    assert!(!err.is_fatal());
    assert_eq!(channel.state(), ChannelState::Disabled);
}

#[test]
fn test_open_other_failure_is_fatal() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    kernel.fail_open(libc::EPERM);

    let err = channel.enable(&mut basic_interfaces()).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(channel.state(), ChannelState::Disabled);
}

#[test]
fn test_init_failures_close_socket() {
    let cases = [
        (libc::EADDRINUSE, "AlreadyOwned"),
        (libc::EOPNOTSUPP, "NotSupported"),
        (libc::EINVAL, "Fatal"),
    ];

    for (errno, expected) in cases {
        let (mut channel, kernel, sysctl) = fake_channel::<Ipv6>();
        kernel.fail_init(errno);
        let mut interfaces = basic_interfaces();

        let err = channel.enable(&mut interfaces).unwrap_err();
        let kind = match err {
            MrouteError::AlreadyOwned { .. } => "AlreadyOwned",
            MrouteError::NotSupported { .. } => "NotSupported",
            MrouteError::Fatal { .. } => "Fatal",
            _ => "other",
        };
        assert_eq!(kind, expected);
        assert_eq!(err.is_fatal(), expected == "Fatal");

        assert_eq!(kernel.open_sockets(), 0);
        assert_eq!(
            kernel.calls(),
            vec![KernelCall::Open, KernelCall::Init, KernelCall::Close]
        );
        assert_eq!(channel.state(), ChannelState::Disabled);
        assert!(sysctl.writes().is_empty());
        assert!(interfaces.iter().all(|i| i.mif.is_none()));
    }
}

#[test]
fn test_ipv6_enables_mc_forwarding() {
    let (mut channel, _, sysctl) = fake_channel::<Ipv6>();
    channel.enable(&mut basic_interfaces()).unwrap();

    assert_eq!(
        sysctl.writes(),
        vec![(
            PathBuf::from("/proc/sys/net/ipv6/conf/all/mc_forwarding"),
            true
        )]
    );
}

#[test]
fn test_ipv4_skips_mc_forwarding() {
    let (mut channel, _, sysctl) = fake_channel::<Ipv4>();
    channel.enable(&mut basic_interfaces()).unwrap();
    assert!(sysctl.writes().is_empty());
}

#[test]
fn test_mc_forwarding_failures_never_propagate() {
    for errno in [libc::EACCES, libc::ENOENT] {
        let kernel = FakeKernel::<Ipv6>::new();
        let sysctl = FakeSysctl::failing(errno);
        let mut channel: FakeChannel<Ipv6> = MrouteChannel::new(kernel.clone())
            .with_sysctl(sysctl.clone())
            .with_mc_forwarding_path(Some(PathBuf::from("/tmp/mc_forwarding")));
        let mut interfaces = basic_interfaces();

        channel.enable(&mut interfaces).unwrap();
        assert!(channel.is_enabled());
        assert_eq!(sysctl.writes().len(), 1);
        assert_eq!(interfaces.find_by_name("eth1").unwrap().mif, Some(1));
    }
}

#[test]
fn test_add_interface_failure_releases_slot() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    kernel.fail_add_interface("eth0", libc::EINVAL);
    let mut interfaces = basic_interfaces();

    channel.enable(&mut interfaces).unwrap();

    assert_eq!(interfaces.find_by_name("eth0").unwrap().vif, None);
    assert_eq!(interfaces.find_by_name("eth1").unwrap().vif, Some(0));
    assert_eq!(kernel.registered_interfaces(), vec![(0, 2)]);
    assert_eq!(channel.slots().len(), 1);
}

#[test]
fn test_wide_ifindex_gets_no_mif() {
    let (mut channel, kernel, _) = fake_channel::<Ipv6>();
    let mut interfaces = basic_interfaces();
    interfaces.insert(ethernet(65538, "eth9"));

    channel.enable(&mut interfaces).unwrap();

    assert_eq!(interfaces.find_by_name("eth9").unwrap().mif, None);
    assert_eq!(kernel.registered_interfaces(), vec![(0, 0), (1, 2)]);
    assert_eq!(channel.slots().len(), 2);
    assert_eq!(channel.slots().find_free(), Some(2));

    // IPv4 registration does not carry the ifindex
    let (mut channel, _, _) = fake_channel::<Ipv4>();
    channel.enable(&mut interfaces).unwrap();
    assert_eq!(interfaces.find_by_name("eth9").unwrap().vif, Some(2));
}

#[test]
fn test_capacity_exhaustion_continues() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    let mut interfaces = many_interfaces(MAX_MC_VIFS as u32 + 2);

    channel.enable(&mut interfaces).unwrap();

    assert!(channel.slots().is_full());
    assert_eq!(kernel.registered_interfaces().len(), MAX_MC_VIFS);
    let unassigned: Vec<&str> = interfaces
        .iter()
        .filter(|i| i.vif.is_none())
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(unassigned, vec!["eth32", "eth33"]);
}

#[test]
fn test_disable_releases_everything() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    let mut interfaces = basic_interfaces();
    channel.enable(&mut interfaces).unwrap();
    channel
        .add(Mroute::<Ipv4>::wildcard(
            "239.1.1.1".parse().unwrap(),
            0,
            outbound::<Ipv4>(&[1]),
        ))
        .unwrap();
    channel
        .resolve_dynamic(&Flow::new(
            "10.0.0.5".parse().unwrap(),
            "239.1.1.1".parse().unwrap(),
            0,
        ))
        .unwrap();
    assert_eq!(channel.registry().instances().len(), 1);
    kernel.clear_calls();

    channel.disable();

    // Instances are dropped without DEL_MFC; closing the socket flushes them
    assert!(kernel.deleted_routes().is_empty());
    assert_eq!(kernel.calls(), vec![KernelCall::Done, KernelCall::Close]);
    assert!(kernel.mfc().is_empty());
    assert_eq!(kernel.open_sockets(), 0);
    assert_eq!(channel.state(), ChannelState::Disabled);
    assert!(channel.registry().is_empty());
    assert!(channel.slots().is_empty());

    // No-op when already disabled
    channel.disable();
    assert_eq!(kernel.calls().len(), 2);
}

#[test]
fn test_disable_ignores_done_failure() {
    let (mut channel, kernel, _) = fake_channel::<Ipv6>();
    channel.enable(&mut basic_interfaces()).unwrap();
    kernel.fail_done(libc::EINVAL);

    channel.disable();
    assert_eq!(channel.state(), ChannelState::Disabled);
    assert_eq!(kernel.open_sockets(), 0);
}

#[test]
fn test_reenable_same_slot_order() {
    let (mut channel, _, _) = fake_channel::<Ipv4>();
    let mut interfaces = basic_interfaces();

    channel.enable(&mut interfaces).unwrap();
    let first: Vec<_> = channel.slots().iter().map(|(i, s)| (i, s.clone())).collect();
    channel
        .add(Mroute::<Ipv4>::wildcard(
            "239.1.1.1".parse().unwrap(),
            0,
            outbound::<Ipv4>(&[1]),
        ))
        .unwrap();

    channel.disable();
    channel.enable(&mut interfaces).unwrap();
    let second: Vec<_> = channel.slots().iter().map(|(i, s)| (i, s.clone())).collect();

    assert_eq!(first, second);
    assert!(channel.registry().is_empty());
}

#[test]
fn test_route_ops_require_enabled() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    let route = Mroute::<Ipv4>::wildcard("239.1.1.1".parse().unwrap(), 0, outbound::<Ipv4>(&[1]));

    assert!(matches!(
        channel.add(route.clone()),
        Err(MrouteError::NotEnabled { .. })
    ));
    assert!(matches!(
        channel.remove(&route),
        Err(MrouteError::NotEnabled { .. })
    ));
    assert!(kernel.calls().is_empty());
}

#[test]
fn test_drop_disables() {
    let kernel = FakeKernel::<Ipv4>::new();
    {
        let mut channel: FakeChannel<Ipv4> = MrouteChannel::new(kernel.clone());
        channel.enable(&mut InterfaceTable::new()).unwrap();
        assert_eq!(kernel.open_sockets(), 1);
    }
    assert_eq!(kernel.open_sockets(), 0);
    assert!(kernel.calls().contains(&KernelCall::Done));
}
