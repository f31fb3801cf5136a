//! (*,G) templates, dynamic (S,G) resolution and cascade removal

use std::net::{Ipv4Addr, Ipv6Addr};

use pretty_assertions::assert_eq;
use sonic_mroute::{ErrnoClass, Flow, Ipv4, Ipv6, Mroute, MrouteError};
use sonic_mroute_test::*;

const GROUP: Ipv4Addr = Ipv4Addr::new(239, 1, 1, 1);
const OTHER_GROUP: Ipv4Addr = Ipv4Addr::new(239, 9, 9, 9);

fn sender(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn enabled_ipv4() -> (FakeChannel<Ipv4>, FakeKernel<Ipv4>) {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    channel.enable(&mut basic_interfaces()).unwrap();
    kernel.clear_calls();
    (channel, kernel)
}

#[test]
fn test_scenario_eth0_lo_eth1() {
    let (mut channel, kernel, _) = fake_channel::<Ipv4>();
    let mut interfaces = basic_interfaces();
    channel.enable(&mut interfaces).unwrap();

    let eth0 = interfaces.find_by_name("eth0").unwrap().vif.unwrap();
    let eth1 = interfaces.find_by_name("eth1").unwrap().vif.unwrap();
    assert_eq!((eth0, eth1), (0, 1));
    assert_eq!(interfaces.find_by_name("lo").unwrap().vif, None);

    channel
        .add(Mroute::wildcard(GROUP, eth0, outbound::<Ipv4>(&[eth1])))
        .unwrap();
    channel
        .resolve_dynamic(&Flow::new(sender(5), GROUP, eth0))
        .unwrap();

    let expected = Mroute::<Ipv4>::concrete(sender(5), GROUP, 0, outbound::<Ipv4>(&[1]));
    assert_eq!(channel.registry().instances(), &[expected.clone()]);
    assert_eq!(kernel.mfc(), vec![expected]);
}

#[test]
fn test_each_sender_gets_its_own_instance() {
    let (mut channel, kernel) = enabled_ipv4();
    let template = Mroute::<Ipv4>::wildcard(GROUP, 0, outbound::<Ipv4>(&[1]));
    channel.add(template.clone()).unwrap();
    assert!(kernel.calls().is_empty());

    channel.resolve_dynamic(&Flow::new(sender(5), GROUP, 0)).unwrap();
    channel.resolve_dynamic(&Flow::new(sender(6), GROUP, 0)).unwrap();

    let added = kernel.added_routes();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|r| r.outbound == template.outbound));
    assert_eq!(
        added.iter().map(|r| r.sender).collect::<Vec<_>>(),
        vec![Some(sender(5)), Some(sender(6))]
    );
    assert_eq!(channel.registry().instances_of(&template).count(), 2);
}

#[test]
fn test_unmatched_flow_installs_nothing() {
    let (mut channel, kernel) = enabled_ipv4();
    channel
        .add(Mroute::<Ipv4>::wildcard(GROUP, 0, outbound::<Ipv4>(&[1])))
        .unwrap();

    let err = channel
        .resolve_dynamic(&Flow::new(sender(5), OTHER_GROUP, 0))
        .unwrap_err();

    assert!(matches!(err, MrouteError::NoMatchingTemplate { .. }));
    assert_eq!(err.errno_class(), Some(ErrnoClass::NoEntry));
    assert!(kernel.calls().is_empty());
    assert!(channel.registry().instances().is_empty());
}

#[test]
fn test_remove_template_cascades_to_kernel() {
    let (mut channel, kernel) = enabled_ipv4();
    let template = Mroute::<Ipv4>::wildcard(GROUP, 0, outbound::<Ipv4>(&[1]));
    let unrelated = Mroute::<Ipv4>::wildcard(OTHER_GROUP, 0, outbound::<Ipv4>(&[1]));
    channel.add(template.clone()).unwrap();
    channel.add(unrelated.clone()).unwrap();
    for last in [5, 6, 7] {
        channel.resolve_dynamic(&Flow::new(sender(last), GROUP, 0)).unwrap();
    }
    channel
        .resolve_dynamic(&Flow::new(sender(8), OTHER_GROUP, 0))
        .unwrap();
    kernel.clear_calls();

    // The wildcard itself was never installed, so the kernel has no entry
    let err = channel.remove(&template).unwrap_err();
    assert_eq!(err.errno_class(), Some(ErrnoClass::NoEntry));

    let deleted = kernel.deleted_routes();
    assert_eq!(deleted.len(), 4);
    assert_eq!(deleted.last(), Some(&template));
    assert!(kernel.added_routes().is_empty());

    assert_eq!(channel.registry().templates(), &[unrelated.clone()]);
    assert_eq!(channel.registry().instances().len(), 1);
    assert_eq!(kernel.mfc().len(), 1);
    assert_eq!(kernel.mfc()[0].group, OTHER_GROUP);
}

#[test]
fn test_install_then_uninstall_nets_to_nothing() {
    let (mut channel, kernel) = enabled_ipv4();
    let route = Mroute::<Ipv4>::concrete(sender(5), GROUP, 0, outbound::<Ipv4>(&[1]));

    channel.add(route.clone()).unwrap();
    assert_eq!(kernel.mfc().len(), 1);
    channel.remove(&route).unwrap();

    assert!(kernel.mfc().is_empty());
    assert!(channel.registry().is_empty());
}

#[test]
fn test_add_failure_surfaces_kernel_error() {
    let (mut channel, kernel) = enabled_ipv4();
    kernel.fail_add_route(Some(libc::ENOBUFS));

    let err = channel
        .add(Mroute::<Ipv4>::concrete(sender(5), GROUP, 0, outbound::<Ipv4>(&[1])))
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.errno_class(), Some(ErrnoClass::OutOfResources));
    assert_eq!(kernel.added_routes().len(), 1);
}

#[test]
fn test_disable_enable_empties_registry() {
    let (mut channel, kernel) = enabled_ipv4();
    channel
        .add(Mroute::<Ipv4>::wildcard(GROUP, 0, outbound::<Ipv4>(&[1])))
        .unwrap();
    channel.resolve_dynamic(&Flow::new(sender(5), GROUP, 0)).unwrap();

    channel.disable();
    channel.enable(&mut basic_interfaces()).unwrap();

    assert!(channel.registry().is_empty());
    assert!(kernel.mfc().is_empty());
    let err = channel
        .resolve_dynamic(&Flow::new(sender(5), GROUP, 0))
        .unwrap_err();
    assert!(matches!(err, MrouteError::NoMatchingTemplate { .. }));
}

#[test]
fn test_ipv6_dynamic_resolution() {
    let (mut channel, kernel, _) = fake_channel::<Ipv6>();
    let mut interfaces = basic_interfaces();
    channel.enable(&mut interfaces).unwrap();
    assert_eq!(interfaces.find_by_name("eth1").unwrap().mif, Some(1));

    let group: Ipv6Addr = "ff0e::1".parse().unwrap();
    let source: Ipv6Addr = "2001:db8::5".parse().unwrap();
    let template = Mroute::<Ipv6>::wildcard(group, 0, outbound::<Ipv6>(&[1]));
    channel.add(template.clone()).unwrap();

    channel.resolve_dynamic(&Flow::new(source, group, 0)).unwrap();
    assert_eq!(
        kernel.mfc(),
        vec![Mroute::<Ipv6>::concrete(source, group, 0, outbound::<Ipv6>(&[1]))]
    );

    kernel.clear_calls();
    let _ = channel.remove(&template);
    assert_eq!(kernel.deleted_routes().len(), 2);
    assert!(kernel.mfc().is_empty());
    assert!(channel.registry().is_empty());
}
