use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use linkdelay_common::{Clock, CollectingSink, ManualClock};
use linkdelay_queue::{LinkConfig, PacketQueue, RuleDelayQueue, IDLE_WAIT};
use linkdelay_rules::{protocol, DelayRule, Direction, RuleSet};
use rand::Rng;

use crate::common::{tcp, udp, HOST};

/// Destination port of a prefixed IPv4 packet without options.
fn port_of(packet: &[u8]) -> u16 {
    u16::from_be_bytes([packet[26], packet[27]])
}

#[test]
fn drain_releases_in_time_order() {
    let _ = tracing_subscriber::fmt::try_init();

    // Every port gets a delay equal to its number.
    let server = Ipv4Addr::new(198, 51, 100, 7);
    let rules: RuleSet = (1..=200u16)
        .map(|port| DelayRule::new(protocol::UDP, server, port, u64::from(port), 0))
        .collect();

    let clock = ManualClock::new(0);
    let mut queue = RuleDelayQueue::with_clock(
        Arc::new(rules),
        Direction::Uplink,
        &LinkConfig::new(0),
        clock.clone(),
    );

    let mut rng = rand::thread_rng();
    let mut expected = Vec::new();
    for _ in 0..500 {
        clock.set(clock.now_millis().max(rng.gen_range(0..50)));
        let port = rng.gen_range(1..=200u16);
        expected.push((clock.now_millis() + u64::from(port), port));
        queue.enqueue(udp(HOST, server, 5000, port, 64)).unwrap();
    }
    expected.sort_unstable_by_key(|(release_at, _)| *release_at);

    // Rewind, then jump straight to each release time: everything drained then was due
    // exactly now.
    clock.set(0);
    let mut sink = CollectingSink::new();
    let mut released = Vec::new();
    while queue.pending() > 0 {
        clock.advance(queue.time_until_next());
        let before = sink.len();
        assert!(queue.drain(&mut sink).unwrap() > 0);
        assert!(!queue.has_pending_output());

        let now = clock.now_millis();
        for packet in &sink.packets()[before..] {
            assert_eq!(now, expected[released.len()].0);
            released.push((now, port_of(packet)));
        }
    }

    assert_eq!(released.len(), 500);
    assert!(released.windows(2).all(|w| w[0].0 <= w[1].0));
    for (now, port) in &released {
        // A packet is never released before its port's delay has elapsed since time 0.
        assert!(*now >= u64::from(*port));
    }
    assert_eq!(queue.time_until_next(), IDLE_WAIT);
}

#[test]
fn time_until_next_follows_the_earliest_packet() {
    let server = Ipv4Addr::new(198, 51, 100, 8);
    let rules: RuleSet = "6 198.51.100.8 443 250 0\n6 198.51.100.8 80 90 0".parse().unwrap();
    let clock = ManualClock::new(10_000);
    let config = LinkConfig::new(400);
    let mut queue =
        RuleDelayQueue::with_clock(Arc::new(rules), Direction::Uplink, &config, clock.clone());

    assert_eq!(queue.time_until_next(), IDLE_WAIT);

    queue.enqueue(tcp(HOST, server, 40000, 443, 60)).unwrap();
    assert_eq!(queue.time_until_next(), Duration::from_millis(250));

    queue.enqueue(tcp(HOST, server, 40001, 80, 60)).unwrap();
    assert_eq!(queue.time_until_next(), Duration::from_millis(90));

    queue.enqueue(tcp(HOST, server, 40002, 22, 60)).unwrap();
    assert_eq!(queue.time_until_next(), Duration::from_millis(90));

    clock.advance(Duration::from_millis(95));
    assert!(queue.has_pending_output());
    assert_eq!(queue.time_until_next(), Duration::ZERO);

    let mut sink = CollectingSink::new();
    assert_eq!(queue.drain(&mut sink).unwrap(), 1);
    assert_eq!(port_of(&sink.packets()[0]), 80);
    assert_eq!(queue.time_until_next(), Duration::from_millis(155));

    clock.advance(Duration::from_millis(400));
    assert_eq!(queue.drain(&mut sink).unwrap(), 2);
    let ports: Vec<_> = sink.packets().iter().map(|p| port_of(p)).collect();
    assert_eq!(ports, vec![80, 443, 22]);
}
