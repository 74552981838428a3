use std::{fs, io::Write, net::Ipv4Addr, sync::Arc, time::Duration};

use bytes::Bytes;
use linkdelay_common::{CollectingSink, ManualClock};
use linkdelay_queue::{CounterFiles, DelayLink, Error, LinkConfig, PacketQueue};
use linkdelay_rules::{parse_file, Direction, RuleSet};

use crate::common::{icmp, tcp, udp, HOST};

const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);

fn link(rules: &str, config: &LinkConfig) -> (DelayLink<ManualClock>, ManualClock) {
    let clock = ManualClock::new(0);
    let rules: RuleSet = rules.parse().unwrap();
    (DelayLink::with_clock(Arc::new(rules), config, clock.clone()), clock)
}

/// Enqueues `packet` on `direction` and returns the delay it was given.
fn delay_of(link: &mut DelayLink<ManualClock>, direction: Direction, packet: Bytes) -> u64 {
    let queue = link.queue_mut(direction);
    let pending = queue.pending();
    queue.enqueue(packet).unwrap();
    assert_eq!(queue.pending(), pending + 1);

    // Only this packet is queued when callers drain in between.
    queue.time_until_next().as_millis() as u64
}

fn flush(link: &mut DelayLink<ManualClock>, clock: &ManualClock) {
    clock.advance(Duration::from_secs(3600));
    let mut sink = CollectingSink::new();
    link.uplink.drain(&mut sink).unwrap();
    link.downlink.drain(&mut sink).unwrap();
}

#[test]
fn threshold_switch_is_permanent() {
    let (mut link, clock) = link("6 10.0.0.5 80 100 50 1000 5000", &LinkConfig::new(20));

    let mut delays = Vec::new();
    for _ in 0..5 {
        delays.push(delay_of(&mut link, Direction::Uplink, tcp(HOST, SERVER, 40000, 80, 500)));
        flush(&mut link, &clock);
    }
    assert_eq!(delays, vec![100, 100, 5000, 5000, 5000]);

    // Smaller packets do not bring the connection back under the threshold.
    assert_eq!(delay_of(&mut link, Direction::Uplink, tcp(HOST, SERVER, 40000, 80, 44)), 5000);

    // The downlink keeps its own counters.
    assert_eq!(delay_of(&mut link, Direction::Downlink, tcp(SERVER, HOST, 80, 40000, 1500)), 50);
}

#[test]
fn wildcard_rule_matches_every_port_and_protocol_subtype() {
    let (mut link, clock) = link("6 10.0.0.5 0 11 22\n1 10.0.0.5 0 33 44", &LinkConfig::new(20));

    for port in [1, 80, 443, 65535] {
        assert_eq!(delay_of(&mut link, Direction::Uplink, tcp(HOST, SERVER, 40000, port, 64)), 11);
        flush(&mut link, &clock);
        let response = tcp(SERVER, HOST, port, 40000, 64);
        assert_eq!(delay_of(&mut link, Direction::Downlink, response), 22);
        flush(&mut link, &clock);
    }

    assert_eq!(delay_of(&mut link, Direction::Uplink, icmp(HOST, SERVER, 84)), 33);
    flush(&mut link, &clock);
    assert_eq!(delay_of(&mut link, Direction::Downlink, icmp(SERVER, HOST, 84)), 44);

    assert_eq!(link.uplink.counters().packets((SERVER, 0)), Some(0));
}

#[test]
fn empty_rules_apply_default_delay() {
    let (mut link, _clock) = link("", &LinkConfig::new(20));

    assert_eq!(delay_of(&mut link, Direction::Uplink, tcp(HOST, SERVER, 40000, 80, 100)), 20);
    assert!(link.uplink.counters().is_empty());
    assert!(link.downlink.counters().is_empty());
}

#[test]
fn udp_rule_ignores_direction_threshold() {
    let (mut link, clock) = link("17 10.0.0.5 53 8 9 10 500", &LinkConfig::new(20));

    for _ in 0..3 {
        assert_eq!(delay_of(&mut link, Direction::Uplink, udp(HOST, SERVER, 5353, 53, 300)), 8);
        flush(&mut link, &clock);
    }
}

#[test]
fn too_small_packet_is_an_error() {
    let (mut link, _clock) = link("", &LinkConfig::new(20));

    let err = link.uplink.enqueue(Bytes::from_static(&[0u8; 12])).unwrap_err();
    assert!(matches!(err, Error::PacketTooSmall { len: 12, .. }));
}

#[test]
fn rules_file_to_counter_files() {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir().unwrap();

    let rules_path = dir.path().join("page.rules");
    let mut file = fs::File::create(&rules_path).unwrap();
    writeln!(file, "6 10.0.0.5 80 100 50 1000 5000").unwrap();
    writeln!(file, "6 10.0.0.6 443 10 10").unwrap();
    drop(file);

    let prefix = dir.path().join("page");
    let config = LinkConfig::new(20).with_output_prefix(&prefix);
    let clock = ManualClock::new(0);
    let rules = Arc::new(parse_file(&rules_path).unwrap());
    let mut link = DelayLink::with_clock(rules, &config, clock);

    for _ in 0..3 {
        link.uplink.enqueue(tcp(HOST, SERVER, 40000, 80, 500)).unwrap();
    }
    link.downlink.enqueue(tcp(SERVER, HOST, 80, 40000, 1200)).unwrap();
    link.downlink.enqueue(udp(SERVER, HOST, 53, 5353, 100)).unwrap();

    // Pending packets are dropped, counters are written.
    link.close().unwrap();

    let up = CounterFiles::new(&prefix, Direction::Uplink);
    assert_eq!(fs::read_to_string(up.total_bytes_path()).unwrap(), "1500\n");
    assert_eq!(
        fs::read_to_string(up.bytes_per_conn_path()).unwrap(),
        "10.0.0.5:80 1500\n10.0.0.6:443 0\n"
    );
    assert_eq!(
        fs::read_to_string(up.packets_per_conn_path()).unwrap(),
        "10.0.0.5:80 3\n10.0.0.6:443 0\n"
    );

    let down = CounterFiles::new(&prefix, Direction::Downlink);
    assert_eq!(fs::read_to_string(down.total_bytes_path()).unwrap(), "1300\n");
    assert_eq!(
        fs::read_to_string(down.bytes_per_conn_path()).unwrap(),
        "10.0.0.5:80 1200\n10.0.0.6:443 0\n"
    );
}
