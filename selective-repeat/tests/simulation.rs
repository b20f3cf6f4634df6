//! End-to-end runs through the discrete-event channel emulator.

use selective_repeat::simulator::{Simulator, SimulatorConfig};
use selective_repeat::SrConfig;

fn run(config: SimulatorConfig) -> selective_repeat::simulator::SimulationReport {
    Simulator::new(config).expect("valid config").run()
}

#[test]
fn clean_channel_delivers_in_order() {
    let report = run(SimulatorConfig {
        messages: 50,
        lambda: 20.0,
        ..SimulatorConfig::default()
    });

    assert!(!report.timed_out);
    assert_eq!(report.generated, 50);
    assert_eq!(report.delivered, report.submitted);
    assert_eq!(report.lost, 0);
    assert_eq!(report.corrupted, 0);
    assert_eq!(report.sender.corrupted_acks, 0);
    assert_eq!(report.timer_misuse, 0);
}

#[test]
fn lossy_corrupting_channel_still_delivers_everything_once() {
    for seed in [1, 7, 42, 1234] {
        let report = run(SimulatorConfig {
            messages: 300,
            loss_prob: 0.2,
            corrupt_prob: 0.2,
            lambda: 30.0,
            seed,
            ..SimulatorConfig::default()
        });

        assert!(!report.timed_out, "seed {seed} did not finish");
        assert!(report.lost > 0 && report.corrupted > 0);
        assert!(report.sender.packets_resent > 0);
        assert_eq!(report.delivered, report.submitted, "seed {seed}");
        assert_eq!(
            report.receiver.packets_delivered,
            report.submitted.len() as u64
        );
        assert_eq!(report.timer_misuse, 0);
    }
}

#[test]
fn fast_source_overflows_window() {
    let report = run(SimulatorConfig {
        messages: 200,
        lambda: 1.0,
        loss_prob: 0.1,
        ..SimulatorConfig::default()
    });

    assert!(report.sender.window_full > 0);
    assert_eq!(
        report.submitted.len() as u64 + report.sender.window_full,
        report.generated as u64
    );
    assert_eq!(report.sender.packets_sent, report.submitted.len() as u64);
    assert_eq!(report.delivered, report.submitted);
}

#[test]
fn small_window_over_lossy_channel() {
    let report = run(SimulatorConfig {
        messages: 100,
        loss_prob: 0.3,
        corrupt_prob: 0.1,
        lambda: 50.0,
        seed: 99,
        protocol: SrConfig::new(1, 16.0).unwrap(),
        ..SimulatorConfig::default()
    });

    assert!(!report.timed_out);
    assert_eq!(report.delivered, report.submitted);
}

#[test]
fn same_seed_same_run() {
    let config = SimulatorConfig {
        messages: 100,
        loss_prob: 0.15,
        corrupt_prob: 0.15,
        seed: 5,
        ..SimulatorConfig::default()
    };
    let first = run(config.clone());
    let second = run(config);

    assert_eq!(first.submitted, second.submitted);
    assert_eq!(first.sender, second.sender);
    assert_eq!(first.receiver, second.receiver);
    assert_eq!(first.to_channel, second.to_channel);
    assert_eq!(first.end_time, second.end_time);
}

#[test]
fn max_time_stops_a_dead_channel() {
    let report = run(SimulatorConfig {
        messages: 5,
        loss_prob: 1.0,
        max_time: 10_000.0,
        ..SimulatorConfig::default()
    });

    assert!(report.timed_out);
    assert!(report.delivered.is_empty());
    assert_eq!(report.lost, report.to_channel);
}
