//! Library-level scenarios: timing behaviour of the running simulator, view
//! agreement, and the bounded-window contract, driven through the public API.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use metrics_simulator::metrics::views::{self, time_label};
use metrics_simulator::prelude::*;
use metrics_simulator::simulator::stress::{IDLE_CPU_MAX, IDLE_MEMORY_MAX};

fn fast_config(capacity: usize) -> Config {
    let mut config = Config::default();
    config.simulator.capacity = capacity;
    config.simulator.tick_interval_ms = 10;
    config.simulator.seed = Some(7);
    config.stress.tick_interval_ms = 5;
    config.stress.cpu_iterations = 2_000;
    config.stress.batch_objects = 16;
    config.stress.object_width = 4;
    config.stress.prune_threshold = 8;
    config.stress.retain_batches = 4;
    config
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn sample_at(secs: i64, cpu: f64) -> MetricSample {
    let mut s = MetricSample::zeroed(Utc.timestamp_opt(secs, 0).unwrap());
    s.set(MetricField::CpuUsage, cpu);
    s
}

#[test]
fn running_simulator_rolls_the_window() {
    let sim = Simulator::new(&fast_config(5)).unwrap();
    let first = sim.snapshot();
    assert_eq!(first.len(), 5);

    assert!(sim.start().unwrap());
    assert!(wait_until(Duration::from_secs(2), || sim.counters().samples_generated >= 8));
    sim.stop();

    let later = sim.snapshot();
    assert_eq!(later.len(), 5);
    // Every seeded sample has been evicted.
    assert!(later.iter().all(|s| s.timestamp > first[4].timestamp));
    assert!(later.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn stop_freezes_history() {
    let sim = Simulator::new(&fast_config(50)).unwrap();
    sim.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || sim.counters().samples_generated >= 3));
    assert!(sim.stop());
    let frozen = sim.snapshot();
    thread::sleep(Duration::from_millis(60));
    assert_eq!(sim.snapshot(), frozen);
    assert!(!sim.stop());
}

#[test]
fn stress_cycle_raises_then_resets() {
    let sim = Simulator::new(&fast_config(20)).unwrap();
    assert!(sim.enter_stress_mode().unwrap());
    assert!(!sim.enter_stress_mode().unwrap());
    assert!(sim.is_stressed());
    assert!(sim.synthetic_performance_snapshot().is_stressed);

    assert!(wait_until(Duration::from_secs(3), || sim.counters().payload_prunes >= 1));
    assert!(sim.payload_stats().batches <= 8);

    assert!(sim.exit_stress_mode());
    assert!(!sim.is_stressed());
    assert_eq!(sim.elapsed_stress_seconds(), 0);
    assert_eq!(sim.payload_stats().batches, 0);
    let idle = sim.synthetic_performance_snapshot();
    assert!(!idle.is_stressed);
    assert!(idle.cpu_usage_percent < IDLE_CPU_MAX);
    assert!(idle.memory_usage_percent < IDLE_MEMORY_MAX);
}

#[test]
fn stress_and_running_are_independent() {
    let sim = Simulator::new(&fast_config(10)).unwrap();
    sim.enter_stress_mode().unwrap();
    assert!(!sim.is_running());
    sim.start().unwrap();
    sim.exit_stress_mode();
    assert!(sim.is_running());
    let status = sim.status();
    assert!(status.running);
    assert!(!status.stressed);
    sim.stop();
}

#[test]
fn elapsed_stress_seconds_counts_whole_seconds() {
    let sim = Simulator::new(&fast_config(10)).unwrap();
    assert_eq!(sim.elapsed_stress_seconds(), 0);
    sim.enter_stress_mode().unwrap();
    thread::sleep(Duration::from_millis(1_100));
    assert!(sim.elapsed_stress_seconds() >= 1);
    sim.exit_stress_mode();
}

#[test]
fn capacity_three_keeps_last_three_appends() {
    let mut history = History::new(3);
    for (i, cpu) in [10.0, 20.0, 30.0, 40.0, 50.0].into_iter().enumerate() {
        history.push(sample_at(i64::try_from(i).unwrap(), cpu));
    }
    let sim = Simulator::from_history(&fast_config(3), history).unwrap();
    let cpu: Vec<f64> = sim.snapshot().iter().map(|s| s.cpu_usage).collect();
    assert_eq!(cpu, [30.0, 40.0, 50.0]);
    assert_eq!(sim.latest().unwrap().cpu_usage, 50.0);
}

#[test]
fn views_agree_with_snapshot() {
    let sim = Simulator::new(&fast_config(12)).unwrap();
    let snapshot = sim.snapshot();
    for field in MetricField::ALL {
        for shape in ViewShape::ALL {
            let view = sim.view(shape, field);
            let points = view.points();
            assert_eq!(points.len(), snapshot.len(), "{shape} / {field}");
            for (point, sample) in points.iter().zip(&snapshot) {
                assert_eq!(point.0, time_label(sample.timestamp));
                assert!((point.1 - sample.value(field)).abs() < f64::EPSILON);
            }
        }
    }
}

#[test]
fn three_sample_xy_example() {
    let samples = vec![sample_at(0, 10.0), sample_at(1, 50.0), sample_at(2, 90.0)];
    let json = serde_json::to_value(views::xy_pairs(&samples, MetricField::CpuUsage)).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"x": "00:00:00", "y": 10.0},
            {"x": "00:00:01", "y": 50.0},
            {"x": "00:00:02", "y": 90.0},
        ])
    );
}

#[test]
fn view_by_name_rejects_unknowns() {
    let sim = Simulator::new(&fast_config(4)).unwrap();
    let err = sim.view_by_name("xy-pairs", "latency").unwrap_err();
    assert_eq!(err.code(), "MSIM-2001");
    let err = sim.view_by_name("gauge", "cpu_usage").unwrap_err();
    assert_eq!(err.code(), "MSIM-2002");
    assert!(sim.view_by_name("xy_named_pairs", "cpuUsage").is_ok());
}

#[test]
fn independent_instances_do_not_share_state() {
    let a = Simulator::new(&fast_config(4)).unwrap();
    let b = Simulator::new(&fast_config(4)).unwrap();
    a.enter_stress_mode().unwrap();
    a.advance();
    assert!(!b.is_stressed());
    assert_eq!(b.counters().samples_generated, 0);
    a.exit_stress_mode();
}

#[test]
fn invalid_library_config_is_rejected() {
    let mut config = fast_config(10);
    config.stress.prune_threshold = 2;
    config.stress.retain_batches = 10;
    let err = Simulator::new(&config).err().unwrap();
    assert_eq!(err.code(), "MSIM-1001");
    assert!(err.to_string().contains("retain_batches"));

    let mut config = fast_config(10);
    config.simulator.tick_interval_ms = 0;
    let err = Simulator::from_history(&config, History::new(10)).err().unwrap();
    assert_eq!(err.code(), "MSIM-1001");
}

#[test]
fn ticker_can_drive_external_state() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let handle = spawn_ticker("msim-it-tick", Duration::from_millis(5), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert!(wait_until(Duration::from_secs(2), || hits.load(Ordering::SeqCst) >= 3));
    handle.cancel();
    let stopped_at = hits.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(hits.load(Ordering::SeqCst), stopped_at);
}
