//! Tests for windowed rate computation
//!
//! Drives the sampler tick by tick and through its timer to check the
//! 3-second window, the first-window seeding and the hourly distribution reset.

mod common;

use common::recording_metrics;
use proptest::prelude::*;
use reqmeter::metrics::sampler::{DISTRIBUTION_RESET_TICKS, WINDOW_TICKS};
use reqmeter::metrics::{Metrics, NamespaceRegistry};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[test]
fn test_nine_requests_over_three_ticks() {
    let (metrics, sink) = recording_metrics("scenario");
    let sampler = metrics.sampler();
    sampler.seed();

    for _ in 0..3 {
        for _ in 0..3 {
            metrics.record_request(200, "/ping", "GET", 0.001, 100, 10);
        }
        sampler.tick();
    }

    assert_eq!(metrics.qps(), 3);
    assert_eq!(metrics.current_received_bytes(), 300);
    assert_eq!(metrics.current_sent_bytes(), 30);
    assert_eq!(
        *sink.published.lock().expect("published lock"),
        vec![(3, 300, 30)]
    );
}

#[test]
fn test_rates_hold_between_boundaries() {
    let (metrics, _) = recording_metrics("hold");
    let sampler = metrics.sampler();
    sampler.seed();

    for _ in 0..30 {
        metrics.record_request(200, "/", "GET", 0.0, 0, 0);
    }
    for _ in 0..3 {
        sampler.tick();
    }
    assert_eq!(metrics.qps(), 10);

    // Traffic in the next window is invisible until its boundary
    for _ in 0..90 {
        metrics.record_request(200, "/", "GET", 0.0, 0, 0);
    }
    sampler.tick();
    assert_eq!(metrics.qps(), 10);
    sampler.tick();
    assert_eq!(metrics.qps(), 10);
    sampler.tick();
    assert_eq!(metrics.qps(), 30);
}

#[test]
fn test_idle_window_drops_rates_to_zero() {
    let (metrics, _) = recording_metrics("idle");
    let sampler = metrics.sampler();
    sampler.seed();

    metrics.record_request(200, "/", "GET", 0.0, 10, 10);
    for _ in 0..3 {
        sampler.tick();
    }
    assert_eq!(metrics.qps(), 1);

    for _ in 0..3 {
        sampler.tick();
    }
    assert_eq!(metrics.qps(), 0);
    assert_eq!(metrics.current_received_bytes(), 0);
}

#[test]
fn test_first_window_without_baseline_seeds_and_waits() {
    let (metrics, sink) = recording_metrics("unseeded");
    let sampler = metrics.sampler();

    // Counters already moved before any baseline existed
    for _ in 0..600 {
        metrics.record_request(200, "/", "GET", 0.0, 100, 100);
    }

    let outcomes: Vec<_> = (0..3).map(|_| sampler.tick()).collect();
    assert!(outcomes[2].seeded);
    assert_eq!(outcomes[2].window, None);
    assert_eq!(metrics.qps(), 0);
    assert_eq!(metrics.current_received_bytes(), 0);
    assert!(sink.published.lock().expect("published lock").is_empty());

    for _ in 0..3 {
        metrics.record_request(200, "/", "GET", 0.0, 100, 100);
    }
    let outcomes: Vec<_> = (0..3).map(|_| sampler.tick()).collect();
    assert!(!outcomes[2].seeded);
    assert_eq!(metrics.qps(), 1);
    assert_eq!(metrics.current_received_bytes(), 100);
}

#[test]
fn test_distribution_reset_fires_once_in_3601_ticks() {
    let (metrics, sink) = recording_metrics("hourly");
    let sampler = metrics.sampler();
    sampler.seed();

    let mut reset_at = Vec::new();
    for _ in 0..=DISTRIBUTION_RESET_TICKS {
        metrics.record_request(200, "/", "GET", 0.0, 0, 0);
        let outcome = sampler.tick();
        if outcome.distribution_reset {
            reset_at.push(outcome.uptime);
            // Reset tick is also a window boundary and still publishes
            assert_eq!(outcome.window.map(|w| w.qps), Some(1));
        }
    }

    assert_eq!(reset_at, vec![3600]);
    assert_eq!(sink.resets.load(Ordering::Relaxed), 1);
    assert_eq!(sink.uptime_ticks.load(Ordering::Relaxed), 3601);
    assert_eq!(metrics.uptime(), 3601);
    assert_eq!(metrics.qps(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_started_facade_samples_on_timer() {
    let registry = NamespaceRegistry::new();
    let metrics = Metrics::start("timer", &registry).expect("Failed to create test metrics");

    // 9 requests spread across the first three seconds
    for _ in 0..9 {
        metrics.record_request(200, "/ping", "GET", 0.001, 100, 10);
        tokio::time::sleep(Duration::from_millis(333)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(metrics.uptime(), 3);
    assert_eq!(metrics.qps(), 3);
    assert_eq!(metrics.current_received_bytes(), 300);

    let output = registry.gather().expect("gather");
    assert!(output.contains("reqmeter_timer_request_per_second 3"));
    assert!(output.contains("reqmeter_timer_uptime 3"));

    metrics.shutdown().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(metrics.uptime(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_start_sampler_twice_keeps_single_task() {
    let (metrics, _) = recording_metrics("single");
    metrics.start_sampler();
    metrics.start_sampler();

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(metrics.uptime(), 3);

    metrics.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_facade_stops_sampler() {
    let (metrics, sink) = recording_metrics("dropped");
    metrics.start_sampler();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    drop(metrics);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(sink.uptime_ticks.load(Ordering::Relaxed), 2);
}

proptest! {
    #[test]
    fn prop_qps_is_ceil_of_window_delta_over_three(
        deltas in prop::collection::vec(0u64..500, 3..60)
    ) {
        let (metrics, _) = recording_metrics("prop");
        let sampler = metrics.sampler();
        sampler.seed();

        let mut window_total = 0u64;
        for delta in &deltas {
            for _ in 0..*delta {
                metrics.record_request(200, "/", "GET", 0.0, 1, 0);
            }
            window_total += delta;

            let outcome = sampler.tick();
            if outcome.uptime % WINDOW_TICKS == 0 {
                let expected = window_total.div_ceil(WINDOW_TICKS);
                prop_assert_eq!(outcome.window.map(|w| w.qps), Some(expected));
                prop_assert_eq!(metrics.qps(), expected);
                prop_assert_eq!(metrics.current_received_bytes(), expected);
                window_total = 0;
            } else {
                prop_assert!(outcome.window.is_none());
            }
        }
    }
}
