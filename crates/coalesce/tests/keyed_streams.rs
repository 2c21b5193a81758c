//! Independence of keyed coalescing streams

mod common;

use coalesce::{DebouncePolicy, KeyedRegistry};
use common::{assert_near, ms, Recorder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const WAIT_MS: u64 = 50;

/// Request offsets for `bursts` bursts: gaps inside a burst are shorter than
/// the wait window, gaps between bursts are longer.
fn burst_schedule(rng: &mut ChaCha8Rng, bursts: usize) -> Vec<u64> {
    let mut times = Vec::new();
    let mut t = rng.gen_range(0..20);
    for _ in 0..bursts {
        let requests = rng.gen_range(1..6);
        for r in 0..requests {
            if r > 0 {
                t += rng.gen_range(1..WAIT_MS);
            }
            times.push(t);
        }
        t += WAIT_MS + rng.gen_range(10..80);
    }
    times
}

#[tokio::test(start_paused = true)]
async fn test_interleaved_keys_fire_independently() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let recorder: Arc<Recorder<(&'static str, u64)>> = Recorder::new();
    let registry: KeyedRegistry<&'static str, u64> = KeyedRegistry::new().unwrap();

    let bursts_a = 6;
    let bursts_b = 9;
    let mut events: Vec<(u64, &'static str)> = burst_schedule(&mut rng, bursts_a)
        .into_iter()
        .map(|t| (t, "a"))
        .chain(burst_schedule(&mut rng, bursts_b).into_iter().map(|t| (t, "b")))
        .collect();
    events.sort();

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|key| {
            let recorder = Arc::clone(&recorder);
            registry.with_key(key, DebouncePolicy::trailing(ms(WAIT_MS)), move |t: u64| {
                recorder.record((key, t));
                t
            })
        })
        .collect();

    for &(t, key) in &events {
        recorder.at(t).await;
        let handle = if key == "a" { &handles[0] } else { &handles[1] };
        handle.call(t);
    }

    let last = events.last().map(|(t, _)| *t).unwrap_or(0);
    recorder.at(last + 10 * WAIT_MS).await;

    let calls = recorder.calls();
    let fired_a = calls.iter().filter(|(_, (key, _))| *key == "a").count();
    let fired_b = calls.iter().filter(|(_, (key, _))| *key == "b").count();
    assert_eq!(fired_a, bursts_a);
    assert_eq!(fired_b, bursts_b);
    assert_eq!(registry.executions(&"a"), bursts_a as u64);
    assert_eq!(registry.executions(&"b"), bursts_b as u64);

    // Each run carries the args of the last request of its burst and fires
    // one wait window after it
    for (at, (_, arg)) in &calls {
        assert_near(*at, arg + WAIT_MS);
    }

    let last_a = events.iter().rev().find(|(_, key)| *key == "a").map(|(t, _)| *t);
    let last_b = events.iter().rev().find(|(_, key)| *key == "b").map(|(t, _)| *t);
    assert_eq!(registry.last_result(&"a"), last_a);
    assert_eq!(registry.last_result(&"b"), last_b);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_on_one_key_leaves_other_alone() {
    let recorder: Arc<Recorder<&'static str>> = Recorder::new();
    let registry: KeyedRegistry<&'static str, ()> = KeyedRegistry::new().unwrap();

    let bind = |key: &'static str| {
        let recorder = Arc::clone(&recorder);
        registry.with_key(key, DebouncePolicy::trailing(ms(100)), move |_: ()| recorder.record(key))
    };
    let a = bind("a");
    let b = bind("b");

    a.call(());
    b.call(());
    recorder.at(50).await;
    assert!(a.cancel());

    recorder.at(300).await;
    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "b");
    assert_near(calls[0].0, 100);
    assert_eq!(registry.last_result(&"a"), None);
    assert_eq!(registry.last_result(&"b"), Some(()));
}

#[tokio::test(start_paused = true)]
async fn test_leading_keys_return_fresh_results() {
    let registry: KeyedRegistry<String, String> = KeyedRegistry::new().unwrap();
    let policy = DebouncePolicy::leading(ms(100));

    let greet = registry.with_key("greet".to_string(), policy, |name: &'static str| format!("hello {}", name));
    let shout = registry.with_key("shout".to_string(), policy, |name: &'static str| name.to_uppercase());

    assert_eq!(greet.call("ada"), Some("hello ada".to_string()));
    assert_eq!(shout.call("ada"), Some("ADA".to_string()));

    // Inside the window: previous results come back, nothing reruns
    assert_eq!(greet.call("bob"), Some("hello ada".to_string()));
    assert_eq!(registry.executions(&"greet".to_string()), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_eviction_never_splits_a_burst() {
    const BURSTS: u32 = 300;

    let registry: KeyedRegistry<&'static str, u32> = KeyedRegistry::new().unwrap();
    let runs = Arc::new(parking_lot::Mutex::new(vec![0u32; BURSTS as usize]));
    let counts = Arc::clone(&runs);
    let handle = registry.with_key("burst", DebouncePolicy::trailing(ms(2)), move |i: u32| {
        counts.lock()[i as usize] += 1;
        i
    });

    // Evict as aggressively as possible on another thread
    let stop = Arc::new(AtomicBool::new(false));
    let evictor = {
        let registry = registry.clone();
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                registry.evict_idle(std::time::Duration::ZERO);
            }
        })
    };

    for i in 0..BURSTS {
        handle.call(i);
        handle.call(i);
        tokio::time::sleep(ms(8)).await;
    }
    tokio::time::sleep(ms(50)).await;
    stop.store(true, Ordering::Relaxed);
    evictor.join().unwrap();

    let runs = runs.lock();
    let split: Vec<usize> = (0..runs.len()).filter(|&i| runs[i] > 1).collect();
    assert!(split.is_empty(), "bursts executed more than once: {:?}", split);
    assert_eq!(runs[BURSTS as usize - 1], 1);
}
