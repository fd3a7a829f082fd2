//! Replay ledger behaviour under concurrent claims

use chrono::Utc;
use oxide_ledger::{HotReplaySet, ReplayLedger};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[test]
fn concurrent_marks_accept_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("override_replay.jsonl");
    let hot = HotReplaySet::new();
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            // Each thread gets its own ledger instance over the same file.
            let ledger = ReplayLedger::new(path.clone(), hot.clone());
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ledger.mark_seen("ovr-race", "n-1", "hash", Utc::now()).unwrap()
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|accepted| *accepted)
        .count();

    assert_eq!(accepted, 1);
    let records = ReplayLedger::new(&path, HotReplaySet::new()).records().unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn distinct_nonces_are_independent_under_contention() {
    let dir = TempDir::new().unwrap();
    let ledger = Arc::new(ReplayLedger::new(dir.path().join("replay.jsonl"), HotReplaySet::new()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.mark_seen("ovr-1", &format!("n-{i}"), "h", Utc::now()).unwrap())
        })
        .collect();

    assert!(handles.into_iter().all(|h| h.join().unwrap()));
    assert_eq!(ledger.records().unwrap().len(), 8);
}
