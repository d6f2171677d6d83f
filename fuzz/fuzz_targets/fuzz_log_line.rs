//! Fuzz target for log-line parsing and replay.
//!
//! `LogEntry::parse` must never panic on arbitrary input, and opening a store
//! from an arbitrary file must fail cleanly rather than panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use authlog::store::LogEntry;
use authlog::{GroupStore, PrincipalStore};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 2;
    let payload = &data[1..];

    match selector {
        // Parse each line; accepted entries must render back to a line that
        // parses to the same entry.
        0 => fuzz_parse_lines(payload),
        // Replay the whole payload as a log file
        _ => fuzz_replay(payload),
    }
});

fn fuzz_parse_lines(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for line in text.lines() {
        if let Ok(Some(entry)) = LogEntry::parse(line) {
            let rendered = entry.to_line();
            assert_eq!(LogEntry::parse(&rendered), Ok(Some(entry)));
        }
    }
}

fn fuzz_replay(data: &[u8]) {
    let Ok(dir) = tempfile::TempDir::new() else {
        return;
    };
    let path = dir.path().join("log.tsv");
    if std::fs::write(&path, data).is_err() {
        return;
    }
    let _ = PrincipalStore::open(&path);
    let _ = GroupStore::open(&path);
}
