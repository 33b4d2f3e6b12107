//! Common test utilities for unpacker integration tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use std::sync::Arc;
use unpacker::{Config, Event, Unpacker};

/// Build an unpacker over the fake backends
pub fn unpacker_with(config: Config, reader: Arc<FakeReader>, free: u64) -> Unpacker {
    Unpacker::new(config, reader, Arc::new(FixedSpace(free))).unwrap()
}

/// Everything currently buffered on `rx`
#[allow(dead_code)]
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
