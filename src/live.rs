//! Serving a set while new generations are loaded.
//!
//! Queries read the current generation through an [`ArcSwap`] without
//! locking. A reload builds the next generation off to the side and
//! publishes it with a single pointer swap; in-flight queries finish on
//! the generation they started with.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::loader::{LoadStats, Loader};
use crate::set::{Answer, Ip4Set, SetConfig};
use crate::Result;

/// A set that can be hot reloaded while serving queries.
///
/// # Example
///
/// ```
/// use ip4set::{LiveSet, SetConfig};
/// use std::net::Ipv4Addr;
///
/// let live = LiveSet::new(SetConfig::new("dnsbl"));
/// live.reload_from_str("10.0.0.1\n").unwrap();
/// assert!(live.contains_addr(Ipv4Addr::new(10, 0, 0, 1)));
///
/// // A failed reload keeps the previous generation
/// live.reload_files(&["/nonexistent"]).unwrap_err();
/// assert!(live.contains_addr(Ipv4Addr::new(10, 0, 0, 1)));
/// ```
pub struct LiveSet {
    /// Published generation
    current: ArcSwap<Ip4Set>,
    /// Serializes reloads and carries the growth seed between them
    loader: Mutex<Loader>,
    /// Number of generations published
    generation: AtomicU64,
}

impl LiveSet {
    /// Create a live set serving an empty generation.
    pub fn new(config: SetConfig) -> Self {
        let empty = Ip4Set::empty(config.default_record.clone());
        Self {
            current: ArcSwap::from_pointee(empty),
            loader: Mutex::new(Loader::new(config)),
            generation: AtomicU64::new(0),
        }
    }

    /// Get the current generation.
    pub fn snapshot(&self) -> Arc<Ip4Set> {
        self.current.load_full()
    }

    /// Number of generations published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Check if a key is in the current generation.
    pub fn contains(&self, key: u32) -> bool {
        self.current.load().contains(key)
    }

    /// Check if an address is in the current generation.
    pub fn contains_addr(&self, ip: Ipv4Addr) -> bool {
        self.contains(u32::from(ip))
    }

    /// Look up a key in the current generation.
    ///
    /// The answer keeps its template alive, so it stays usable after a
    /// reload publishes a new generation.
    pub fn query(&self, key: u32, wants_text: bool) -> Option<Answer> {
        self.current.load().query(key, wants_text)
    }

    /// Reload from a reader and publish the result.
    pub fn reload_from_reader<R: BufRead>(&self, reader: R) -> Result<LoadStats> {
        let mut loader = self.loader.lock();
        let (set, stats) = loader.load_reader(reader)?;
        self.publish(set);
        Ok(stats)
    }

    /// Reload from text and publish the result.
    pub fn reload_from_str(&self, text: &str) -> Result<LoadStats> {
        self.reload_from_reader(text.as_bytes())
    }

    /// Reload from data files and publish the result.
    pub fn reload_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<LoadStats> {
        let mut loader = self.loader.lock();
        let (set, stats) = loader.load_files(paths)?;
        self.publish(set);
        Ok(stats)
    }

    /// Replace the current generation with an already built set.
    pub fn publish(&self, set: Ip4Set) {
        let count = set.len();
        self.current.store(Arc::new(set));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("Published generation {} with {} addresses", generation, count);
    }
}
