//! Loading sets from text sources.
//!
//! [`Loader`] drives one [`Ip4SetBuilder`] through a generation per load:
//! reset, start, ingest every line, finalize. Blank lines and comment lines
//! never reach the builder. Files ending in `.gz` are decompressed on the
//! fly.

use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::set::{is_comment, Ip4Set, Ip4SetBuilder, LineStatus, SetConfig};
use crate::Result;

/// Summary of one completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Set name from the config
    pub name: String,
    /// Number of sources read
    pub sources: usize,
    /// Lines read, including blank and comment lines
    pub lines: usize,
    /// Lines that added a key or set the default record
    pub accepted: usize,
    /// Repeated directives
    pub ignored: usize,
    /// Malformed lines
    pub skipped: usize,
    /// Unique keys in the finalized set
    pub count: usize,
    /// Capacity hint kept for the next load
    pub growth_seed: usize,
}

/// Builds successive generations of a set from text.
///
/// The loader keeps its builder between loads so the growth seed of the
/// last successful generation presizes the next one.
///
/// # Example
/// ```
/// use ip4set::{Loader, SetConfig};
///
/// let mut loader = Loader::new(SetConfig::new("example"));
/// let (set, stats) = loader.load_str(":127.0.0.2:Listed $\n10.0.0.1\n10.0.0.1\n").unwrap();
///
/// assert_eq!(set.len(), 1);
/// assert_eq!(stats.accepted, 3);
/// ```
#[derive(Debug)]
pub struct Loader {
    builder: Ip4SetBuilder,
}

impl Loader {
    /// Create a loader with the given configuration.
    pub fn new(config: SetConfig) -> Self {
        Self {
            builder: Ip4SetBuilder::new(config),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SetConfig {
        self.builder.config()
    }

    /// Capacity hint for the next load.
    pub fn growth_seed(&self) -> usize {
        self.builder.growth_seed()
    }

    /// Load a set from a single reader.
    pub fn load_reader<R: BufRead>(&mut self, reader: R) -> Result<(Ip4Set, LoadStats)> {
        let source = self.config().name.clone();
        self.load_with(|loader, stats| loader.feed(reader, &source, stats))
    }

    /// Load a set from text.
    pub fn load_str(&mut self, text: &str) -> Result<(Ip4Set, LoadStats)> {
        self.load_reader(text.as_bytes())
    }

    /// Load one set from several files, read in order.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(Ip4Set, LoadStats)> {
        self.load_with(|loader, stats| {
            for path in paths {
                let path = path.as_ref();
                let source = path.display().to_string();
                let file = File::open(path)?;
                if path.extension().is_some_and(|ext| ext == "gz") {
                    loader.feed(BufReader::new(GzDecoder::new(file)), &source, stats)?;
                } else {
                    loader.feed(BufReader::new(file), &source, stats)?;
                }
            }
            Ok(())
        })
    }

    /// Run one generation around `ingest_all`.
    ///
    /// Any error resets the builder, so nothing of the failed generation
    /// survives except the seed of the last good one.
    fn load_with<F>(&mut self, ingest_all: F) -> Result<(Ip4Set, LoadStats)>
    where
        F: FnOnce(&mut Self, &mut LoadStats) -> Result<()>,
    {
        self.builder.reset(false);
        self.builder.start();

        let mut stats = LoadStats {
            name: self.config().name.clone(),
            ..LoadStats::default()
        };

        let result = ingest_all(self, &mut stats).and_then(|()| self.builder.finalize());
        self.builder.set_source(stats.name.clone());
        let set = match result {
            Ok(set) => set,
            Err(e) => {
                log::error!("{}: load failed: {}", stats.name, e);
                self.builder.reset(false);
                return Err(e);
            }
        };

        stats.count = set.len();
        stats.growth_seed = self.builder.growth_seed();
        log::debug!(
            "{}: {} lines from {} sources, {} skipped",
            stats.name,
            stats.lines,
            stats.sources,
            stats.skipped
        );
        Ok((set, stats))
    }

    /// Feed every record line of one source to the builder.
    fn feed<R: BufRead>(
        &mut self,
        mut reader: R,
        source: &str,
        stats: &mut LoadStats,
    ) -> Result<()> {
        self.builder.set_source(source);
        stats.sources += 1;

        let mut buf = Vec::new();
        let mut line_number = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_number += 1;

            let text = String::from_utf8_lossy(&buf);
            let line = text.trim();
            if line.is_empty() || line.starts_with(is_comment) {
                continue;
            }

            match self.builder.ingest(line, line_number)? {
                LineStatus::Accepted => stats.accepted += 1,
                LineStatus::Ignored => stats.ignored += 1,
                LineStatus::Skipped(_) => stats.skipped += 1,
            }
        }

        stats.lines += line_number;
        Ok(())
    }
}
