//! Key buffer, line ingestion and finalization.

use std::sync::Arc;

use super::{Ip4Set, SetConfig};
use crate::error::LineError;
use crate::template::RecordTemplate;
use crate::{addr, Error, Result};

/// Leading character of a directive line.
pub const DIRECTIVE_MARKER: char = ':';

/// Characters starting a trailing comment.
pub(crate) fn is_comment(c: char) -> bool {
    c == '#' || c == ';'
}

/// Build state of the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Reset, nothing ingested yet
    Empty,
    /// Accepting lines
    Loading,
    /// Handed off as an [`Ip4Set`]; reset before the next load
    Finalized,
    /// A fatal error ended the load; reset before the next load
    Aborted,
}

/// Outcome of ingesting one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineStatus {
    /// Address appended or default record set
    Accepted,
    /// Directive after the default record was already set
    Ignored,
    /// Malformed line, skipped with a warning
    Skipped(LineError),
}

/// Builds one generation of an [`Ip4Set`] at a time.
///
/// Keys are appended unsorted, then sorted and deduplicated by
/// [`finalize`](Self::finalize). The builder outlives its generations: the
/// buffer size needed by the last finalized generation is kept as the
/// growth seed, so the next load allocates the right size up front.
///
/// # Examples
/// ```
/// use ip4set::{Ip4SetBuilder, SetConfig};
///
/// let mut builder = Ip4SetBuilder::new(SetConfig::default());
/// builder.start();
/// builder.ingest("10.0.0.5", 1).unwrap();
/// builder.ingest("10.0.0.1", 2).unwrap();
/// builder.ingest("10.0.0.5", 3).unwrap();
/// let set = builder.finalize().unwrap();
///
/// assert_eq!(set.len(), 2);
/// assert!(set.contains(0x0A00_0001));
/// ```
#[derive(Debug)]
pub struct Ip4SetBuilder {
    config: SetConfig,
    /// Label for warnings, usually the file being read
    source: String,
    state: BuildState,
    keys: Vec<u32>,
    /// Slots granted by the growth policy; `keys.len() <= capacity`
    capacity: usize,
    /// Capacity hint carried over from the last finalized generation
    growth_seed: usize,
    default_record: Option<Arc<RecordTemplate>>,
}

impl Ip4SetBuilder {
    /// Create an empty builder with no growth seed.
    pub fn new(config: SetConfig) -> Self {
        let source = config.name.clone();
        Self {
            config,
            source,
            state: BuildState::Empty,
            keys: Vec::new(),
            capacity: 0,
            growth_seed: 0,
            default_record: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SetConfig {
        &self.config
    }

    /// Get the current build state.
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Number of keys ingested so far, duplicates included.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if no keys have been ingested.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Slots currently granted to the key buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Capacity hint for the next generation's first allocation.
    pub fn growth_seed(&self) -> usize {
        self.growth_seed
    }

    /// The default record set by a directive in this generation, if any.
    pub fn default_record(&self) -> Option<&RecordTemplate> {
        self.default_record.as_deref()
    }

    /// Set the label used in warnings.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Discard the current generation.
    ///
    /// The growth seed always survives. `full` is accepted for symmetry
    /// with other dataset kinds and has no extra effect here.
    pub fn reset(&mut self, _full: bool) {
        self.keys = Vec::new();
        self.capacity = 0;
        self.default_record = None;
        self.state = BuildState::Empty;
    }

    /// Begin loading. Ingesting into an empty builder starts it implicitly.
    pub fn start(&mut self) {
        if self.state == BuildState::Empty {
            self.state = BuildState::Loading;
        }
    }

    /// Ingest one line.
    ///
    /// The line is either a `:` directive carrying the default record
    /// template, or a dotted-quad address optionally followed by
    /// whitespace, a comment or `:`. Malformed lines are skipped with a
    /// warning and reported as [`LineStatus::Skipped`]. Only a failure to
    /// grow the key buffer is returned as an error; it aborts the load.
    pub fn ingest(&mut self, line: &str, line_number: usize) -> Result<LineStatus> {
        match self.state {
            BuildState::Empty | BuildState::Loading => self.state = BuildState::Loading,
            BuildState::Finalized | BuildState::Aborted => return Err(Error::NotLoading),
        }

        if line.starts_with(DIRECTIVE_MARKER) {
            return Ok(self.set_default_record(line, line_number));
        }

        let key = match parse_address_line(line) {
            Some(key) => key,
            None => return Ok(self.skip(LineError::InvalidAddress, line_number)),
        };

        if self.keys.len() == self.capacity {
            if let Err(e) = self.grow() {
                self.abort();
                return Err(e);
            }
        }
        self.keys.push(key);

        Ok(LineStatus::Accepted)
    }

    /// Finish the generation and hand out the query-ready set.
    ///
    /// Records the growth seed, sorts the keys, removes duplicates and
    /// shrinks the storage to fit. Sets without a directive get the
    /// configured fallback record. The builder is left `Finalized`.
    pub fn finalize(&mut self) -> Result<Ip4Set> {
        match self.state {
            BuildState::Empty | BuildState::Loading => {}
            BuildState::Finalized => return Err(Error::NotLoading),
            BuildState::Aborted => return Err(Error::LoadAborted),
        }

        let mut keys = std::mem::take(&mut self.keys);
        let count = keys.len();
        if count > 0 {
            self.growth_seed = next_growth_seed(self.capacity, count);
            keys.sort_unstable();
            let unique = remove_dups(&mut keys);
            keys.truncate(unique);
        }
        self.capacity = 0;

        let default_record = self
            .default_record
            .take()
            .unwrap_or_else(|| self.config.default_record.clone());
        self.state = BuildState::Finalized;

        let set = Ip4Set::new(keys.into_boxed_slice(), default_record);
        log::info!("{}: loaded, cnt={}", self.config.name, set.len());
        Ok(set)
    }

    fn set_default_record(&mut self, line: &str, line_number: usize) -> LineStatus {
        if self.default_record.is_some() {
            return LineStatus::Ignored;
        }
        match RecordTemplate::parse(line) {
            Ok(record) => {
                self.default_record = Some(Arc::new(record));
                LineStatus::Accepted
            }
            Err(e) => self.skip(e.into(), line_number),
        }
    }

    fn skip(&self, error: LineError, line_number: usize) -> LineStatus {
        log::warn!("{}:{}: {}", self.source, line_number, error);
        LineStatus::Skipped(error)
    }

    /// Grow the buffer: seed or initial size when empty, double otherwise.
    fn grow(&mut self) -> Result<()> {
        let requested = if self.capacity == 0 {
            if self.growth_seed > 0 {
                self.growth_seed
            } else {
                self.config.initial_capacity.max(1)
            }
        } else {
            self.capacity
                .checked_mul(2)
                .ok_or(Error::OutOfMemory { requested: usize::MAX })?
        };

        if self.config.max_capacity.is_some_and(|max| requested > max) {
            return Err(Error::OutOfMemory { requested });
        }
        self.keys
            .try_reserve_exact(requested - self.keys.len())
            .map_err(|_| Error::OutOfMemory { requested })?;
        self.capacity = requested;

        log::trace!("{}: key buffer grown to {}", self.source, requested);
        Ok(())
    }

    fn abort(&mut self) {
        log::error!("{}: load aborted after {} keys", self.source, self.keys.len());
        self.keys = Vec::new();
        self.capacity = 0;
        self.default_record = None;
        self.state = BuildState::Aborted;
    }
}

/// Parse an address line, rejecting unexpected trailing characters.
fn parse_address_line(line: &str) -> Option<u32> {
    let (key, rest) = addr::parse_prefix(line)?;
    match rest.chars().next() {
        None => Some(key),
        Some(c) if c.is_ascii_whitespace() || is_comment(c) || c == DIRECTIVE_MARKER => Some(key),
        Some(_) => None,
    }
}

/// Smallest halving of `capacity` that still holds `count` keys.
pub(crate) fn next_growth_seed(capacity: usize, count: usize) -> usize {
    let mut seed = capacity;
    while seed / 2 >= count {
        seed /= 2;
    }
    seed
}

/// Compact adjacent duplicates of a sorted slice to its front.
///
/// Returns the number of unique keys.
pub(crate) fn remove_dups(keys: &mut [u32]) -> usize {
    if keys.is_empty() {
        return 0;
    }
    let mut last = 0;
    for i in 1..keys.len() {
        if keys[i] != keys[last] {
            last += 1;
            keys[last] = keys[i];
        }
    }
    last + 1
}
