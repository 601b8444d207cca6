//! Finalized IPv4 sets: membership queries and dumps.

mod builder;
mod config;

pub(crate) use builder::is_comment;
pub use builder::{BuildState, Ip4SetBuilder, LineStatus, DIRECTIVE_MARKER};
pub use config::{SetConfig, DEFAULT_INITIAL_CAPACITY};

use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::template::{RecordTemplate, DEFAULT_RECORD};
use crate::{addr, Result};

/// An immutable, sorted set of IPv4 addresses sharing one answer record.
///
/// Produced by [`Ip4SetBuilder::finalize`]. Keys are strictly increasing,
/// so lookups are a binary search with no allocation. Nothing is mutated
/// after construction; a set can be shared across any number of readers.
#[derive(Debug, Clone)]
pub struct Ip4Set {
    keys: Box<[u32]>,
    default_record: Arc<RecordTemplate>,
}

impl Ip4Set {
    pub(crate) fn new(keys: Box<[u32]>, default_record: Arc<RecordTemplate>) -> Self {
        debug_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        Self {
            keys,
            default_record,
        }
    }

    /// Create an empty set answering with the given record.
    pub fn empty(default_record: Arc<RecordTemplate>) -> Self {
        Self::new(Box::default(), default_record)
    }

    /// Get the number of addresses in this set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if this set has no addresses.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The sorted keys.
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    /// The answer template shared by every key.
    pub fn default_record(&self) -> &RecordTemplate {
        &self.default_record
    }

    /// Iterate over the addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.keys.iter().map(|&k| Ipv4Addr::from(k))
    }

    /// Check if a key is in this set.
    pub fn contains(&self, key: u32) -> bool {
        if self.keys.is_empty() {
            return false;
        }

        let (mut lo, mut hi) = (0, self.keys.len() - 1);
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let probe = self.keys[mid];
            if probe == key {
                return true;
            } else if probe < key {
                lo = mid + 1;
            } else if mid == 0 {
                break;
            } else {
                hi = mid - 1;
            }
        }
        false
    }

    /// Check if an address is in this set.
    pub fn contains_addr(&self, ip: Ipv4Addr) -> bool {
        self.contains(u32::from(ip))
    }

    /// Look up a key and return the answer to synthesize on a hit.
    ///
    /// The substitution text is only rendered when `wants_text` is set,
    /// i.e. when the caller is going to answer with TXT.
    pub fn query(&self, key: u32, wants_text: bool) -> Option<Answer> {
        if !self.contains(key) {
            return None;
        }
        Some(Answer {
            key,
            record: Arc::clone(&self.default_record),
            subst: wants_text.then(|| addr::format(key)),
        })
    }

    /// Write the set in a form that loads back into an equal set.
    ///
    /// The first line is the directive for the default record; each key
    /// follows on its own line with its rendered answer as a trailer,
    /// which is ignored when the dump is loaded again. An empty set
    /// writes nothing.
    pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.keys.is_empty() {
            return Ok(());
        }

        writeln!(out, "{}", self.default_record.to_directive())?;
        let a = self.default_record.a();
        for &key in self.keys.iter() {
            let name = addr::format(key);
            match self.default_record.render_txt(Some(&name)) {
                Some(txt) => writeln!(out, "{}\t:{}:{}", name, a, txt)?,
                None => writeln!(out, "{}\t:{}", name, a)?,
            }
        }
        Ok(())
    }
}

impl Default for Ip4Set {
    fn default() -> Self {
        Self::empty(DEFAULT_RECORD.clone())
    }
}

/// Data for answering a query that hit the set.
///
/// Holds the template and the textual substitution for the external
/// answer encoder; it does not build protocol records itself. The template
/// is shared, so an answer stays valid after its set is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    key: u32,
    record: Arc<RecordTemplate>,
    subst: Option<String>,
}

impl Answer {
    /// The matched key.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// The matched address.
    pub fn addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.key)
    }

    /// The answer template.
    pub fn record(&self) -> &RecordTemplate {
        &self.record
    }

    /// Dotted-quad substitution value, if text was requested.
    pub fn subst(&self) -> Option<&str> {
        self.subst.as_deref()
    }

    /// The A record address.
    pub fn a(&self) -> Ipv4Addr {
        self.record.a()
    }

    /// The TXT text with the substitution applied.
    pub fn txt(&self) -> Option<String> {
        self.record.render_txt(self.subst.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(lines: &[&str]) -> Ip4Set {
        let mut builder = Ip4SetBuilder::new(SetConfig::new("test"));
        builder.start();
        for (i, line) in lines.iter().enumerate() {
            builder.ingest(line, i + 1).unwrap();
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn test_contains() {
        let set = set_of(&["10.0.0.5", "10.0.0.1", "10.0.0.5", "192.168.1.1"]);
        assert!(set.contains(addr::parse("10.0.0.1").unwrap()));
        assert!(set.contains(addr::parse("10.0.0.5").unwrap()));
        assert!(set.contains_addr(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(!set.contains(addr::parse("10.0.0.9").unwrap()));
        assert!(!set.contains(0));
        assert!(!set.contains(u32::MAX));
    }

    #[test]
    fn test_contains_extremes() {
        let set = set_of(&["0.0.0.0", "255.255.255.255"]);
        assert!(set.contains(0));
        assert!(set.contains(u32::MAX));
        assert!(!set.contains(1));
        assert!(!set.contains(u32::MAX - 1));
    }

    #[test]
    fn test_empty_set_misses() {
        let set = Ip4Set::default();
        assert!(!set.contains(0));
        assert!(set.query(0, true).is_none());
        assert_eq!(set.default_record(), &RecordTemplate::default());
    }

    #[test]
    fn test_query_answer() {
        let set = set_of(&[":127.0.0.3:Listed $", "10.0.0.1"]);
        let key = addr::parse("10.0.0.1").unwrap();

        let answer = set.query(key, true).unwrap();
        assert_eq!(answer.addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(answer.a(), Ipv4Addr::new(127, 0, 0, 3));
        assert_eq!(answer.subst(), Some("10.0.0.1"));
        assert_eq!(answer.txt().as_deref(), Some("Listed 10.0.0.1"));

        let answer = set.query(key, false).unwrap();
        assert_eq!(answer.subst(), None);
        assert_eq!(answer.txt().as_deref(), Some("Listed $"));

        assert!(set.query(key + 1, true).is_none());
    }

    #[test]
    fn test_dump_format() {
        let set = set_of(&["10.0.0.2", ":127.0.0.2:Listed $", "10.0.0.1"]);
        let mut out = Vec::new();
        set.dump(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ":127.0.0.2:Listed $\n\
             10.0.0.1\t:127.0.0.2:Listed 10.0.0.1\n\
             10.0.0.2\t:127.0.0.2:Listed 10.0.0.2\n"
        );
    }

    #[test]
    fn test_dump_reloads_configured_record() {
        let record = RecordTemplate::new(Ipv4Addr::new(127, 0, 0, 4), Some("Blocked: $")).unwrap();
        let config = SetConfig::new("test").with_default_record(record.clone());
        let mut builder = Ip4SetBuilder::new(config);
        builder.start();
        builder.ingest("10.0.0.1", 1).unwrap();
        let set = builder.finalize().unwrap();

        let mut out = Vec::new();
        set.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, ":127.0.0.4:Blocked: $\n10.0.0.1\t:127.0.0.4:Blocked: 10.0.0.1\n");

        let reloaded = set_of(&text.lines().collect::<Vec<_>>());
        assert_eq!(reloaded.keys(), set.keys());
        assert_eq!(reloaded.default_record(), &record);
    }

    #[test]
    fn test_dump_without_txt() {
        let set = set_of(&[":127.0.0.4", "10.0.0.1"]);
        let mut out = Vec::new();
        set.dump(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ":127.0.0.4\n10.0.0.1\t:127.0.0.4\n");
    }

    #[test]
    fn test_answer_outlives_set() {
        let set = set_of(&[":127.0.0.3:Listed $", "10.0.0.1"]);
        let answer = set.query(addr::parse("10.0.0.1").unwrap(), true).unwrap();
        drop(set);
        assert_eq!(answer.record().a(), Ipv4Addr::new(127, 0, 0, 3));
        assert_eq!(answer.txt().as_deref(), Some("Listed 10.0.0.1"));
    }

    #[test]
    fn test_dump_empty_writes_nothing() {
        let set = set_of(&[":127.0.0.4"]);
        let mut out = Vec::new();
        set.dump(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_iter() {
        let set = set_of(&["10.0.0.2", "10.0.0.1"]);
        let addrs: Vec<_> = set.iter().collect();
        assert_eq!(addrs, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
    }
}
