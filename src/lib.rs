//! ip4set - Bulk-loaded sorted IPv4 address sets for DNS blocklists.
//!
//! This crate provides the "trivial IPv4 set" dataset of a DNSBL responder:
//! a large list of single addresses loaded from text, answered with one
//! shared A/TXT record.
//!
//! # Features
//!
//! - **Bulk loading**: Amortized buffer growth, presized from the previous load
//! - **Exact dedup**: Keys are sorted and deduplicated once, at finalize
//! - **Allocation-free lookups**: Binary search over an exact-fit array
//! - **Answer templates**: A/TXT record with `$` substitution of the address
//! - **Hot reload**: Build the next generation while the current one serves
//! - **Dumps**: Textual output that loads back into an equal set
//!
//! # Quick Start
//!
//! ```
//! use ip4set::{Loader, SetConfig};
//! use std::net::Ipv4Addr;
//!
//! let mut loader = Loader::new(SetConfig::new("dnsbl"));
//! let (set, _stats) = loader
//!     .load_str(":127.0.0.2:Listed, see https://example.org/?$\n192.0.2.7\n")
//!     .unwrap();
//!
//! let answer = set.query(u32::from(Ipv4Addr::new(192, 0, 2, 7)), true).unwrap();
//! assert_eq!(answer.a(), Ipv4Addr::new(127, 0, 0, 2));
//! assert_eq!(answer.txt().unwrap(), "Listed, see https://example.org/?192.0.2.7");
//! ```
//!
//! # Data Format
//!
//! One record per line. Blank lines and lines starting with `#` or `;` are
//! ignored.
//!
//! - `:A:TXT` sets the answer record for the whole set (first one wins)
//! - `a.b.c.d` adds an address; whitespace, a comment or `:` may follow
//!
//! Malformed lines are skipped with a warning. Only running out of memory
//! aborts a load.

mod error;

pub mod addr;
pub mod live;
pub mod loader;
pub mod set;
pub mod template;

// Re-export core types
pub use error::{Error, LineError, Result, TemplateError};
pub use set::{Answer, BuildState, Ip4Set, Ip4SetBuilder, LineStatus, SetConfig};
pub use template::{RecordTemplate, DEFAULT_RECORD};

// Re-export loading and reload
pub use live::LiveSet;
pub use loader::{LoadStats, Loader};
