//! groupbib-dblp: the DBLP import pipeline
//!
//! Fetches per-person bibliographic feeds, parses them into normalized
//! publication records, and merges them into the record store without
//! duplicating authors or publications. Existing records are never
//! modified by an import.

pub mod fetch;
pub mod http;
pub mod merge;
pub mod parser;
pub mod pull;

pub use fetch::{DblpClient, FetchError};
pub use merge::merge_person;
pub use parser::{parse_feed, ParseError};
pub use pull::{pull, ImportError, Member, PullReport};
