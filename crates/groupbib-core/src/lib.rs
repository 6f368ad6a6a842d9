//! groupbib-core: domain models, visibility rules and the record store
//! for a group publication list.
//!
//! The store owns every `Author` and `Publication` the pipeline knows
//! about; importers only ever ask it to find-or-create records and to
//! commit the queued result in one transaction.

pub mod domain;
pub mod error;
pub mod rule;
pub mod store;

pub use domain::{Author, Publication, PublicationType};
pub use error::{Result, StoreError};
pub use rule::{VisibilityRule, YearSpan};
pub use store::{CommitStats, Store};
