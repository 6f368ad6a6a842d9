//! Per-run import orchestration
//!
//! Drives fetch, parse and merge for every configured group member.
//! One member's failure is reported and must not stop the others; the
//! store is committed once at the end of the run, or not at all in a
//! dry run.

use thiserror::Error;
use tracing::{info, warn};

use groupbib_core::{CommitStats, Publication, Store, StoreError, VisibilityRule};

use crate::fetch::{DblpClient, FetchError};
use crate::merge::merge_person;
use crate::parser::{parse_feed, ParseError};

/// One configured group member: DBLP pid plus the rule deciding which
/// of their newly imported publications start out visible.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub pid: String,
    pub rule: VisibilityRule,
}

/// Anything that can go wrong while importing one member's feed.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a pull run did.
#[derive(Debug, Default)]
pub struct PullReport {
    /// Records this run made visible.
    pub added: Vec<Publication>,
    /// Members whose import failed, with the reason.
    pub failures: Vec<(String, ImportError)>,
    /// Counts flushed to disk; `None` on a dry run.
    pub committed: Option<CommitStats>,
}

/// Import every member's feed and commit the result unless `dry_run`.
pub async fn pull(
    store: &mut Store,
    client: &DblpClient,
    members: &[Member],
    dry_run: bool,
) -> Result<PullReport, StoreError> {
    let mut report = PullReport::default();

    for member in members {
        info!("fetching '{}'", member.pid);
        match import_member(store, client, member).await {
            Ok(mut added) => report.added.append(&mut added),
            Err(err) => {
                warn!("import of '{}' failed: {}", member.pid, err);
                report.failures.push((member.pid.clone(), err));
            }
        }
    }

    if dry_run {
        let pending = store.pending();
        info!(
            "dry run: would commit {} publications, {} authors",
            pending.new_publications, pending.new_authors
        );
    } else {
        report.committed = Some(store.commit()?);
    }

    Ok(report)
}

async fn import_member(
    store: &mut Store,
    client: &DblpClient,
    member: &Member,
) -> Result<Vec<Publication>, ImportError> {
    let xml = client.fetch_person(&member.pid).await?;
    let publications = parse_feed(store, &xml)?;
    Ok(merge_person(store, publications, &member.rule)?)
}
