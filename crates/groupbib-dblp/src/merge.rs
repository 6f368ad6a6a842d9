//! Merge engine
//!
//! Reconciles one person's parsed records against the store. New
//! records get a one-time visibility decision and are queued for
//! insertion; records that already exist are left untouched apart from
//! refreshing their author relation. Visibility, once set by rule or
//! toggle, is never overwritten here.

use tracing::info;

use groupbib_core::{Publication, Store, StoreError, VisibilityRule};

/// Merge one person's resolved records into the store.
///
/// Returns the records this call made visible.
pub fn merge_person(
    store: &mut Store,
    publications: Vec<Publication>,
    rule: &VisibilityRule,
) -> Result<Vec<Publication>, StoreError> {
    let mut added = Vec::new();

    for mut publication in publications {
        // Re-bind authors through the store even though parsing already
        // did: an earlier feed in the same run may have introduced a
        // shared co-author in the meantime.
        let mut rebound = Vec::with_capacity(publication.authors.len());
        for author in &publication.authors {
            rebound.push(store.find_or_create_author(&author.pid, &author.name)?);
        }
        publication.authors = rebound;

        if let Some(id) = publication.id {
            let pids = publication
                .authors
                .iter()
                .map(|author| author.pid.clone())
                .collect();
            store.queue_author_refresh(id, pids);
            continue;
        }

        // already queued via another person's feed this run
        if store.is_queued(&publication.key) {
            continue;
        }

        if publication.visibility.is_none() && rule.evaluate(&publication) {
            publication.visibility = Some(true);
            info!("added '{publication}'");
            added.push(publication.clone());
        }
        store.queue_publication(publication);
    }

    Ok(added)
}
