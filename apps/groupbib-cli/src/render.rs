//! Render visible publications into the configured output files
//!
//! Each output names a template file containing a `{{ publications }}`
//! marker; the marker is replaced with the formatted list, newest
//! first, and the result written to the output path.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use groupbib_core::{Publication, Store, StoreError};

use crate::config::OutputEntry;

pub const PUBLICATIONS_VAR: &str = "{{ publications }}";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot read template '{path}': {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write output '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One Markdown list item per publication, blank line separated.
pub fn format_listing(publications: &[Publication]) -> String {
    publications
        .iter()
        .map(|publication| format!("- {publication}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_outputs(store: &Store, outputs: &[OutputEntry]) -> Result<(), RenderError> {
    let visible = store.visible_publications()?;

    for output in outputs {
        let selected: Vec<Publication> = visible
            .iter()
            .filter(|publication| output.filter.keeps(publication))
            .cloned()
            .collect();
        let listing = format_listing(&selected);

        let template =
            fs::read_to_string(&output.template).map_err(|source| RenderError::Template {
                path: output.template.clone(),
                source,
            })?;
        let rendered = template.replace(PUBLICATIONS_VAR, &listing);

        if let Some(parent) = output.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| RenderError::Output {
                    path: output.path.clone(),
                    source,
                })?;
            }
        }
        fs::write(&output.path, rendered).map_err(|source| RenderError::Output {
            path: output.path.clone(),
            source,
        })?;
        info!(
            "wrote {} publications to '{}'",
            selected.len(),
            output.path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFilter;
    use groupbib_core::PublicationType;

    fn store_with_publications() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let jane = store.find_or_create_author("h/JaneDoe", "Jane Doe").unwrap();

        let mut article =
            Publication::new("journals/x/Doe20", PublicationType::Article, "A Paper", 2020);
        article.authors = vec![jane.clone()];
        article.author_order = "h/JaneDoe".to_string();
        article.venue = "J. Test".to_string();
        article.visibility = Some(true);
        store.queue_publication(article);

        let mut preprint = Publication::new(
            "journals/corr/abs-2012-00001",
            PublicationType::Informal,
            "A Preprint",
            2021,
        );
        preprint.authors = vec![jane];
        preprint.author_order = "h/JaneDoe".to_string();
        preprint.venue = "CoRR".to_string();
        preprint.visibility = Some(true);
        store.queue_publication(preprint);

        store.commit().unwrap();
        store
    }

    #[test]
    fn test_render_replaces_marker_and_creates_parent() {
        let store = store_with_publications();
        let dir = tempfile::tempdir().unwrap();

        let template = dir.path().join("template.md");
        fs::write(&template, "# Publications\n\n{{ publications }}\n").unwrap();

        let output = OutputEntry {
            path: dir.path().join("site/publications.md"),
            template,
            filter: OutputFilter::All,
        };
        render_outputs(&store, &[output]).unwrap();

        let rendered = fs::read_to_string(dir.path().join("site/publications.md")).unwrap();
        assert!(rendered.starts_with("# Publications"));
        assert!(rendered.contains("- Jane Doe: A Preprint, CoRR 2021"));
        assert!(rendered.contains("- Jane Doe: A Paper, J. Test 2020"));
        // newest first
        assert!(rendered.find("A Preprint").unwrap() < rendered.find("A Paper").unwrap());
    }

    #[test]
    fn test_no_preprints_filter_drops_informal_records() {
        let store = store_with_publications();
        let dir = tempfile::tempdir().unwrap();

        let template = dir.path().join("template.md");
        fs::write(&template, "{{ publications }}").unwrap();

        let output = OutputEntry {
            path: dir.path().join("publications.md"),
            template,
            filter: OutputFilter::NoPreprints,
        };
        render_outputs(&store, &[output]).unwrap();

        let rendered = fs::read_to_string(dir.path().join("publications.md")).unwrap();
        assert!(rendered.contains("A Paper"));
        assert!(!rendered.contains("A Preprint"));
    }

    #[test]
    fn test_missing_template_reports_path() {
        let store = store_with_publications();
        let dir = tempfile::tempdir().unwrap();

        let output = OutputEntry {
            path: dir.path().join("publications.md"),
            template: dir.path().join("missing.md"),
            filter: OutputFilter::All,
        };
        let err = render_outputs(&store, &[output]).unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
    }
}
