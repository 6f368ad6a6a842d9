//! SQLite-backed record store
//!
//! Owns every Author and Publication. Imports stage their work as
//! pending state on the handle; `commit` flushes everything in one
//! transaction, so a dry run is simply a run that never commits.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::domain::{Author, Publication};
use crate::error::{Result, StoreError};

const SELECT_PUBLICATION: &str = "SELECT id, key, kind, author_order, title, year, venue, \
     pages, volume, number, url, dblp_url, visibility, comment, public_comment, created \
     FROM publications";

/// Counts of what a commit (or a would-be commit) flushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub new_authors: usize,
    pub new_publications: usize,
}

/// The record store. One handle per run; components receive it
/// explicitly instead of reaching for a process-wide session.
pub struct Store {
    conn: Connection,
    /// Authors sighted this run that are not in the table yet, by pid.
    pending_authors: BTreeMap<String, Author>,
    /// Persisted authors whose display name was refined this run.
    renamed_authors: BTreeMap<String, String>,
    /// Newly constructed publications queued for insertion.
    queued_publications: Vec<Publication>,
    /// Author-relation refreshes for existing publications: (id, pids).
    author_refreshes: Vec<(i64, Vec<String>)>,
}

impl Store {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing and dry experiments).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            pending_authors: BTreeMap::new(),
            renamed_authors: BTreeMap::new(),
            queued_publications: Vec::new(),
            author_refreshes: Vec::new(),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY,
                pid TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS publications (
                id INTEGER PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                author_order TEXT NOT NULL,
                title TEXT NOT NULL,
                year INTEGER NOT NULL,
                venue TEXT NOT NULL DEFAULT '',
                pages TEXT NOT NULL DEFAULT '',
                volume TEXT NOT NULL DEFAULT '',
                number TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                dblp_url TEXT NOT NULL DEFAULT '',
                visibility INTEGER,
                comment TEXT NOT NULL DEFAULT '',
                public_comment TEXT NOT NULL DEFAULT '',
                created TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS authors_publications (
                author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                publication_id INTEGER NOT NULL REFERENCES publications(id) ON DELETE CASCADE,
                PRIMARY KEY (author_id, publication_id)
            );

            CREATE INDEX IF NOT EXISTS idx_publications_year ON publications(year);
            CREATE INDEX IF NOT EXISTS idx_publications_visibility ON publications(visibility);
            ",
        )?;
        Ok(())
    }

    /// Find an author by pid, checking this run's pending authors
    /// first, or create a pending one. A non-empty name that differs
    /// from the stored one refines the stored name on commit.
    pub fn find_or_create_author(&mut self, pid: &str, name: &str) -> Result<Author> {
        if let Some(author) = self.pending_authors.get_mut(pid) {
            if !name.is_empty() && author.name != name {
                author.name = name.to_string();
            }
            return Ok(author.clone());
        }

        if let Some(mut author) = self.select_author(pid)? {
            if let Some(renamed) = self.renamed_authors.get(pid) {
                author.name = renamed.clone();
            }
            if !name.is_empty() && author.name != name {
                author.name = name.to_string();
                self.renamed_authors.insert(pid.to_string(), name.to_string());
            }
            return Ok(author);
        }

        let author = Author::new(pid, name);
        self.pending_authors.insert(pid.to_string(), author.clone());
        Ok(author)
    }

    fn select_author(&self, pid: &str) -> Result<Option<Author>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, pid, name FROM authors WHERE pid = ?1")?;
        let author = stmt
            .query_row(params![pid], |row| {
                Ok(Author {
                    id: Some(row.get(0)?),
                    pid: row.get(1)?,
                    name: row.get(2)?,
                })
            })
            .optional()?;
        Ok(author)
    }

    /// Resolve a publication by key: a record queued earlier this run
    /// wins over the table, so a co-authored paper seen through two
    /// feeds resolves to the same pending record.
    pub fn resolve_publication(&self, key: &str) -> Result<Option<Publication>> {
        if let Some(queued) = self.queued_publications.iter().find(|p| p.key == key) {
            return Ok(Some(queued.clone()));
        }
        self.select_publication(key)
    }

    /// Whether a record with this key is already queued for insertion.
    pub fn is_queued(&self, key: &str) -> bool {
        self.queued_publications.iter().any(|p| p.key == key)
    }

    /// Stage a newly constructed publication for insertion on commit.
    pub fn queue_publication(&mut self, publication: Publication) {
        debug!("queued '{}'", publication.key);
        self.queued_publications.push(publication);
    }

    /// Stage an author-relation refresh for an existing publication.
    pub fn queue_author_refresh(&mut self, publication_id: i64, pids: Vec<String>) {
        self.author_refreshes.push((publication_id, pids));
    }

    /// What a commit would flush right now.
    pub fn pending(&self) -> CommitStats {
        CommitStats {
            new_authors: self.pending_authors.len(),
            new_publications: self.queued_publications.len(),
        }
    }

    /// Flush all pending authors, publications, relations and name
    /// refinements in one transaction.
    pub fn commit(&mut self) -> Result<CommitStats> {
        let stats = self.pending();
        let tx = self.conn.transaction()?;

        for author in self.pending_authors.values() {
            tx.execute(
                "INSERT OR IGNORE INTO authors (pid, name) VALUES (?1, ?2)",
                params![author.pid, author.name],
            )?;
        }
        for (pid, name) in &self.renamed_authors {
            tx.execute(
                "UPDATE authors SET name = ?2 WHERE pid = ?1",
                params![pid, name],
            )?;
        }

        for publication in &self.queued_publications {
            tx.execute(
                "INSERT INTO publications (key, kind, author_order, title, year, venue, \
                 pages, volume, number, url, dblp_url, visibility, comment, public_comment, created) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    publication.key,
                    publication.kind,
                    publication.author_order,
                    publication.title,
                    publication.year,
                    publication.venue,
                    publication.pages,
                    publication.volume,
                    publication.number,
                    publication.url,
                    publication.dblp_url,
                    publication.visibility,
                    publication.comment,
                    publication.public_comment,
                    publication.created.format("%Y-%m-%d").to_string(),
                ],
            )?;
            let publication_id = tx.last_insert_rowid();
            for author in &publication.authors {
                tx.execute(
                    "INSERT OR IGNORE INTO authors_publications (author_id, publication_id) \
                     SELECT id, ?2 FROM authors WHERE pid = ?1",
                    params![author.pid, publication_id],
                )?;
            }
        }

        for (publication_id, pids) in &self.author_refreshes {
            tx.execute(
                "DELETE FROM authors_publications WHERE publication_id = ?1",
                params![publication_id],
            )?;
            for pid in pids {
                tx.execute(
                    "INSERT OR IGNORE INTO authors_publications (author_id, publication_id) \
                     SELECT id, ?2 FROM authors WHERE pid = ?1",
                    params![pid, publication_id],
                )?;
            }
        }

        tx.commit()?;

        self.pending_authors.clear();
        self.renamed_authors.clear();
        self.queued_publications.clear();
        self.author_refreshes.clear();
        debug!(
            "committed {} publications, {} authors",
            stats.new_publications, stats.new_authors
        );
        Ok(stats)
    }

    fn select_publication(&self, key: &str) -> Result<Option<Publication>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE key = ?1", SELECT_PUBLICATION))?;
        let publication = stmt
            .query_row(params![key], Self::row_to_publication)
            .optional()?;
        match publication {
            Some(mut publication) => {
                if let Some(id) = publication.id {
                    publication.authors = self.authors_of(id)?;
                }
                Ok(Some(publication))
            }
            None => Ok(None),
        }
    }

    /// All shown publications, most recent year first, with authors
    /// loaded so the display listing can be derived.
    pub fn visible_publications(&self) -> Result<Vec<Publication>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE visibility = 1 ORDER BY year DESC, key ASC",
            SELECT_PUBLICATION
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_publication)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        let mut publications = rows;
        for publication in &mut publications {
            if let Some(id) = publication.id {
                publication.authors = self.authors_of(id)?;
            }
        }
        Ok(publications)
    }

    /// Flip the visibility of the publication whose key contains
    /// `fragment`. Zero or multiple matches is an error. Persists
    /// immediately, outside the import transaction.
    pub fn toggle_visibility(&mut self, fragment: &str) -> Result<Publication> {
        let publication = self.find_by_fragment(fragment)?;
        let next = !publication.visibility.unwrap_or(false);
        self.write_visibility(&publication.key, next)
    }

    /// Explicitly set visibility instead of flipping it.
    pub fn set_visibility(&mut self, fragment: &str, visible: bool) -> Result<Publication> {
        let publication = self.find_by_fragment(fragment)?;
        self.write_visibility(&publication.key, visible)
    }

    fn write_visibility(&mut self, key: &str, visible: bool) -> Result<Publication> {
        self.conn.execute(
            "UPDATE publications SET visibility = ?2 WHERE key = ?1",
            params![key, visible],
        )?;
        self.select_publication(key)?
            .ok_or_else(|| StoreError::NoMatch(key.to_string()))
    }

    fn find_by_fragment(&self, fragment: &str) -> Result<Publication> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM publications WHERE instr(key, ?1) > 0")?;
        let keys = stmt
            .query_map(params![fragment], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        match keys.as_slice() {
            [] => Err(StoreError::NoMatch(fragment.to_string())),
            [key] => self
                .select_publication(key)?
                .ok_or_else(|| StoreError::NoMatch(fragment.to_string())),
            _ => Err(StoreError::Ambiguous {
                fragment: fragment.to_string(),
                count: keys.len(),
            }),
        }
    }

    fn authors_of(&self, publication_id: i64) -> Result<Vec<Author>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.pid, a.name FROM authors a \
             JOIN authors_publications ap ON ap.author_id = a.id \
             WHERE ap.publication_id = ?1",
        )?;
        let authors = stmt
            .query_map(params![publication_id], |row| {
                Ok(Author {
                    id: Some(row.get(0)?),
                    pid: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(authors)
    }

    fn row_to_publication(row: &rusqlite::Row<'_>) -> rusqlite::Result<Publication> {
        let created: String = row.get(15)?;
        let created = NaiveDate::parse_from_str(&created, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                15,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        Ok(Publication {
            id: Some(row.get(0)?),
            key: row.get(1)?,
            kind: row.get(2)?,
            authors: Vec::new(),
            author_order: row.get(3)?,
            title: row.get(4)?,
            year: row.get(5)?,
            venue: row.get(6)?,
            pages: row.get(7)?,
            volume: row.get(8)?,
            number: row.get(9)?,
            url: row.get(10)?,
            dblp_url: row.get(11)?,
            visibility: row.get(12)?,
            comment: row.get(13)?,
            public_comment: row.get(14)?,
            created,
        })
    }
}
