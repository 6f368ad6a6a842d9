//! Publication domain model

use std::fmt;

use chrono::{NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use super::Author;

/// The closed set of publication types DBLP feeds may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationType {
    Informal,
    Inproceedings,
    Incollection,
    Article,
    Phdthesis,
    Proceedings,
    Book,
}

impl PublicationType {
    /// Map a feed tag name onto the closed type set.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "informal" => Some(Self::Informal),
            "inproceedings" => Some(Self::Inproceedings),
            "incollection" => Some(Self::Incollection),
            "article" => Some(Self::Article),
            "phdthesis" => Some(Self::Phdthesis),
            "proceedings" => Some(Self::Proceedings),
            "book" => Some(Self::Book),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informal => "informal",
            Self::Inproceedings => "inproceedings",
            Self::Incollection => "incollection",
            Self::Article => "article",
            Self::Phdthesis => "phdthesis",
            Self::Proceedings => "proceedings",
            Self::Book => "book",
        }
    }
}

impl fmt::Display for PublicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for PublicationType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PublicationType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::from_tag(text).ok_or_else(|| FromSqlError::Other(
            format!("unknown publication type '{}'", text).into(),
        ))
    }
}

/// A publication as stored by the record store.
///
/// Identity is the DBLP `key`. The many-to-many author relation does
/// not preserve order, so `author_order` keeps the pids comma-joined in
/// import order; the human-readable listing is derived from it at read
/// time via [`Publication::author_display`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Publication {
    pub id: Option<i64>,
    pub key: String,
    pub kind: PublicationType,
    pub authors: Vec<Author>,
    pub author_order: String,
    pub title: String,
    pub year: i32,
    pub venue: String,
    pub pages: String,
    pub volume: String,
    pub number: String,
    pub url: String,
    pub dblp_url: String,
    /// Tri-state: `None` means no decision has been made yet.
    pub visibility: Option<bool>,
    pub comment: String,
    pub public_comment: String,
    pub created: NaiveDate,
}

impl Publication {
    /// Create a not-yet-persisted publication with empty optional fields.
    pub fn new(
        key: impl Into<String>,
        kind: PublicationType,
        title: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            id: None,
            key: key.into(),
            kind,
            authors: Vec::new(),
            author_order: String::new(),
            title: title.into(),
            year,
            venue: String::new(),
            pages: String::new(),
            volume: String::new(),
            number: String::new(),
            url: String::new(),
            dblp_url: String::new(),
            visibility: None,
            comment: String::new(),
            public_comment: String::new(),
            created: Utc::now().date_naive(),
        }
    }

    /// Comma-join author pids in the given order.
    pub fn author_order_of(authors: &[Author]) -> String {
        authors
            .iter()
            .map(|author| author.pid.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Derive the display listing by substituting each pid in
    /// `author_order` with the current author name. Pids without a
    /// bound author are left as-is.
    pub fn author_display(&self) -> String {
        self.author_order
            .split(", ")
            .filter(|pid| !pid.is_empty())
            .map(|pid| {
                self.authors
                    .iter()
                    .find(|author| author.pid == pid)
                    .map(|author| author.name.as_str())
                    .unwrap_or(pid)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} {} # {}",
            self.author_display(),
            self.title,
            self.venue,
            self.year,
            self.key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Publication {
        let mut publication = Publication::new(
            "journals/joc/DoeS20",
            PublicationType::Article,
            "Secure Protocols",
            2020,
        );
        publication.authors = vec![
            Author::new("h/JaneDoe", "Jane Doe"),
            Author::new("s/JohnSmith", "John Smith"),
        ];
        publication.author_order = Publication::author_order_of(&publication.authors);
        publication.venue = "J. Cryptol.".to_string();
        publication
    }

    #[test]
    fn test_from_tag_round_trip() {
        for tag in [
            "informal",
            "inproceedings",
            "incollection",
            "article",
            "phdthesis",
            "proceedings",
            "book",
        ] {
            let kind = PublicationType::from_tag(tag).unwrap();
            assert_eq!(kind.as_str(), tag);
        }
        assert!(PublicationType::from_tag("patent").is_none());
    }

    #[test]
    fn test_author_order_of() {
        let publication = sample();
        assert_eq!(publication.author_order, "h/JaneDoe, s/JohnSmith");
    }

    #[test]
    fn test_author_display_follows_order_not_relation() {
        let mut publication = sample();
        // relation iteration order must not matter
        publication.authors.reverse();
        assert_eq!(publication.author_display(), "Jane Doe, John Smith");
    }

    #[test]
    fn test_author_display_falls_back_to_pid() {
        let mut publication = sample();
        publication.authors.pop();
        assert_eq!(publication.author_display(), "Jane Doe, s/JohnSmith");
    }

    #[test]
    fn test_display_format() {
        let publication = sample();
        assert_eq!(
            publication.to_string(),
            "Jane Doe, John Smith: Secure Protocols, J. Cryptol. 2020 # journals/joc/DoeS20"
        );
    }
}
