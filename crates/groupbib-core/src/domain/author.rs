//! Author representation

use std::fmt;

use serde::{Deserialize, Serialize};

/// An author of one or more publications.
///
/// The DBLP `pid` is the stable identity; the display name belongs to
/// whatever the feed last reported for that pid. The store rowid is
/// `None` until the author has been committed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub pid: String,
    pub name: String,
}

impl Author {
    /// Create a not-yet-persisted author.
    pub fn new(pid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            pid: pid.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pid, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_author_has_no_id() {
        let author = Author::new("92/7397", "Martin R. Albrecht");
        assert!(author.id.is_none());
        assert_eq!(author.pid, "92/7397");
    }

    #[test]
    fn test_display() {
        let author = Author::new("h/JaneDoe", "Jane Doe");
        assert_eq!(author.to_string(), "h/JaneDoe: Jane Doe");
    }
}
