//! Configuration file and group roster loading
//!
//! `groupbib.toml` names the database, the group roster and the render
//! outputs. The roster is a CSV file of `pid, name, start, end, ...`
//! rows whose year columns become the member's visibility spans; people
//! can also be listed inline in the config with an explicit rule.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use groupbib_core::{Publication, PublicationType, VisibilityRule, YearSpan};
use groupbib_dblp::Member;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid roster: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid year '{value}' in roster row for '{pid}'")]
    InvalidYear { pid: String, value: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// CSV roster of group members, one row per person.
    pub roster: Option<PathBuf>,

    /// Members configured inline, in addition to the roster.
    #[serde(default)]
    pub people: Vec<PersonEntry>,

    /// Files to render from the visible publications.
    #[serde(default)]
    pub outputs: Vec<OutputEntry>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("groupbib.db")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonEntry {
    pub pid: String,
    #[serde(default)]
    pub rule: VisibilityRule,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputEntry {
    /// Where the rendered file goes.
    pub path: PathBuf,
    /// Template containing the `{{ publications }}` marker.
    pub template: PathBuf,
    #[serde(default)]
    pub filter: OutputFilter,
}

/// Which visible publications an output includes.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFilter {
    #[default]
    All,
    NoPreprints,
}

impl OutputFilter {
    pub fn keeps(&self, publication: &Publication) -> bool {
        match self {
            OutputFilter::All => true,
            OutputFilter::NoPreprints => publication.kind != PublicationType::Informal,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Roster members first, then inline people.
    pub fn members(&self) -> Result<Vec<Member>, ConfigError> {
        let mut members = Vec::new();
        if let Some(roster) = &self.roster {
            members.extend(load_roster(roster)?);
        }
        for person in &self.people {
            members.push(Member {
                pid: person.pid.clone(),
                rule: person.rule.clone(),
            });
        }
        Ok(members)
    }
}

/// Parse a roster CSV into members.
///
/// Each row is `pid, name, start, end, start, end, ...`; the name
/// column is informational only. An empty end year means the person is
/// still in the group; a row with no year columns accepts every year.
pub fn load_roster(path: &Path) -> Result<Vec<Member>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(ConfigError::Csv)?;

    let mut members = Vec::new();
    for row in reader.records() {
        let row = row?;
        let pid = match row.get(0) {
            Some(pid) if !pid.is_empty() => pid.to_string(),
            _ => continue,
        };

        let mut spans = Vec::new();
        let mut columns = row.iter().skip(2);
        while let Some(start) = columns.next() {
            if start.is_empty() {
                break;
            }
            let start = parse_year(&pid, start)?;
            let end = match columns.next() {
                Some(end) if !end.is_empty() => Some(parse_year(&pid, end)?),
                _ => None,
            };
            spans.push(YearSpan { start, end });
        }

        members.push(Member {
            pid,
            rule: VisibilityRule::Spans { spans },
        });
    }
    Ok(members)
}

fn parse_year(pid: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidYear {
        pid: pid.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "groupbib.toml",
            r#"
db_path = "group.db"

[[people]]
pid = "h/JaneDoe"
rule = { kind = "since", year = 2015 }

[[people]]
pid = "s/JohnSmith"

[[outputs]]
path = "site/publications.md"
template = "templates/publications.md"
filter = "no_preprints"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("group.db"));
        assert!(config.roster.is_none());
        assert_eq!(config.people.len(), 2);
        assert_eq!(
            config.people[0].rule,
            VisibilityRule::Since { year: 2015 }
        );
        // a person without an explicit rule accepts everything
        assert_eq!(config.people[1].rule, VisibilityRule::All);
        assert_eq!(config.outputs[0].filter, OutputFilter::NoPreprints);
    }

    #[test]
    fn test_roster_rows_become_span_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "people.csv",
            "pid,name,start,end,start,end\n\
             h/JaneDoe,Jane Doe,2010,2014,2018,\n\
             s/JohnSmith,John Smith,,,,\n",
        );

        let members = load_roster(&path).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(
            members[0].rule,
            VisibilityRule::Spans {
                spans: vec![
                    YearSpan { start: 2010, end: Some(2014) },
                    YearSpan { start: 2018, end: None },
                ]
            }
        );
        // no year columns: accepts every year
        assert_eq!(members[1].rule, VisibilityRule::Spans { spans: vec![] });
    }

    #[test]
    fn test_roster_rejects_bad_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "people.csv",
            "pid,name,start,end\nh/JaneDoe,Jane Doe,soon,\n",
        );

        let err = load_roster(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYear { .. }));
    }

    #[test]
    fn test_members_combines_roster_and_inline_people() {
        let dir = tempfile::tempdir().unwrap();
        let roster = write_file(&dir, "people.csv", "pid,name\nh/JaneDoe,Jane Doe\n");
        let config_path = write_file(
            &dir,
            "groupbib.toml",
            &format!(
                "roster = {:?}\n\n[[people]]\npid = \"s/JohnSmith\"\n",
                roster
            ),
        );

        let config = Config::load(&config_path).unwrap();
        let members = config.members().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].pid, "h/JaneDoe");
        assert_eq!(members[1].pid, "s/JohnSmith");
    }

    #[test]
    fn test_missing_config_reports_path() {
        let err = Config::load(Path::new("/nonexistent/groupbib.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/groupbib.toml"));
    }
}
