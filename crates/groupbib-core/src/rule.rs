//! Visibility rules
//!
//! A rule decides whether a newly imported publication starts out
//! visible. Rules are plain data rather than closures so they can live
//! in config files and be tested in isolation. A rule that rejects
//! leaves the publication undecided; it never hides anything.

use serde::{Deserialize, Serialize};

use crate::domain::Publication;

/// An inclusive year range; an open end accepts everything from
/// `start` onwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSpan {
    pub start: i32,
    pub end: Option<i32>,
}

/// Predicate over a publication's year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisibilityRule {
    /// Accept every publication.
    All,
    /// Accept if `year >= year`.
    Since { year: i32 },
    /// Accept if `start <= year < end` (half-open).
    Between { start: i32, end: i32 },
    /// Accept if the year is listed explicitly or `year >= since`.
    YearsOrSince { years: Vec<i32>, since: i32 },
    /// Union of inclusive spans. The empty list accepts everything;
    /// that is a deliberate choice, not an accident.
    Spans { spans: Vec<YearSpan> },
}

impl Default for VisibilityRule {
    fn default() -> Self {
        VisibilityRule::All
    }
}

impl VisibilityRule {
    /// Pure year check, ignoring any stored visibility.
    pub fn accepts_year(&self, year: i32) -> bool {
        match self {
            VisibilityRule::All => true,
            VisibilityRule::Since { year: start } => year >= *start,
            VisibilityRule::Between { start, end } => *start <= year && year < *end,
            VisibilityRule::YearsOrSince { years, since } => {
                years.contains(&year) || year >= *since
            }
            VisibilityRule::Spans { spans } => {
                spans.is_empty()
                    || spans.iter().any(|span| {
                        span.start <= year && span.end.map_or(true, |end| year <= end)
                    })
            }
        }
    }

    /// Evaluate against a publication. An explicit visibility, however
    /// it was set, short-circuits to its existing value.
    pub fn evaluate(&self, publication: &Publication) -> bool {
        if let Some(explicit) = publication.visibility {
            return explicit;
        }
        self.accepts_year(publication.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PublicationType;

    fn publication_in(year: i32) -> Publication {
        Publication::new("conf/test/Key21", PublicationType::Inproceedings, "T", year)
    }

    #[test]
    fn test_all_accepts_everything() {
        assert!(VisibilityRule::All.accepts_year(1901));
        assert!(VisibilityRule::All.accepts_year(2077));
    }

    #[test]
    fn test_since() {
        let rule = VisibilityRule::Since { year: 2015 };
        assert!(!rule.accepts_year(2014));
        assert!(rule.accepts_year(2015));
        assert!(rule.accepts_year(2020));
    }

    #[test]
    fn test_between_is_half_open() {
        let rule = VisibilityRule::Between {
            start: 2003,
            end: 2005,
        };
        assert!(!rule.accepts_year(2002));
        assert!(rule.accepts_year(2003));
        assert!(rule.accepts_year(2004));
        assert!(!rule.accepts_year(2005));
    }

    #[test]
    fn test_years_or_since() {
        let rule = VisibilityRule::YearsOrSince {
            years: vec![2008, 2009, 2010],
            since: 2015,
        };
        assert!(rule.accepts_year(2009));
        assert!(!rule.accepts_year(2011));
        assert!(rule.accepts_year(2015));
        assert!(rule.accepts_year(2023));
    }

    #[test]
    fn test_spans_inclusive_and_open_ended() {
        let rule = VisibilityRule::Spans {
            spans: vec![
                YearSpan {
                    start: 2003,
                    end: Some(2005),
                },
                YearSpan {
                    start: 2010,
                    end: None,
                },
            ],
        };
        assert!(!rule.accepts_year(2002));
        assert!(rule.accepts_year(2003));
        assert!(rule.accepts_year(2005));
        assert!(!rule.accepts_year(2006));
        assert!(rule.accepts_year(2010));
        assert!(rule.accepts_year(2030));
    }

    #[test]
    fn test_empty_spans_accept_all() {
        let rule = VisibilityRule::Spans { spans: vec![] };
        assert!(rule.accepts_year(1850));
        assert!(rule.accepts_year(2199));
    }

    #[test]
    fn test_evaluate_short_circuits_on_explicit_visibility() {
        let rule = VisibilityRule::Since { year: 2015 };

        let mut shown = publication_in(1999);
        shown.visibility = Some(true);
        assert!(rule.evaluate(&shown));

        let mut hidden = publication_in(2020);
        hidden.visibility = Some(false);
        assert!(!rule.evaluate(&hidden));

        let undecided = publication_in(2020);
        assert!(rule.evaluate(&undecided));
    }

    #[test]
    fn test_serde_round_trip() {
        let rules = vec![
            VisibilityRule::All,
            VisibilityRule::Since { year: 2015 },
            VisibilityRule::Between {
                start: 2003,
                end: 2005,
            },
            VisibilityRule::YearsOrSince {
                years: vec![2008, 2009],
                since: 2015,
            },
            VisibilityRule::Spans {
                spans: vec![YearSpan {
                    start: 2003,
                    end: None,
                }],
            },
        ];
        for rule in &rules {
            let json = serde_json::to_string(rule).unwrap();
            let back: VisibilityRule = serde_json::from_str(&json).unwrap();
            assert_eq!(*rule, back);
        }
    }
}
