//! DBLP feed parsing
//!
//! A person feed is a `<dblpperson>` document whose `<r>` wrappers each
//! hold exactly one typed record element. Parsing normalizes every
//! record into a `Publication` and resolves it against the record
//! store: an already-known key is returned as the stored record, an
//! unknown one becomes a fresh unsaved record with undecided
//! visibility. Document order is preserved.

use std::collections::HashMap;

use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use groupbib_core::{Publication, PublicationType, Store, StoreError};

/// Venue string DBLP uses for the IACR preprint archive.
pub const IACR_EPRINT_VENUE: &str = "IACR Cryptol. ePrint Arch.";

lazy_static! {
    // "Jane Doe 0001" is a thing on DBLP
    static ref NAME_DISAMBIGUATOR: Regex = Regex::new(r"^([^0-9]*)([0-9]+)?").unwrap();
    static ref EPRINT_URL: Regex =
        Regex::new(r"^https?://eprint\.iacr\.org/[0-9]{4}/([0-9]+)").unwrap();
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Unrecognized publication type '{tag}' for record '{key}'")]
    UnknownType { tag: String, key: String },

    #[error("Record '{key}' is missing required field '{field}'")]
    MissingField { key: String, field: &'static str },

    #[error("Record '{key}' has non-numeric year '{value}'")]
    InvalidYear { key: String, value: String },

    #[error("Cannot extract an ePrint number from '{url}' for record '{key}'")]
    EprintUrl { key: String, url: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which metadata subfield holds the venue for a given type.
fn venue_field(kind: PublicationType) -> &'static str {
    match kind {
        PublicationType::Article | PublicationType::Informal => "journal",
        PublicationType::Inproceedings | PublicationType::Incollection => "booktitle",
        PublicationType::Phdthesis => "school",
        PublicationType::Book | PublicationType::Proceedings => "publisher",
    }
}

/// Which contributor role carries the author list for a given type.
fn contributor_role(kind: PublicationType) -> &'static str {
    match kind {
        PublicationType::Proceedings => "editor",
        PublicationType::Informal
        | PublicationType::Inproceedings
        | PublicationType::Incollection
        | PublicationType::Article
        | PublicationType::Phdthesis
        | PublicationType::Book => "author",
    }
}

/// Strip DBLP's trailing numeric disambiguator from a contributor name.
fn clean_author_name(raw: &str) -> String {
    NAME_DISAMBIGUATOR
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|leading| leading.as_str().trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// One contributor element: role tag, pid attribute, accumulated text.
struct Contributor {
    role: String,
    pid: Option<String>,
    name: String,
}

/// Accumulator for the record element currently being read.
struct RawRecord {
    key: String,
    kind: PublicationType,
    authors: Vec<(String, String)>,
    editors: Vec<(String, String)>,
    fields: HashMap<String, String>,
}

/// Parse a raw feed document into store-resolved publications.
pub fn parse_feed(store: &mut Store, xml: &str) -> Result<Vec<Publication>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut publications = Vec::new();
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut in_wrapper = false;
    let mut record: Option<RawRecord> = None;
    let mut current_field: Option<String> = None;
    let mut contributor: Option<Contributor> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if depth == 2 {
                    in_wrapper = name == "r";
                } else if depth == 3 && in_wrapper && record.is_none() {
                    let mut key = String::new();
                    let mut publtype = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"key" => key = String::from_utf8_lossy(&attr.value).to_string(),
                            b"publtype" => {
                                publtype = String::from_utf8_lossy(&attr.value).to_string()
                            }
                            _ => {}
                        }
                    }
                    let kind = if name == "article" && publtype == "informal" {
                        PublicationType::Informal
                    } else {
                        PublicationType::from_tag(&name)
                            .ok_or_else(|| ParseError::UnknownType {
                                tag: name.clone(),
                                key: key.clone(),
                            })?
                    };
                    if key.is_empty() {
                        return Err(ParseError::MissingField {
                            key: String::new(),
                            field: "key",
                        });
                    }
                    record = Some(RawRecord {
                        key,
                        kind,
                        authors: Vec::new(),
                        editors: Vec::new(),
                        fields: HashMap::new(),
                    });
                } else if depth == 4 && record.is_some() {
                    if name == "author" || name == "editor" {
                        let mut pid = None;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"pid" {
                                pid = Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                        contributor = Some(Contributor {
                            role: name,
                            pid,
                            name: String::new(),
                        });
                    } else {
                        // first occurrence of a field wins, as with
                        // repeated <ee> links
                        let seen = record
                            .as_ref()
                            .map(|r| r.fields.contains_key(&name))
                            .unwrap_or(false);
                        current_field = if seen { None } else { Some(name) };
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(contributor) = contributor.as_mut() {
                    contributor.name.push_str(&text);
                } else if let (Some(field), Some(record)) =
                    (current_field.as_ref(), record.as_mut())
                {
                    record
                        .fields
                        .entry(field.clone())
                        .or_default()
                        .push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if depth == 4 {
                    match contributor.take() {
                        Some(finished) if finished.role == name => {
                            if let Some(record) = record.as_mut() {
                                let pid =
                                    finished.pid.ok_or_else(|| ParseError::MissingField {
                                        key: record.key.clone(),
                                        field: "pid",
                                    })?;
                                let entry = (pid, finished.name);
                                match finished.role.as_str() {
                                    "editor" => record.editors.push(entry),
                                    _ => record.authors.push(entry),
                                }
                            }
                        }
                        other => {
                            contributor = other;
                            if current_field.as_deref() == Some(name.as_str()) {
                                current_field = None;
                            }
                        }
                    }
                } else if depth == 3 && record.is_some() {
                    if let Some(raw) = record.take() {
                        let draft = build_publication(store, raw)?;
                        match store.resolve_publication(&draft.key)? {
                            Some(existing) => {
                                debug!("found '{}'", existing.key);
                                publications.push(existing);
                            }
                            None => {
                                debug!("parsed '{}'", draft);
                                publications.push(draft);
                            }
                        }
                    }
                } else if depth == 2 {
                    in_wrapper = false;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(publications)
}

/// Normalize an accumulated record into a fresh publication draft.
fn build_publication(store: &mut Store, raw: RawRecord) -> Result<Publication, ParseError> {
    let RawRecord {
        key,
        kind,
        authors,
        editors,
        mut fields,
    } = raw;

    let contributors = match contributor_role(kind) {
        "editor" => editors,
        _ => authors,
    };

    let mut resolved = Vec::with_capacity(contributors.len());
    for (pid, raw_name) in contributors {
        let name = clean_author_name(&raw_name);
        resolved.push(store.find_or_create_author(&pid, &name)?);
    }
    let author_order = Publication::author_order_of(&resolved);

    let title = fields
        .remove("title")
        .ok_or_else(|| ParseError::MissingField {
            key: key.clone(),
            field: "title",
        })?;
    let title = match title.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => title,
    };

    let year_text = fields
        .remove("year")
        .ok_or_else(|| ParseError::MissingField {
            key: key.clone(),
            field: "year",
        })?;
    let year: i32 = year_text
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidYear {
            key: key.clone(),
            value: year_text.clone(),
        })?;

    let venue = fields.remove(venue_field(kind)).unwrap_or_default();
    let url = fields.remove("ee").unwrap_or_default();
    let dblp_url = fields.remove("url").unwrap_or_default();
    let pages = fields.remove("pages").unwrap_or_default();
    let volume = fields.remove("volume").unwrap_or_default();
    let mut number = fields.remove("number").unwrap_or_default();

    // ePrint reports are keyed by their archive number, not whatever
    // the feed put into <number>
    if venue == IACR_EPRINT_VENUE {
        number = EPRINT_URL
            .captures(&url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ParseError::EprintUrl {
                key: key.clone(),
                url: url.clone(),
            })?;
    }

    let mut publication = Publication::new(key, kind, title, year);
    publication.authors = resolved;
    publication.author_order = author_order;
    publication.venue = venue;
    publication.pages = pages;
    publication.volume = volume;
    publication.number = number;
    publication.url = url;
    publication.dblp_url = dblp_url;
    Ok(publication)
}
