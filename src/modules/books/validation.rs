//! Book payload validation.
//!
//! Checks run over the raw JSON so that type mistakes are reported next to
//! range and presence mistakes instead of stopping at the first decode error.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use url::Url;

use super::models::{Book, BookChanges};

/// Which write the payload is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every field, isbn included, is required
    Create,
    /// Every mutable field is required; isbn must be absent
    Update,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Isbn,
    Url,
    Text,
    Pages,
    Year,
}

const FIELDS: &[(&str, Kind)] = &[
    ("isbn", Kind::Isbn),
    ("amazon_url", Kind::Url),
    ("author", Kind::Text),
    ("language", Kind::Text),
    ("pages", Kind::Pages),
    ("publisher", Kind::Text),
    ("title", Kind::Text),
    ("year", Kind::Year),
];

pub const DEFAULT_ISBN_MIN_LEN: usize = 10;

/// Limits applied to book payloads.
#[derive(Debug, Clone)]
pub struct BookRules {
    pub isbn_min_len: usize,
    pub max_year: i64,
}

impl BookRules {
    pub fn new(isbn_min_len: usize, max_year: i64) -> Self {
        Self {
            isbn_min_len,
            max_year,
        }
    }

    /// Rules accepting publication years up to next year.
    pub fn current() -> Self {
        let next_year = i64::from(OffsetDateTime::now_utc().year()) + 1;
        Self::new(DEFAULT_ISBN_MIN_LEN, next_year)
    }

    /// Every violation in `payload`, in field order. Empty means valid.
    pub fn check(&self, payload: &Value, mode: Mode) -> Vec<String> {
        let Some(object) = payload.as_object() else {
            return vec!["payload must be a JSON object".to_string()];
        };

        let mut errors = Vec::new();

        for &(field, kind) in FIELDS {
            match (object.get(field), kind, mode) {
                (Some(_), Kind::Isbn, Mode::Update) => {
                    errors.push("isbn cannot be changed".to_string());
                }
                (None, Kind::Isbn, Mode::Update) => {}
                (None, _, _) => errors.push(format!("{} is required", field)),
                (Some(value), kind, _) => self.check_value(field, kind, value, &mut errors),
            }
        }

        errors.extend(unknown_fields(object));
        errors
    }

    /// Validate a create payload and decode it.
    pub fn validate_new(&self, payload: &Value) -> Result<Book, Vec<String>> {
        self.validate(payload, Mode::Create)
    }

    /// Validate an update payload and decode it.
    pub fn validate_changes(&self, payload: &Value) -> Result<BookChanges, Vec<String>> {
        self.validate(payload, Mode::Update)
    }

    fn validate<T: serde::de::DeserializeOwned>(
        &self,
        payload: &Value,
        mode: Mode,
    ) -> Result<T, Vec<String>> {
        let errors = self.check(payload, mode);
        if !errors.is_empty() {
            return Err(errors);
        }
        serde_json::from_value(payload.clone()).map_err(|err| vec![err.to_string()])
    }

    fn check_value(&self, field: &str, kind: Kind, value: &Value, errors: &mut Vec<String>) {
        match kind {
            Kind::Isbn | Kind::Url | Kind::Text => {
                let Some(text) = value.as_str() else {
                    errors.push(format!("{} must be a string", field));
                    return;
                };
                if text.trim().is_empty() {
                    errors.push(format!("{} must not be empty", field));
                    return;
                }
                match kind {
                    Kind::Isbn if text.trim() != text => errors
                        .push("isbn must not have leading or trailing whitespace".to_string()),
                    Kind::Isbn if text.chars().count() < self.isbn_min_len => errors.push(format!(
                        "isbn must be at least {} characters",
                        self.isbn_min_len
                    )),
                    Kind::Url if !is_http_url(text) => {
                        errors.push(format!("{} must be an http(s) URL", field));
                    }
                    _ => {}
                }
            }
            Kind::Pages => match value.as_i64() {
                None => errors.push("pages must be an integer".to_string()),
                Some(pages) if pages < 0 => {
                    errors.push("pages must be a non-negative integer".to_string());
                }
                Some(_) => {}
            },
            Kind::Year => match value.as_i64() {
                None => errors.push("year must be an integer".to_string()),
                Some(year) if !(0..=self.max_year).contains(&year) => {
                    errors.push(format!("year must be between 0 and {}", self.max_year));
                }
                Some(_) => {}
            },
        }
    }
}

impl Default for BookRules {
    fn default() -> Self {
        Self::current()
    }
}

fn unknown_fields(object: &Map<String, Value>) -> Vec<String> {
    object
        .keys()
        .filter(|key| !FIELDS.iter().any(|(field, _)| *field == key.as_str()))
        .map(|key| format!("{} is not a recognised field", key))
        .collect()
}

fn is_http_url(text: &str) -> bool {
    // Url::parse strips surrounding whitespace and escapes inner spaces.
    !text.chars().any(char::is_whitespace)
        && Url::parse(text).is_ok_and(|url| {
            matches!(url.scheme(), "http" | "https") && url.host().is_some()
        })
}
