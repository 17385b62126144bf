#![forbid(unsafe_code)]

//! Catalog entities of the course admin console and decoding of their list
//! endpoints.
//!
//! Every lookup endpoint answers `GET /<resource>?search=&offset=&limit=`
//! with a JSON envelope:
//!
//! ```json
//! { "data": [ { "id": 7, "name": "Databases" } ], "total": 31 }
//! ```
//!
//! `total` is optional. When it is missing, a page shorter than the
//! requested limit is taken as the last one. Error responses carry an
//! optional `message` that is surfaced verbatim to the user.
//!
//! # Example
//!
//! ```
//! use rselect::catalog::{Course, decode_page};
//! use rselect::SearchQuery;
//!
//! let body = br#"{ "data": [ { "id": 1, "name": "Intro to Python" } ], "total": 1 }"#;
//! let page = decode_page::<Course>(200, body, &SearchQuery::first_page("py", 20)).unwrap();
//! assert_eq!(page.items[0].name, "Intro to Python");
//! assert!(page.is_last_page);
//! ```

use std::fmt;

use rselect_core::error::FetchError;
use rselect_core::identity::{Identified, Labeled};
use rselect_core::query::{PageResponse, SearchQuery};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

// --- Ids ------------------------------------------------------------------

/// Ids arrive as JSON numbers from some endpoints and strings from others.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

// --- Entities -------------------------------------------------------------

/// A course offered on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Course {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    /// Short catalog code such as `CS101`.
    #[serde(default)]
    pub code: Option<String>,
}

/// A teacher account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Teacher {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(alias = "full_name")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A course language. Identified by its code (`en`, `pt-BR`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

/// A course category, possibly nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub parent_id: Option<String>,
}

impl Identified for Course {
    fn identity_key(&self) -> String {
        self.id.clone()
    }
}

impl Labeled for Course {
    fn label(&self) -> String {
        match &self.code {
            Some(code) if !code.is_empty() => format!("{code} {}", self.name),
            _ => self.name.clone(),
        }
    }
}

impl Identified for Teacher {
    fn identity_key(&self) -> String {
        self.id.clone()
    }
}

impl Labeled for Teacher {
    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Identified for Language {
    fn identity_key(&self) -> String {
        self.code.clone()
    }
}

impl Labeled for Language {
    fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

impl Identified for Category {
    fn identity_key(&self) -> String {
        self.id.clone()
    }
}

impl Labeled for Category {
    fn label(&self) -> String {
        self.name.clone()
    }
}

// --- Lookups --------------------------------------------------------------

/// Which list endpoint a select field searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Course,
    Teacher,
    Language,
    Category,
}

impl LookupKind {
    /// All lookups, in the order the console shows them.
    pub const ALL: [Self; 4] = [Self::Course, Self::Teacher, Self::Language, Self::Category];

    /// Path segment of the list endpoint.
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Course => "courses",
            Self::Teacher => "teachers",
            Self::Language => "languages",
            Self::Category => "categories",
        }
    }

    /// Query-string pairs for `query`, unencoded.
    ///
    /// An empty search text is left out so the endpoint returns its
    /// unfiltered listing.
    #[must_use]
    pub fn query_params(self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if !query.text().is_empty() {
            params.push(("search", query.text().to_string()));
        }
        params.push(("offset", query.offset().to_string()));
        params.push(("limit", query.limit().to_string()));
        params
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

// --- Decoding -------------------------------------------------------------

/// Body of a successful list response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Vec<T>,
    /// Total matches across all pages, when the endpoint counts them.
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> ApiEnvelope<T> {
    /// Convert to a page for `query`.
    #[must_use]
    pub fn into_page(self, query: &SearchQuery) -> PageResponse<T> {
        let is_last_page = match self.total {
            Some(total) => (query.offset() + self.data.len()) as u64 >= total,
            None => self.data.len() < query.limit(),
        };
        PageResponse {
            items: self.data,
            is_last_page,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Decode one HTTP response of a list endpoint.
///
/// Non-2xx statuses become [`FetchError::Server`] carrying the body's
/// `message` when there is one. A 2xx body that is not a valid envelope is
/// also a server error, since retrying cannot fix it on our side.
pub fn decode_page<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
    query: &SearchQuery,
) -> Result<PageResponse<T>, FetchError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_default();
        tracing::debug!(
            target: "rselect.catalog",
            status,
            query = %query,
            "list endpoint returned an error status"
        );
        return Err(FetchError::server(status, message));
    }

    match serde_json::from_slice::<ApiEnvelope<T>>(body) {
        Ok(envelope) => Ok(envelope.into_page(query)),
        Err(err) => {
            tracing::warn!(
                target: "rselect.catalog",
                status,
                query = %query,
                error = %err,
                "invalid list response body"
            );
            Err(FetchError::server(status, "invalid response body"))
        }
    }
}
