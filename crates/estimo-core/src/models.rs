// Wire models exchanged with the estimates REST API.
//
// Estimates, clients, templates, versions, change logs and analytics are
// kept as opaque JSON: the server owns their shape and the client only
// caches and displays them. The few payloads whose fields the client reads
// are typed below.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type Estimate = Value;
pub type Client = Value;
pub type Template = Value;
pub type EntityId = i64;

// ---------------------------------------------------------------------------
// Auth and profile
// ---------------------------------------------------------------------------

/// Response of `/auth/login` and `/auth/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub login: String,
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: EntityId,
    pub text: String,
    #[serde(deserialize_with = "server_time::deserialize")]
    pub created_at: DateTime<FixedOffset>,
    #[serde(default, deserialize_with = "server_time::deserialize_option")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    pub user_id: EntityId,
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Server timestamps arrive with an offset (`2025-05-14T09:30:00.123456+00:00`)
/// from timezone-aware columns, or naive from older rows. Naive values are
/// taken as UTC.
pub mod server_time {
    use super::*;
    use serde::de::Error;

    pub fn parse(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).or_else(|err| {
            s.parse::<NaiveDateTime>()
                .map(|naive| naive.and_utc().fixed_offset())
                .map_err(|_| err)
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            total: 0,
            limit: 20,
            offset: 0,
        }
    }
}

/// One page of a list endpoint.
///
/// Accepts `{items, meta: {total, limit, offset}}`, the flat
/// `{items, total, limit, offset}` envelope, or a bare array (in which case
/// the page is the whole collection).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPage<T> {
    Nested {
        items: Vec<T>,
        meta: PageMeta,
    },
    Flat {
        items: Vec<T>,
        total: u64,
        limit: u64,
        offset: u64,
    },
    Bare(Vec<T>),
}

impl<'de, T> Deserialize<'de> for Page<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawPage::<T>::deserialize(deserializer)? {
            RawPage::Nested { items, meta } => Page { items, meta },
            RawPage::Flat {
                items,
                total,
                limit,
                offset,
            } => Page {
                items,
                meta: PageMeta {
                    total,
                    limit,
                    offset,
                },
            },
            RawPage::Bare(items) => {
                let len = items.len() as u64;
                Page {
                    items,
                    meta: PageMeta {
                        total: len,
                        limit: len,
                        offset: 0,
                    },
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Pdf,
    Excel,
}

impl ExportFormat {
    /// Value of the `format` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// A file produced by an export, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Build a download file name from an entity's `name`, falling back to
/// `fallback` when the name is missing or blank. Path separators are
/// replaced so the result always stays inside the target directory.
pub fn export_file_name(name: Option<&str>, fallback: &str, extension: &str) -> String {
    let stem = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback);
    let stem: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let stem = if stem.chars().all(|c| c == '.') {
        fallback.to_string()
    } else {
        stem
    };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_accepts_nested_meta() {
        let page: Page<Value> = serde_json::from_value(json!({
            "items": [{"id": 1}, {"id": 2}],
            "meta": {"total": 42, "limit": 2, "offset": 10}
        }))
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 42,
                limit: 2,
                offset: 10
            }
        );
    }

    #[test]
    fn page_accepts_flat_envelope() {
        let page: Page<Value> = serde_json::from_value(json!({
            "items": [{"id": 7}],
            "total": 31,
            "limit": 10,
            "offset": 30
        }))
        .unwrap();
        assert_eq!(page.items, vec![json!({"id": 7})]);
        assert_eq!(page.meta.total, 31);
        assert_eq!(page.meta.offset, 30);
    }

    #[test]
    fn page_accepts_bare_array() {
        let page: Page<Value> = serde_json::from_value(json!([{"id": 1}, {"id": 2}, {"id": 3}]))
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 3,
                limit: 3,
                offset: 0
            }
        );
    }

    #[test]
    fn page_meta_fills_missing_fields() {
        let page: Page<Value> =
            serde_json::from_value(json!({"items": [], "meta": {"total": 5}})).unwrap();
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.limit, 20);
        assert_eq!(page.meta.offset, 0);
    }

    #[test]
    fn page_rejects_object_without_items() {
        let result: Result<Page<Value>, _> = serde_json::from_value(json!({"detail": "nope"}));
        assert!(result.is_err());
    }

    #[test]
    fn note_parses_server_timestamps() {
        let note: Note = serde_json::from_value(json!({
            "id": 3,
            "text": "call back on monday",
            "created_at": "2025-05-14T09:30:00.123456+00:00",
            "updated_at": "2025-05-14T12:31:00+03:00",
            "user_id": 1,
            "user_name": "admin"
        }))
        .unwrap();
        assert_eq!(note.text, "call back on monday");
        assert_eq!(
            note.created_at.format("%Y-%m-%d %H:%M").to_string(),
            "2025-05-14 09:30"
        );
        let updated = note.updated_at.unwrap();
        assert_eq!(updated.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(updated.timestamp(), note.created_at.timestamp() + 60);
    }

    #[test]
    fn note_accepts_naive_timestamps_as_utc() {
        let note: Note = serde_json::from_value(json!({
            "id": 4,
            "text": "legacy row",
            "created_at": "2025-05-14T09:30:00",
            "updated_at": null,
            "user_id": 1
        }))
        .unwrap();
        assert_eq!(note.created_at.offset().local_minus_utc(), 0);
        assert!(note.updated_at.is_none());
        assert!(note.user_name.is_none());
    }

    #[test]
    fn note_rejects_unparseable_timestamp() {
        let result = serde_json::from_value::<Note>(json!({
            "id": 5,
            "text": "x",
            "created_at": "yesterday",
            "user_id": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn token_type_defaults_to_bearer() {
        let token: TokenResponse = serde_json::from_value(json!({"access_token": "abc"})).unwrap();
        assert_eq!(token.token_type, "bearer");
    }

    #[test]
    fn export_format_parses_aliases() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("xlsx".parse::<ExportFormat>(), Ok(ExportFormat::Excel));
        assert!("docx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Excel.as_query(), "excel");
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
    }

    #[test]
    fn export_file_name_uses_name_or_fallback() {
        assert_eq!(
            export_file_name(Some("Kitchen renovation"), "estimate", "json"),
            "Kitchen renovation.json"
        );
        assert_eq!(export_file_name(Some("   "), "estimate", "json"), "estimate.json");
        assert_eq!(export_file_name(None, "template", "json"), "template.json");
    }

    #[test]
    fn export_file_name_strips_path_separators() {
        assert_eq!(
            export_file_name(Some("../etc/passwd"), "estimate", "json"),
            ".._etc_passwd.json"
        );
        assert_eq!(export_file_name(Some(".."), "estimate", "json"), "estimate.json");
    }
}
