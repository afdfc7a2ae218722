//! Decoding of every shape the `rocket.chat.hosts` value has had over time.
//!
//! - canonical: `{ "<url>": { "title", "url", ... } }`
//! - bare URL, raw or JSON-quoted: `https://chat.example.com`
//! - list of URLs: `["https://a.example.com/", ...]`
//! - title → URL mapping: `{ "Acme": "https://a.example.com" }`
//!
//! Anything else decodes to an empty registry.

use secrecy::ExposeSecret;
use serde_json::Value;

use super::host::{parse_host_url, HostRecord};

/// Outcome of decoding the stored hosts value.
#[derive(Debug, Default, PartialEq)]
pub(super) struct Decoded {
    pub records: Vec<HostRecord>,
    /// The stored value was not in canonical form and must be rewritten.
    pub migrated: bool,
}

impl Decoded {
    fn canonical(records: Vec<HostRecord>) -> Self {
        Self {
            records,
            migrated: false,
        }
    }

    fn migrated(records: Vec<HostRecord>) -> Self {
        Self {
            records,
            migrated: true,
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// A record for a bare stored URL, canonicalised with credentials split out.
/// URLs that do not parse as http(s) are dropped.
fn record_for(url: &str, title: Option<&str>) -> Option<HostRecord> {
    let parsed = match parse_host_url(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping unusable stored host URL");
            return None;
        }
    };
    Some(HostRecord {
        title: title
            .map(str::to_string)
            .unwrap_or_else(|| parsed.url.clone()),
        url: parsed.url,
        auth_url: parsed.auth_url,
        username: parsed.username,
        password: parsed.password.map(|p| p.expose_secret().to_owned()),
        last_path: None,
    })
}

/// Bring a stored record's URL into canonical form. Returns the record and
/// whether anything changed, or `None` when the URL is unusable.
fn canonicalize(mut record: HostRecord) -> Option<(HostRecord, bool)> {
    let parsed = match parse_host_url(&record.url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping host entry with unusable URL");
            return None;
        }
    };
    if parsed.url == record.url {
        return Some((record, false));
    }

    if record.title.is_empty() || record.title == record.url {
        record.title = parsed.url.clone();
    }
    if record.username.is_none() && parsed.username.is_some() {
        record.auth_url = parsed.auth_url;
        record.username = parsed.username;
        record.password = parsed.password.map(|p| p.expose_secret().to_owned());
    }
    record.url = parsed.url;
    Some((record, true))
}

/// Decode the raw stored string. Never fails; unusable input yields an empty,
/// migrated result so the caller rewrites a clean document.
pub(super) fn decode(raw: &str) -> Decoded {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) if is_http_url(raw.trim()) => {
            tracing::info!("Migrating bare host URL to host mapping");
            return Decoded::migrated(record_for(raw, None).into_iter().collect());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stored host list is unreadable, starting empty");
            return Decoded::migrated(Vec::new());
        }
    };

    match value {
        Value::Null => Decoded::canonical(Vec::new()),
        Value::String(s) if is_http_url(s.trim()) => {
            tracing::info!("Migrating quoted host URL to host mapping");
            Decoded::migrated(record_for(&s, None).into_iter().collect())
        }
        Value::Array(items) => {
            tracing::info!(count = items.len(), "Migrating host URL list to host mapping");
            let records = items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .filter_map(|s| record_for(s, None))
                .collect();
            Decoded::migrated(dedup(records))
        }
        Value::Object(map) => {
            let mut migrated = false;
            let mut records = Vec::with_capacity(map.len());
            for (key, entry) in map {
                match entry {
                    Value::String(url) => {
                        migrated = true;
                        records.extend(record_for(&url, Some(&key)));
                    }
                    Value::Object(_) => match serde_json::from_value::<HostRecord>(entry) {
                        Ok(mut record) => {
                            if record.url.is_empty() {
                                record.url = key;
                                migrated = true;
                            }
                            match canonicalize(record) {
                                Some((mut record, changed)) => {
                                    migrated |= changed;
                                    if record.title.is_empty() {
                                        record.title = record.url.clone();
                                    }
                                    records.push(record);
                                }
                                None => migrated = true,
                            }
                        }
                        Err(e) => {
                            migrated = true;
                            tracing::warn!(key = %key, error = %e, "Dropping unreadable host entry");
                        }
                    },
                    _ => {
                        migrated = true;
                        tracing::warn!(key = %key, "Dropping host entry of unexpected type");
                    }
                }
            }
            let before = records.len();
            let records = dedup(records);
            Decoded {
                migrated: migrated || records.len() != before,
                records,
            }
        }
        _ => {
            tracing::warn!("Stored host list has an unexpected shape, starting empty");
            Decoded::migrated(Vec::new())
        }
    }
}

/// Keep the first record for each URL.
fn dedup(records: Vec<HostRecord>) -> Vec<HostRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}
