//! Outbound manifest wire schema.
//!
//! [`ManifestEntry`] is distinct from [`crate::record::Session`] on
//! purpose: it is the serialized projection actually published, and
//! carries exactly the keys `spec.md` §6 names, in that order, with nulls
//! permitted for the last two fields.

use serde::Serialize;

use crate::record::Session;

/// The `source`, `published_at`, `records` header triple published
/// alongside every manifest (`spec.md` §6).
#[derive(Debug, Clone)]
pub struct ManifestHeaders {
    pub source: &'static str,
    pub published_at: String,
    pub records: usize,
}

impl ManifestHeaders {
    #[must_use]
    pub fn new(now: i64, records: usize) -> Self {
        Self {
            source: "mpi",
            published_at: published_at(now),
            records,
        }
    }
}

/// One record in a published manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub phone: String,
    pub ip_addr: String,
    pub region: String,
    pub guid: String,
    pub description: String,
    pub last_active: i64,
    pub date_created: i64,
    pub cooldown_expiry: Option<i64>,
    pub tasked_time: Option<i64>,
}

impl From<&Session> for ManifestEntry {
    fn from(s: &Session) -> Self {
        Self {
            phone: s.phone.clone(),
            ip_addr: s.ip_addr.clone(),
            region: s.region.clone(),
            guid: s.guid.clone(),
            description: s.description.clone(),
            last_active: s.last_active,
            date_created: s.date_created,
            cooldown_expiry: s.cooldown_expiry,
            tasked_time: s.tasked_time,
        }
    }
}

/// Serializes a manifest (selection order preserved) as an indented JSON
/// array, matching `spec.md` §6's "Body: JSON array (indented, two-space)".
pub fn serialize_manifest(entries: &[ManifestEntry]) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
        &mut buf,
        serde_json::ser::PrettyFormatter::with_indent(b"  "),
    );
    serde::Serialize::serialize(entries, &mut ser)?;
    Ok(buf)
}

/// `published_at` is formatted as the ISO-8601 local timestamp of `now`
/// (`spec.md` §6 — note this is local time, not UTC, per the source's
/// behavior).
#[must_use]
pub fn published_at(now: i64) -> String {
    use chrono::{Local, TimeZone};
    Local
        .timestamp_opt(now, 0)
        .single()
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, false))
        .unwrap_or_default()
}
