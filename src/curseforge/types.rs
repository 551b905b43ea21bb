//! CurseForge API response shapes.
//!
//! Only the fields the bot reads are declared; everything else in the
//! payload is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Every CurseForge response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiFile {
    pub id: u64,
    pub display_name: String,
    pub file_name: String,
    pub file_date: DateTime<Utc>,
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMod {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub logo: Option<ApiLogo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLogo {
    pub url: Option<String>,
}
