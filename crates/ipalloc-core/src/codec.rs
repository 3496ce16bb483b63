// # Persistence Codec
//
// Whole-index encoding for the on-disk record.
//
// ## Format
//
// ```json
// {
//   "version": "1.0",
//   "saved_at": "2026-10-19T12:00:00Z",
//   "ip_to_device": { "1.2.3.4": "device1" },
//   "device_to_ips": { "device1": ["1.2.3.4"] }
// }
// ```
//
// Both maps are ordered, so the same index and timestamp always produce the
// same bytes. `version` and `saved_at` are optional on read; records that
// carry only the two maps load as-is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};
use crate::index::MappingIndex;

/// Record format version
/// Used for future migration if format changes
pub const RECORD_VERSION: &str = "1.0";

/// Serializable record format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    ip_to_device: BTreeMap<String, String>,
    device_to_ips: BTreeMap<String, Vec<String>>,
}

/// Encode the full index, stamped with `saved_at`
pub fn encode(index: &MappingIndex, saved_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let record = PersistedRecord {
        version: Some(RECORD_VERSION.to_string()),
        saved_at: Some(saved_at),
        ip_to_device: index.forward().clone(),
        device_to_ips: index.reverse().clone(),
    };

    Ok(serde_json::to_vec_pretty(&record)?)
}

/// Decode a record produced by [`encode`]
///
/// Fails on anything that is not a record document, and on records whose
/// forward and reverse maps disagree.
pub fn decode(bytes: &[u8]) -> std::result::Result<MappingIndex, DecodeError> {
    let record: PersistedRecord = serde_json::from_slice(bytes)?;

    if let Some(version) = record.version.as_deref()
        && version != RECORD_VERSION
    {
        tracing::warn!(
            "Record version mismatch: expected {}, got {}. Attempting to load anyway.",
            RECORD_VERSION,
            version
        );
    }

    MappingIndex::from_parts(record.ip_to_device, record.device_to_ips)
}
