//! Moderation verdicts and their JSON representation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Longest content, in bytes, echoed back in an error result.
///
/// Keeps error replies well under the bridge frame limit whatever a peer
/// sends.
pub const MAX_ECHOED_CONTENT: usize = 256;

/// Outcome class of a moderation check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationStatus {
    /// The content was a well-formed address and was classified.
    Success,
    /// The content failed validation.
    Error,
}

impl ModerationStatus {
    /// Lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Success => "success",
            ModerationStatus::Error => "error",
        }
    }
}

/// Verdict for one piece of content.
///
/// Serializes to the JSON body sent to peers and HTTP clients:
///
/// ```text
/// {"status":"success","address":"0x..","isBlacklisted":false,"timestamp":"..."}
/// {"status":"error","message":"..","address":"..","timestamp":"..."}
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModerationResult {
    /// Whether the content was classified.
    pub status: ModerationStatus,
    /// Content as received, before normalization. Capped for error results.
    pub address: String,
    /// Always `false` for error results.
    pub is_blacklisted: bool,
    /// Human readable failure reason, set only for error results.
    pub message: Option<String>,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}

impl ModerationResult {
    /// A classified address.
    pub fn success(address: impl Into<String>, is_blacklisted: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: ModerationStatus::Success,
            address: address.into(),
            is_blacklisted,
            message: None,
            timestamp,
        }
    }

    /// Content that could not be classified.
    ///
    /// The echoed content is cut to [`MAX_ECHOED_CONTENT`] bytes on a char
    /// boundary.
    pub fn error(
        address: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut address = address.into();
        if address.len() > MAX_ECHOED_CONTENT {
            let mut end = MAX_ECHOED_CONTENT;
            while !address.is_char_boundary(end) {
                end -= 1;
            }
            address.truncate(end);
        }

        Self {
            status: ModerationStatus::Error,
            address,
            is_blacklisted: false,
            message: Some(message.into()),
            timestamp,
        }
    }

    /// Whether the content passed validation.
    pub fn is_success(&self) -> bool {
        self.status == ModerationStatus::Success
    }

    /// Timestamp in RFC 3339 with millisecond precision and a `Z` suffix.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Render as a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

impl Serialize for ModerationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("status", self.status.as_str())?;
        match self.status {
            ModerationStatus::Success => {
                map.serialize_entry("address", &self.address)?;
                map.serialize_entry("isBlacklisted", &self.is_blacklisted)?;
            }
            ModerationStatus::Error => {
                map.serialize_entry("message", self.message.as_deref().unwrap_or_default())?;
                map.serialize_entry("address", &self.address)?;
            }
        }
        map.serialize_entry("timestamp", &self.timestamp_rfc3339())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_success_json_shape() {
        let result = ModerationResult::success("0xAB", true, fixed_time());
        let value: Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "success",
                "address": "0xAB",
                "isBlacklisted": true,
                "timestamp": "2024-05-01T12:30:00.000Z",
            })
        );
    }

    #[test]
    fn test_error_json_shape() {
        let result = ModerationResult::error("junk", "Invalid Ethereum address format", fixed_time());
        let value: Value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "error",
                "message": "Invalid Ethereum address format",
                "address": "junk",
                "timestamp": "2024-05-01T12:30:00.000Z",
            })
        );
        assert!(value.get("isBlacklisted").is_none());
    }

    #[test]
    fn test_error_echo_is_capped() {
        let result = ModerationResult::error("\"".repeat(600_000), "bad", fixed_time());
        assert_eq!(result.address.len(), MAX_ECHOED_CONTENT);

        // Multi-byte chars are never split.
        let result = ModerationResult::error("é".repeat(200), "bad", fixed_time());
        assert_eq!(result.address, "é".repeat(MAX_ECHOED_CONTENT / 2));

        let result = ModerationResult::error("short", "bad", fixed_time());
        assert_eq!(result.address, "short");
    }

    #[test]
    fn test_field_order() {
        let result = ModerationResult::success("0xAB", false, fixed_time());
        let json = result.to_json();
        let status = json.find("status").unwrap();
        let address = json.find("address").unwrap();
        let flagged = json.find("isBlacklisted").unwrap();
        assert!(status < address && address < flagged);
    }
}
