//! Conversions API payload and response types.
//!
//! Matchable user data (email, phone) is SHA-256 hashed after the
//! normalization the Graph API documents: trim + lowercase for emails,
//! digits only for phone numbers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapiUserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapiCustomData {
    pub currency: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_items: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapiEvent {
    pub event_name: String,
    pub event_time: i64,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source_url: Option<String>,
    pub action_source: String,
    pub user_data: CapiUserData,
    pub custom_data: CapiCustomData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapiRequest {
    pub data: Vec<CapiEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_event_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapiResponse {
    #[serde(default)]
    pub events_received: Option<i32>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
    #[serde(default)]
    pub error: Option<CapiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapiErrorBody {
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// Acknowledgement extracted from a successful Graph API response.
#[derive(Debug, Clone, PartialEq)]
pub struct CapiAck {
    pub events_received: Option<i32>,
    pub fbtrace_id: Option<String>,
}

fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize + hash an email for the `em` user-data field.
pub fn hash_email(email: &str) -> String {
    sha256_hex(&email.trim().to_lowercase())
}

/// Normalize + hash a phone number for the `ph` user-data field: digits
/// only, no leading zeros stripped (Korean numbers keep their 0 prefix when
/// no country code is supplied).
pub fn hash_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    sha256_hex(&digits)
}
