//! Signaling message types.

use serde::{Deserialize, Deserializer, Serialize};

/// Role of a session description within a rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Opens a rendezvous, or loses the race to an existing one.
    Offer,
    /// Completes a rendezvous.
    Answer,
    /// Anything else (`pranswer`, `rollback`, typos). Always rejected.
    Other,
}

impl<'de> Deserialize<'de> for SdpType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "offer" => SdpType::Offer,
            "answer" => SdpType::Answer,
            _ => SdpType::Other,
        })
    }
}

/// A session description as posted by a client.
///
/// The `sdp` payload is opaque and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// Decode a request body. Content type is not checked.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
