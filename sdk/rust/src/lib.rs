//! Client for a minsig signalling broker.
//!
//! ```rust,ignore
//! let client = SignalClient::new("https://signal.example.org");
//! let remote = client
//!     .dial("shared-slot", my_offer, |their_offer| async move {
//!         make_answer_for(their_offer).await
//!     })
//!     .await?;
//! ```

use std::future::Future;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session description as exchanged with the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "answer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn is_offer(&self) -> bool {
        self.kind == "offer"
    }

    pub fn is_answer(&self) -> bool {
        self.kind == "answer"
    }
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("broker returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("broker returned an unparseable description: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid broker url: {0}")]
    InvalidUrl(String),

    #[error("expected an {expected} from the broker, got {got:?}")]
    Unexpected { expected: &'static str, got: String },
}

/// What the broker made of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A description came back: the answer to our offer, or the offer that
    /// beat ours to the slot.
    Description(SessionDescription),
    /// Our answer was accepted.
    Ack,
}

/// Which side of the race we ended up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialed {
    /// Our offer held the slot; this is the peer's answer.
    Answered(SessionDescription),
    /// The peer's offer held the slot; we answered it.
    Answering {
        offer: SessionDescription,
        answer: SessionDescription,
    },
}

pub struct SignalClient {
    client: Client,
    broker_url: String,
}

impl SignalClient {
    pub fn new(broker_url: &str) -> Self {
        Self::with_client(Client::new(), broker_url)
    }

    pub fn with_client(client: Client, broker_url: &str) -> Self {
        Self {
            client,
            broker_url: broker_url.trim_end_matches('/').to_string(),
        }
    }

    /// The slot name becomes one percent-encoded path segment, so `#`, `?`
    /// and `/` inside it stay part of the name.
    fn slot_url(&self, slot: &str) -> Result<Url, SignalError> {
        let mut url =
            Url::parse(&self.broker_url).map_err(|e| SignalError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SignalError::InvalidUrl(self.broker_url.clone()))?
            .pop_if_empty()
            .push(slot.trim_start_matches('/'));
        Ok(url)
    }

    /// Post one description to a slot.
    ///
    /// For a winning offer this does not return until the answer arrives.
    pub async fn post(&self, slot: &str, desc: &SessionDescription) -> Result<Reply, SignalError> {
        let resp = self
            .client
            .post(self.slot_url(slot)?)
            .body(serde_json::to_string(desc)?)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(SignalError::Status { status, body: text });
        }
        if text.trim().is_empty() {
            return Ok(Reply::Ack);
        }
        Ok(Reply::Description(serde_json::from_str(&text)?))
    }

    /// Race the peer for `slot`.
    ///
    /// Posts `offer`. If an answer comes back we held the slot. If an offer
    /// comes back the peer got there first: `make_answer` turns their offer
    /// into our answer, which is posted to the same slot.
    pub async fn dial<F, Fut>(
        &self,
        slot: &str,
        offer: SessionDescription,
        make_answer: F,
    ) -> Result<Dialed, SignalError>
    where
        F: FnOnce(SessionDescription) -> Fut,
        Fut: Future<Output = SessionDescription>,
    {
        let remote = match self.post(slot, &offer).await? {
            Reply::Description(desc) => desc,
            Reply::Ack => {
                return Err(SignalError::Unexpected {
                    expected: "offer or answer",
                    got: "empty acknowledgement".to_string(),
                })
            }
        };

        if remote.is_answer() {
            return Ok(Dialed::Answered(remote));
        }
        if !remote.is_offer() {
            return Err(SignalError::Unexpected {
                expected: "offer or answer",
                got: remote.kind,
            });
        }

        let answer = make_answer(remote.clone()).await;
        match self.post(slot, &answer).await? {
            Reply::Ack => Ok(Dialed::Answering {
                offer: remote,
                answer,
            }),
            Reply::Description(desc) => Err(SignalError::Unexpected {
                expected: "acknowledgement",
                got: desc.kind,
            }),
        }
    }
}
