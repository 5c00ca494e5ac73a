//! Request entity, status and approval group types
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
#[cbor(index_only)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[n(0)]
    Submitted,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
    #[n(3)]
    Open, // returned to the requester for amendment
    #[n(4)]
    Completed,
    #[n(5)]
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        RequestStatus::Submitted,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Open,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Rejected | RequestStatus::Cancelled
        )
    }

    /// Statuses in which an approver group still has to act.
    pub fn awaits_approval(&self) -> bool {
        matches!(self, RequestStatus::Submitted | RequestStatus::Approved)
    }

    /// APPROVED and COMPLETED both count as a settled approval when projecting steps.
    pub fn is_approved_like(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Submitted => "SUBMITTED",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Open => "OPEN",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An approver group as returned by the group mapping lookup for the logged in actor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApprovalGroup {
    #[serde(alias = "APPROVAL_GROUP_ID")]
    pub id: i64,
    #[serde(alias = "USER_GROUP_NAME")]
    pub name: String,
}

impl ApprovalGroup {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// Snapshot of a request as held by the persistence layer. Never mutated in
// place, every transition produces a new value.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RequestEntity {
    #[n(0)]
    pub request_id: String,
    #[n(1)]
    pub status: RequestStatus,
    #[n(2)]
    pub current_approval_group_name: String, // empty for terminal or requester owned states
    #[n(3)]
    pub requestor_email_id: String,
    #[n(4)]
    pub business_content: String, // opaque JSON text
    #[n(5)]
    pub comments: Option<String>,
    #[n(6)]
    pub scope: Option<String>,
    #[n(7)]
    pub conditions: Option<String>,
    #[n(8)]
    pub epa: bool,
    #[n(9)]
    pub revision: u64,
    #[n(10)]
    pub last_action_by: Option<String>,
}

impl RequestEntity {
    /// A freshly submitted request, as produced by the creation flow.
    pub fn new(request_id: impl Into<String>, requestor_email_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: RequestStatus::Submitted,
            current_approval_group_name: String::new(),
            requestor_email_id: requestor_email_id.into(),
            business_content: "{}".into(),
            comments: None,
            scope: None,
            conditions: None,
            epa: false,
            revision: 0,
            last_action_by: None,
        }
    }
    pub fn set_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }
    pub fn set_current_group(mut self, name: impl Into<String>) -> Self {
        self.current_approval_group_name = name.into();
        self
    }
    pub fn set_business_content(mut self, content: impl Into<String>) -> Self {
        self.business_content = content.into();
        self
    }
    pub fn set_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Parsed business content. Malformed content is reported, not repaired.
    pub fn business_content_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.business_content)
    }

    pub fn is_requestor(&self, actor_email: &str) -> bool {
        !self.requestor_email_id.is_empty() && self.requestor_email_id == actor_email
    }

    /// Encodes the snapshot to CBOR and returns it with its sha256 digest.
    pub fn build(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
