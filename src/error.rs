use std::path::PathBuf;

use crate::request::RequestStatus;
use crate::transition::Action;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{action:?} is not a legal action for a request in {status:?}")]
    InvalidTransition {
        action: Action,
        status: RequestStatus,
    },
    #[error("actor {actor} is not authorized to {action:?} at this stage")]
    UnauthorizedActor { action: Action, actor: String },
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("request {0} was not found")]
    NotFound(String),
    #[error("request {0} already exists")]
    AlreadyExists(String),
    #[error("stale write on {request_id}: expected revision {expected}, found {found}")]
    StaleWrite {
        request_id: String,
        expected: u64,
        found: u64,
    },
    #[error("failed to encode request snapshot: {0}")]
    Encode(String),
    #[error("failed to decode request snapshot: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error(transparent)]
    Sled(#[from] sled::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("topology validation failed: {0}")]
    Validation(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit record {index} belongs to request {found}, not {expected}")]
    ForeignRecord {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("audit record {index} does not reference the digest of its predecessor")]
    BrokenChain { index: usize },
    #[error("failed to encode audit record: {0}")]
    Encode(String),
}
