//! Approval routing and transition engine for access requests.
//!
//! Given a request and the approver groups of the logged in user, the engine
//! decides which group acts next ([`routing`]), applies approve, reject, amend
//! and cancel actions as new snapshots ([`transition`]), and projects a
//! progress view over the approval topology ([`tracker`]).

pub mod audit;
pub mod config;
pub mod error;
pub mod request;
pub mod routing;
pub mod service;
pub mod store;
pub mod topology;
pub mod tracker;
pub mod transition;
pub mod utils;

pub use config::EngineConfig;
pub use error::{AuditError, ConfigError, StoreError, TransitionError};
pub use request::{ApprovalGroup, RequestEntity, RequestStatus};
pub use routing::{ApprovalDecision, RoutingEngine, RuleId};
pub use service::{Actor, RequestService};
pub use store::{InMemoryRequestStore, RequestStore, SledRequestStore};
pub use topology::Topology;
pub use tracker::{WorkflowStep, project};
pub use transition::{Action, ActionInput, EpaFlag, StatusUpdate, apply};
