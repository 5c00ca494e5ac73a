//! Service layer API for request workflow operations
use anyhow::Context;
use tracing::{info, warn};

use crate::audit::AuditTrail;
use crate::config::EngineConfig;
use crate::error::{StoreError, TransitionError};
use crate::request::{ApprovalGroup, RequestEntity};
use crate::routing::{ApprovalDecision, RoutingEngine};
use crate::store::RequestStore;
use crate::topology::Topology;
use crate::tracker::{WorkflowStep, project_with};
use crate::transition::{self, Action, ActionInput, ActionSet};
use crate::utils;

/// The logged in user as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub groups: Vec<ApprovalGroup>, // group mapping for this user
    pub approve_capability: bool,   // button level access from the access model
}

impl Actor {
    pub fn new(email: impl Into<String>, groups: Vec<ApprovalGroup>) -> Self {
        Self {
            email: email.into(),
            groups,
            approve_capability: true,
        }
    }
    pub fn without_approve_capability(mut self) -> Self {
        self.approve_capability = false;
        self
    }
}

pub struct RequestService<S> {
    store: S,
    routing: RoutingEngine,
    topology: Topology,
    case_sensitive: bool,
}

impl<S: RequestStore> RequestService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            routing: RoutingEngine::new(),
            topology: Topology::builtin(),
            case_sensitive: true,
        }
    }

    pub fn with_config(store: S, config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            routing: RoutingEngine::with_config(config),
            topology: config.topology().context("loading approval topology")?,
            case_sensitive: config.matching.case_sensitive,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a freshly submitted request held by `initial_group`.
    pub fn submit_request(
        &self,
        requestor_email: &str,
        initial_group: &str,
        business_content: &str,
    ) -> anyhow::Result<RequestEntity> {
        let entity = RequestEntity::new(utils::new_request_id()?, requestor_email)
            .set_current_group(initial_group)
            .set_business_content(business_content);

        self.store.insert(&entity)?;
        info!(request_id = %entity.request_id, "request submitted");

        Ok(entity)
    }

    pub fn load(&self, request_id: &str) -> anyhow::Result<RequestEntity> {
        Ok(self.store.load(request_id)?)
    }

    pub fn decide(&self, request_id: &str, actor: &Actor) -> anyhow::Result<ApprovalDecision> {
        let entity = self.store.load(request_id)?;
        Ok(self.routing.decide_for(&entity, &actor.groups))
    }

    pub fn available_actions(&self, request_id: &str, actor: &Actor) -> anyhow::Result<ActionSet> {
        let entity = self.store.load(request_id)?;
        let decision = self.routing.decide_for(&entity, &actor.groups);

        Ok(transition::available_actions(
            &entity,
            &decision,
            &actor.email,
            actor.approve_capability,
        ))
    }

    /// Applies `action` on behalf of `actor`.
    ///
    /// `seen_revision` is the revision of the snapshot the actor was looking
    /// at. Routing and legality are re-evaluated against the latest stored
    /// snapshot, and the write only lands if nobody else changed the request
    /// in between. The actor id on `form` is always taken from `actor`.
    pub fn act(
        &self,
        request_id: &str,
        seen_revision: u64,
        action: Action,
        actor: &Actor,
        form: ActionInput,
    ) -> anyhow::Result<RequestEntity> {
        let latest = self.store.load(request_id)?;
        if latest.revision != seen_revision {
            warn!(request_id, seen_revision, latest = latest.revision, "acting on a stale snapshot");
            return Err(StoreError::StaleWrite {
                request_id: request_id.to_string(),
                expected: seen_revision,
                found: latest.revision,
            }
            .into());
        }

        let decision = self.routing.decide_for(&latest, &actor.groups);
        let input = ActionInput {
            actor_id: actor.email.clone(),
            ..form
        };
        let requester_initiated = latest.is_requestor(&actor.email);
        let transition =
            transition::apply(action, &latest, &decision, &input, requester_initiated)?;

        if action != Action::Cancel && !actor.approve_capability {
            return Err(TransitionError::UnauthorizedActor {
                action,
                actor: actor.email.clone(),
            }
            .into());
        }

        let mut trail = self.store.load_audit(request_id)?;
        trail.record(utils::new_audit_id()?, &transition)?;

        self.store
            .compare_and_set(latest.revision, &transition.entity, &trail)
            .inspect_err(|e| warn!(request_id, error = %e, "request write rejected"))?;

        info!(
            request_id,
            action = ?action,
            from = %transition.from,
            to = %transition.entity.status,
            actor = %actor.email,
            approver_group_id = ?transition.update.approver_group_id,
            "request transition persisted"
        );

        Ok(transition.entity)
    }

    pub fn progress(&self, request_id: &str) -> anyhow::Result<Vec<WorkflowStep>> {
        let entity = self.store.load(request_id)?;

        Ok(project_with(
            &self.topology,
            entity.status,
            &entity.current_approval_group_name,
            self.case_sensitive,
        ))
    }

    pub fn audit_trail(&self, request_id: &str) -> anyhow::Result<AuditTrail> {
        let trail = self.store.load_audit(request_id)?;
        trail.verify()?;
        Ok(trail)
    }
}
