//! Transition engine: applies an approver or requester action to a request
//! snapshot and produces the next snapshot plus the status update payload
//! handed to the persistence layer.
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::request::{RequestEntity, RequestStatus};
use crate::routing::ApprovalDecision;

pub const CANCEL_COMMENT: &str = "Request Cancelled by Requestor";

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
#[cbor(index_only)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[n(0)]
    Approve,
    #[n(1)]
    Reject,
    #[n(2)]
    Amend,
    #[n(3)]
    Cancel,
}

impl Action {
    pub fn dialog_title(&self) -> &'static str {
        match self {
            Action::Approve => "Approve Request",
            Action::Reject => "Reject Request",
            Action::Amend => "Amend Request",
            Action::Cancel => "Cancel Request",
        }
    }

    fn is_approver_action(&self) -> bool {
        !matches!(self, Action::Cancel)
    }
}

/// EPA request marker. Only ever travels as the literal `"y"` or as `null`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpaFlag {
    #[serde(rename = "y")]
    Yes,
}

impl EpaFlag {
    pub fn from_requested(requested: bool) -> Option<Self> {
        requested.then_some(EpaFlag::Yes)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: RequestStatus,
    pub approval_comments: Option<String>,
    pub action_by: String,
    pub approver_group_id: Option<i64>,
    pub condition: Option<String>,
    pub epa: Option<EpaFlag>,
    pub scope: Option<String>,
}

impl StatusUpdate {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// What the acting user filled in on the action form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInput {
    pub actor_id: String,
    pub comments: Option<String>,
    pub scope: Option<String>,
    pub conditions: Option<String>,
    pub epa_requested: bool,
}

impl ActionInput {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            ..Self::default()
        }
    }
    pub fn set_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
    pub fn set_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
    pub fn set_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }
    pub fn set_epa_requested(mut self, requested: bool) -> Self {
        self.epa_requested = requested;
        self
    }
}

/// Scope, condition and EPA are only captured on the final approval stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalFields {
    pub scope: Option<String>,
    pub condition: Option<String>,
    pub epa: Option<EpaFlag>,
}

impl ConditionalFields {
    pub fn build(completed_flag: bool, input: &ActionInput) -> Self {
        if !completed_flag {
            return Self::default();
        }
        Self {
            scope: input.scope.clone(),
            condition: input.conditions.clone(),
            epa: EpaFlag::from_requested(input.epa_requested),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: Action,
    pub from: RequestStatus,
    pub entity: RequestEntity,
    pub update: StatusUpdate,
}

pub fn apply(
    action: Action,
    entity: &RequestEntity,
    decision: &ApprovalDecision,
    input: &ActionInput,
    requester_initiated: bool,
) -> Result<Transition, TransitionError> {
    if action.is_approver_action() {
        // a decision routed for another snapshot must not move this one
        if !entity.status.awaits_approval() || !decision.applies_to(entity) {
            return Err(TransitionError::InvalidTransition {
                action,
                status: entity.status,
            });
        }
        if !decision.actor_may_act {
            return Err(TransitionError::UnauthorizedActor {
                action,
                actor: input.actor_id.clone(),
            });
        }
    }

    let acting_group = decision.next_approval_group_name.clone().unwrap_or_default();
    let (status, current_group) = match action {
        Action::Cancel => return cancel(entity, input, requester_initiated),
        Action::Approve if decision.is_final => (RequestStatus::Completed, acting_group),
        Action::Approve => (RequestStatus::Approved, acting_group),
        Action::Reject => (RequestStatus::Rejected, acting_group),
        // back with the requester, no approver group holds it
        Action::Amend => (RequestStatus::Open, String::new()),
    };

    let fields = ConditionalFields::build(decision.is_final, input);
    let update = StatusUpdate {
        status,
        approval_comments: input.comments.clone(),
        action_by: input.actor_id.clone(),
        approver_group_id: decision.next_approval_group_id,
        condition: fields.condition.clone(),
        epa: fields.epa,
        scope: fields.scope.clone(),
    };

    let mut next = next_snapshot(entity, status, current_group, input);
    if decision.is_final {
        next.scope = fields.scope;
        next.conditions = fields.condition;
        next.epa = fields.epa.is_some();
    }

    Ok(Transition {
        action,
        from: entity.status,
        entity: next,
        update,
    })
}

fn cancel(
    entity: &RequestEntity,
    input: &ActionInput,
    requester_initiated: bool,
) -> Result<Transition, TransitionError> {
    if matches!(
        entity.status,
        RequestStatus::Cancelled | RequestStatus::Completed
    ) {
        return Err(TransitionError::InvalidTransition {
            action: Action::Cancel,
            status: entity.status,
        });
    }
    if !requester_initiated {
        return Err(TransitionError::UnauthorizedActor {
            action: Action::Cancel,
            actor: input.actor_id.clone(),
        });
    }

    let update = StatusUpdate {
        status: RequestStatus::Cancelled,
        approval_comments: Some(CANCEL_COMMENT.into()),
        action_by: input.actor_id.clone(),
        approver_group_id: None,
        condition: None,
        epa: None,
        scope: None,
    };
    let mut next = next_snapshot(entity, RequestStatus::Cancelled, String::new(), input);
    next.comments = Some(CANCEL_COMMENT.into());

    Ok(Transition {
        action: Action::Cancel,
        from: entity.status,
        entity: next,
        update,
    })
}

fn next_snapshot(
    entity: &RequestEntity,
    status: RequestStatus,
    current_group: String,
    input: &ActionInput,
) -> RequestEntity {
    RequestEntity {
        status,
        current_approval_group_name: current_group,
        comments: input.comments.clone().or_else(|| entity.comments.clone()),
        revision: entity.revision + 1,
        last_action_by: Some(input.actor_id.clone()),
        ..entity.clone()
    }
}

/// The actions offered to an actor, plus whether the requester may edit.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionSet {
    pub actions: Vec<Action>,
    pub can_edit: bool,
}

impl ActionSet {
    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// `approve_capability` is the button level permission from the access model.
pub fn available_actions(
    entity: &RequestEntity,
    decision: &ApprovalDecision,
    actor_email: &str,
    approve_capability: bool,
) -> ActionSet {
    let mut actions = vec![];
    if entity.status.awaits_approval() && decision.actor_may_act && approve_capability {
        actions.extend([Action::Approve, Action::Reject, Action::Amend]);
    }

    let is_requestor = entity.is_requestor(actor_email);
    if is_requestor
        && !matches!(
            entity.status,
            RequestStatus::Cancelled | RequestStatus::Completed
        )
    {
        actions.push(Action::Cancel);
    }

    ActionSet {
        actions,
        can_edit: is_requestor && entity.status == RequestStatus::Open,
    }
}
