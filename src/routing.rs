//! Routing engine: which approver group acts next and whether the current
//! actor may act.
//!
//! Routing is an ordered rule table evaluated top-down, first match wins. A
//! row matches on the request status and on a fragment of the current
//! approval group name, then resolves its target fragments against the
//! actor's candidate groups.
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{EngineConfig, MatchingConfig};
use crate::request::{ApprovalGroup, RequestEntity, RequestStatus};
use crate::topology::{
    CSO_GUARDRAILS, IAM_COMPLIANCE, PRODUCT_ENABLEMENT, PRODUCT_ENABLEMENT_LEGACY,
    SERVICE_PRODUCT_OWNER, TAM_COMPLIANCE,
};
use crate::utils::find_fragment;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// REJECTED, OPEN, COMPLETED or CANCELLED: nobody approves.
    NotAwaitingApproval,
    /// SUBMITTED at the service product owner, enablement acts next.
    OwnerToEnablement,
    /// Owner or enablement approved, TAM compliance or CSO guardrails act next.
    ComplianceFanOut,
    /// IAM compliance approved, CSO guardrails give the final approval.
    IamToGuardrailsFinal,
    /// CSO guardrails approved, IAM compliance gives the final approval.
    GuardrailsToIamFinal,
    NoMatch,
}

/// Fragment that must occur in the current approval group name, at or after `min_offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPredicate {
    pub fragment: &'static str,
    pub min_offset: usize,
}

impl GroupPredicate {
    pub fn contains(fragment: &'static str) -> Self {
        Self {
            fragment,
            min_offset: 0,
        }
    }

    fn matches(&self, group_name: &str, case_sensitive: bool) -> bool {
        find_fragment(group_name, self.fragment, case_sensitive)
            .is_some_and(|offset| offset >= self.min_offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub id: RuleId,
    pub status: RequestStatus,
    pub current_group: Vec<GroupPredicate>, // any of
    pub targets: Vec<&'static str>,         // resolved in order, last match wins
    pub final_approvable: bool,
}

/// Rule rows two to five. Row one (status gate) and row six (fallthrough)
/// are structural and live in [`RoutingEngine::decide`].
pub fn rule_table(matching: &MatchingConfig) -> Vec<RoutingRule> {
    vec![
        RoutingRule {
            id: RuleId::OwnerToEnablement,
            status: RequestStatus::Submitted,
            current_group: vec![GroupPredicate::contains(SERVICE_PRODUCT_OWNER)],
            targets: vec![PRODUCT_ENABLEMENT],
            final_approvable: false,
        },
        RoutingRule {
            id: RuleId::ComplianceFanOut,
            status: RequestStatus::Approved,
            current_group: vec![
                GroupPredicate::contains(SERVICE_PRODUCT_OWNER),
                GroupPredicate::contains(PRODUCT_ENABLEMENT_LEGACY),
            ],
            targets: vec![TAM_COMPLIANCE, CSO_GUARDRAILS],
            final_approvable: false,
        },
        RoutingRule {
            id: RuleId::IamToGuardrailsFinal,
            status: RequestStatus::Approved,
            current_group: vec![GroupPredicate {
                fragment: IAM_COMPLIANCE,
                min_offset: matching.iam_min_offset,
            }],
            targets: vec![CSO_GUARDRAILS],
            final_approvable: true,
        },
        RoutingRule {
            id: RuleId::GuardrailsToIamFinal,
            status: RequestStatus::Approved,
            current_group: vec![GroupPredicate::contains(CSO_GUARDRAILS)],
            targets: vec![IAM_COMPLIANCE],
            final_approvable: true,
        },
    ]
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub next_approval_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_approval_group_name: Option<String>,
    pub actor_may_act: bool,
    pub is_final: bool,
    /// Every group that may act next, in evaluation order. The last entry is
    /// the one reported in `next_approval_group_id`.
    pub alternatives: Vec<i64>,
    pub rule: RuleId,
    /// Target fragment(s) that no candidate group matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<String>,
    /// Status and current group the decision was computed for.
    pub status: RequestStatus,
    pub current_approval_group_name: String,
}

impl ApprovalDecision {
    fn closed(rule: RuleId, is_final: bool, status: RequestStatus, current_group_name: &str) -> Self {
        Self {
            next_approval_group_id: None,
            next_approval_group_name: None,
            actor_may_act: false,
            is_final,
            alternatives: vec![],
            rule,
            unresolved: None,
            status,
            current_approval_group_name: current_group_name.to_string(),
        }
    }

    /// Whether this decision was computed from the snapshot `entity`.
    pub fn applies_to(&self, entity: &RequestEntity) -> bool {
        self.status == entity.status
            && self.current_approval_group_name == entity.current_approval_group_name
    }

    /// The group handed over to on approval, when one was resolved.
    pub fn next_group(&self) -> Option<ApprovalGroup> {
        match (self.next_approval_group_id, &self.next_approval_group_name) {
            (Some(id), Some(name)) => Some(ApprovalGroup::new(id, name.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingEngine {
    case_sensitive: bool,
    rules: Vec<RoutingRule>,
}

impl RoutingEngine {
    pub fn new() -> Self {
        Self::with_matching(&MatchingConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_matching(&config.matching)
    }

    pub fn with_matching(matching: &MatchingConfig) -> Self {
        Self {
            case_sensitive: matching.case_sensitive,
            rules: rule_table(matching),
        }
    }

    pub fn decide(
        &self,
        status: RequestStatus,
        current_group_name: &str,
        candidate_groups: &[ApprovalGroup],
    ) -> ApprovalDecision {
        if !status.awaits_approval() {
            return ApprovalDecision::closed(
                RuleId::NotAwaitingApproval,
                status != RequestStatus::Open,
                status,
                current_group_name,
            );
        }

        let Some(rule) = self.rules.iter().find(|rule| {
            rule.status == status
                && rule
                    .current_group
                    .iter()
                    .any(|p| p.matches(current_group_name, self.case_sensitive))
        }) else {
            debug!(%status, current_group_name, "no routing rule matched");
            return ApprovalDecision::closed(RuleId::NoMatch, false, status, current_group_name);
        };

        let mut alternatives = vec![];
        let mut next: Option<&ApprovalGroup> = None;
        for fragment in &rule.targets {
            for group in candidate_groups {
                if find_fragment(&group.name, fragment, self.case_sensitive).is_some() {
                    alternatives.push(group.id);
                    next = Some(group);
                }
            }
        }

        let Some(next) = next else {
            let unresolved = rule.targets.join(" | ");
            warn!(
                rule = ?rule.id,
                %status,
                current_group_name,
                unresolved = %unresolved,
                "no candidate group matches the routing target"
            );
            return ApprovalDecision {
                unresolved: Some(unresolved),
                ..ApprovalDecision::closed(rule.id, false, status, current_group_name)
            };
        };

        debug!(rule = ?rule.id, %status, next_group = next.id, "routing rule matched");
        ApprovalDecision {
            next_approval_group_id: Some(next.id),
            next_approval_group_name: Some(next.name.clone()),
            actor_may_act: true,
            is_final: rule.final_approvable,
            alternatives,
            rule: rule.id,
            unresolved: None,
            status,
            current_approval_group_name: current_group_name.to_string(),
        }
    }

    pub fn decide_for(
        &self,
        entity: &RequestEntity,
        candidate_groups: &[ApprovalGroup],
    ) -> ApprovalDecision {
        self.decide(
            entity.status,
            &entity.current_approval_group_name,
            candidate_groups,
        )
    }
}

impl Default for RoutingEngine {
    fn default() -> Self {
        Self::new()
    }
}
