//! Progress view over the approval topology.
use serde::Serialize;

use crate::request::RequestStatus;
use crate::topology::Topology;
use crate::utils::find_fragment;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub step_label: String,
    pub approval_group_names_list: Vec<String>,
    pub step_status_list: Vec<RequestStatus>,
    pub stage_approved: bool,
    pub stage_rejected: bool,
}

/// Recomputes every step from scratch. The topology is only read.
pub fn project(
    topology: &Topology,
    status: RequestStatus,
    current_group_name: &str,
) -> Vec<WorkflowStep> {
    project_with(topology, status, current_group_name, true)
}

pub fn project_with(
    topology: &Topology,
    status: RequestStatus,
    current_group_name: &str,
    case_sensitive: bool,
) -> Vec<WorkflowStep> {
    topology
        .stages()
        .iter()
        .map(|stage| {
            let (approved, rejected) = if !stage.has_group_qualifier() {
                (stage.statuses.contains(&status), false)
            } else {
                let group_matches = !current_group_name.is_empty()
                    && stage
                        .groups
                        .iter()
                        .any(|g| find_fragment(current_group_name, g, case_sensitive).is_some());
                (
                    group_matches && status.is_approved_like(),
                    group_matches && status == RequestStatus::Rejected,
                )
            };

            WorkflowStep {
                step_label: stage.label.clone(),
                approval_group_names_list: stage.groups.clone(),
                step_status_list: stage.statuses.clone(),
                stage_approved: approved,
                stage_rejected: rejected,
            }
        })
        .collect()
}
