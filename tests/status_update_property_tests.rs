//! Property-based tests for the status update payload
//!
//! The payload is the contract with the persistence API. Its shape depends on
//! whether the decision is a final approval: scope, condition and EPA are only
//! carried on the final stage, and EPA is only ever the literal "y" or null.

use access_approval::{
    ApprovalGroup, RequestStatus, RoutingEngine,
    request::RequestEntity,
    transition::{Action, ActionInput, EpaFlag, StatusUpdate, apply},
};
use proptest::prelude::*;

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z0-9 /]{1,24}")
}

fn form_strategy() -> impl Strategy<Value = ActionInput> {
    (
        optional_text(),
        optional_text(),
        optional_text(),
        any::<bool>(),
    )
        .prop_map(|(comments, scope, conditions, epa_requested)| ActionInput {
            actor_id: "approver@example.com".into(),
            comments,
            scope,
            conditions,
            epa_requested,
        })
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Approve),
        Just(Action::Reject),
        Just(Action::Amend)
    ]
}

/// A request awaiting CSO sign off, or one sitting with the service product owner
fn request_strategy() -> impl Strategy<Value = (RequestEntity, Vec<ApprovalGroup>)> {
    prop::bool::ANY.prop_map(|at_final_stage| {
        if at_final_stage {
            (
                RequestEntity::new("request1payload", "requester@example.com")
                    .set_status(RequestStatus::Approved)
                    .set_current_group("CSO GUARDRAILS"),
                vec![ApprovalGroup::new(6, "IAM COMPLIANCE")],
            )
        } else {
            (
                RequestEntity::new("request1payload", "requester@example.com")
                    .set_current_group("Service Product Owner Team"),
                vec![ApprovalGroup::new(2, "PRODUCT ENABLEMENT")],
            )
        }
    })
}

proptest! {
    /// Property: encoding then decoding the payload is lossless, and EPA is
    /// never encoded as a boolean
    #[test]
    fn prop_payload_json_roundtrip(
        (entity, groups) in request_strategy(),
        action in action_strategy(),
        form in form_strategy(),
    ) {
        let decision = RoutingEngine::new().decide_for(&entity, &groups);
        let transition = apply(action, &entity, &decision, &form, false)
            .expect("actor holds the routed group");

        let json = transition.update.to_json().expect("payload encodes");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        prop_assert!(value["epa"].is_null() || value["epa"] == "y");
        prop_assert!(!value["epa"].is_boolean());

        let decoded = StatusUpdate::from_json(&json).expect("payload decodes");
        prop_assert_eq!(&decoded, &transition.update);
    }

    /// Property: the conditional fields are present only on the final stage
    #[test]
    fn prop_conditional_fields_follow_final_flag(
        (entity, groups) in request_strategy(),
        action in action_strategy(),
        form in form_strategy(),
    ) {
        let decision = RoutingEngine::new().decide_for(&entity, &groups);
        let update = apply(action, &entity, &decision, &form, false)
            .expect("actor holds the routed group")
            .update;

        if decision.is_final {
            prop_assert_eq!(&update.scope, &form.scope);
            prop_assert_eq!(&update.condition, &form.conditions);
            prop_assert_eq!(update.epa, EpaFlag::from_requested(form.epa_requested));
        } else {
            prop_assert_eq!(update.scope, None);
            prop_assert_eq!(update.condition, None);
            prop_assert_eq!(update.epa, None);
        }
    }
}

#[test]
fn cancel_payload_shape() {
    let entity = RequestEntity::new("request1payload", "requester@example.com")
        .set_current_group("Service Product Owner Team");
    let decision = RoutingEngine::new().decide_for(&entity, &[]);
    let update = apply(
        Action::Cancel,
        &entity,
        &decision,
        &ActionInput::new("requester@example.com"),
        true,
    )
    .unwrap()
    .update;

    let value: serde_json::Value = serde_json::from_str(&update.to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "status": "CANCELLED",
            "approvalComments": "Request Cancelled by Requestor",
            "actionBy": "requester@example.com",
            "approverGroupId": null,
            "condition": null,
            "epa": null,
            "scope": null,
        })
    );
}
