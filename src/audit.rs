//! Audit records for applied transitions
use chrono::Utc;

use crate::error::AuditError;
use crate::request::{RequestStatus, TimeStamp};
use crate::transition::{Action, Transition};

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct AuditRecord {
    #[n(0)]
    pub audit_id: String, // bech32, `audit1...`
    #[n(1)]
    pub request_id: String,
    #[n(2)]
    pub actor: String,
    #[n(3)]
    pub action: Action,
    #[n(4)]
    pub from: RequestStatus,
    #[n(5)]
    pub to: RequestStatus,
    #[n(6)]
    pub approver_group_id: Option<i64>,
    #[n(7)]
    pub comments: Option<String>,
    #[n(8)]
    pub timestamp: TimeStamp<Utc>,
    #[n(9)]
    pub prev_hash: Option<String>, // digest of the previous record for this request
}

impl AuditRecord {
    pub fn from_transition(
        audit_id: String,
        transition: &Transition,
        prev_hash: Option<String>,
    ) -> Self {
        Self {
            audit_id,
            request_id: transition.entity.request_id.clone(),
            actor: transition.update.action_by.clone(),
            action: transition.action,
            from: transition.from,
            to: transition.update.status,
            approver_group_id: transition.update.approver_group_id,
            comments: transition.update.approval_comments.clone(),
            timestamp: TimeStamp::new(),
            prev_hash,
        }
    }

    pub fn build(&self) -> Result<(String, Vec<u8>), AuditError> {
        let cbor = minicbor::to_vec(self).map_err(|e| AuditError::Encode(e.to_string()))?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

/// Every transition recorded against one request, oldest first.
#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct AuditTrail {
    #[n(0)]
    pub request_id: String,
    #[n(1)]
    pub records: Vec<AuditRecord>,
}

impl AuditTrail {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            records: vec![],
        }
    }

    pub fn head_hash(&self) -> Result<Option<String>, AuditError> {
        match self.records.last() {
            Some(record) => Ok(Some(record.build()?.0)),
            None => Ok(None),
        }
    }

    /// Appends a record for `transition`, linked to the current head.
    pub fn record(
        &mut self,
        audit_id: String,
        transition: &Transition,
    ) -> Result<&AuditRecord, AuditError> {
        let prev_hash = self.head_hash()?;
        self.records
            .push(AuditRecord::from_transition(audit_id, transition, prev_hash));
        let index = self.records.len() - 1;
        Ok(&self.records[index])
    }

    pub fn verify(&self) -> Result<(), AuditError> {
        let mut expected_prev: Option<String> = None;
        for (index, record) in self.records.iter().enumerate() {
            if record.request_id != self.request_id {
                return Err(AuditError::ForeignRecord {
                    index,
                    expected: self.request_id.clone(),
                    found: record.request_id.clone(),
                });
            }
            if record.prev_hash != expected_prev {
                return Err(AuditError::BrokenChain { index });
            }
            expected_prev = Some(record.build()?.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ApprovalGroup, RequestEntity};
    use crate::routing::RoutingEngine;
    use crate::transition::{ActionInput, apply};

    fn approve_then_cancel() -> (Transition, Transition) {
        let entity = RequestEntity::new("request1audit", "requester@example.com")
            .set_current_group("Service Product Owner Team");
        let decision = RoutingEngine::new().decide_for(
            &entity,
            &[ApprovalGroup::new(2, "PRODUCT ENABLEMENT")],
        );
        let approved = apply(
            Action::Approve,
            &entity,
            &decision,
            &ActionInput::new("enablement@example.com"),
            false,
        )
        .unwrap();
        let cancelled = apply(
            Action::Cancel,
            &approved.entity,
            &decision,
            &ActionInput::new("requester@example.com"),
            true,
        )
        .unwrap();
        (approved, cancelled)
    }

    #[test]
    fn records_are_chained() {
        let (approved, cancelled) = approve_then_cancel();
        let mut trail = AuditTrail::new("request1audit".into());

        trail.record("audit1a".into(), &approved).unwrap();
        trail.record("audit1b".into(), &cancelled).unwrap();

        assert_eq!(trail.records[0].prev_hash, None);
        assert_eq!(
            trail.records[1].prev_hash,
            Some(trail.records[0].build().unwrap().0)
        );
        assert_eq!(trail.records[1].from, RequestStatus::Approved);
        assert_eq!(trail.records[1].to, RequestStatus::Cancelled);
        trail.verify().unwrap();
    }

    #[test]
    fn tampering_breaks_the_chain() {
        let (approved, cancelled) = approve_then_cancel();
        let mut trail = AuditTrail::new("request1audit".into());
        trail.record("audit1a".into(), &approved).unwrap();
        trail.record("audit1b".into(), &cancelled).unwrap();

        trail.records[0].actor = "mallory@example.com".into();

        assert_eq!(trail.verify(), Err(AuditError::BrokenChain { index: 1 }));
    }

    #[test]
    fn trail_encoding() {
        let (approved, _) = approve_then_cancel();
        let mut trail = AuditTrail::new("request1audit".into());
        trail.record("audit1a".into(), &approved).unwrap();

        let cbor = minicbor::to_vec(&trail).unwrap();
        let decoded: AuditTrail = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, trail);
    }
}
