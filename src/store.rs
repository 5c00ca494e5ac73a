//! Persistence seam for request snapshots.
//!
//! The engine never writes anything itself. A store keeps the latest snapshot
//! of each request together with its audit trail, and refuses writes that were
//! computed from an outdated snapshot.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sled::transaction::{ConflictableTransactionError, TransactionError};

use crate::audit::AuditTrail;
use crate::error::StoreError;
use crate::request::RequestEntity;

pub trait RequestStore {
    /// Stores a newly created request. Fails if the id is taken.
    fn insert(&self, entity: &RequestEntity) -> Result<(), StoreError>;

    fn load(&self, request_id: &str) -> Result<RequestEntity, StoreError>;

    /// The audit trail of a request, empty if nothing was recorded yet.
    fn load_audit(&self, request_id: &str) -> Result<AuditTrail, StoreError>;

    /// Replaces the stored snapshot and audit trail, but only while the stored
    /// snapshot still carries `expected_revision`.
    fn compare_and_set(
        &self,
        expected_revision: u64,
        next: &RequestEntity,
        trail: &AuditTrail,
    ) -> Result<(), StoreError>;
}

fn request_key(request_id: &str) -> String {
    format!("request/{request_id}")
}

fn audit_key(request_id: &str) -> String {
    format!("audit/{request_id}")
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

pub struct SledRequestStore {
    instance: Arc<sled::Db>,
}

impl SledRequestStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }
}

impl RequestStore for SledRequestStore {
    fn insert(&self, entity: &RequestEntity) -> Result<(), StoreError> {
        let key = request_key(&entity.request_id);
        let swapped = self
            .instance
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(encode(entity)?))?;

        swapped.map_err(|_| StoreError::AlreadyExists(entity.request_id.clone()))
    }

    fn load(&self, request_id: &str) -> Result<RequestEntity, StoreError> {
        let bytes = self
            .instance
            .get(request_key(request_id).as_bytes())?
            .ok_or_else(|| StoreError::NotFound(request_id.to_string()))?;

        Ok(minicbor::decode(&bytes)?)
    }

    fn load_audit(&self, request_id: &str) -> Result<AuditTrail, StoreError> {
        match self.instance.get(audit_key(request_id).as_bytes())? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Ok(AuditTrail::new(request_id.to_string())),
        }
    }

    fn compare_and_set(
        &self,
        expected_revision: u64,
        next: &RequestEntity,
        trail: &AuditTrail,
    ) -> Result<(), StoreError> {
        let request_id = next.request_id.clone();
        let entity_key = request_key(&request_id);
        let trail_key = audit_key(&request_id);
        let entity_bytes = encode(next)?;
        let trail_bytes = encode(trail)?;

        let result = self.instance.transaction(|tx| {
            let current = tx.get(entity_key.as_bytes())?.ok_or_else(|| {
                ConflictableTransactionError::Abort(StoreError::NotFound(request_id.clone()))
            })?;
            let current: RequestEntity = minicbor::decode(&current)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Decode(e)))?;

            if current.revision != expected_revision {
                return Err(ConflictableTransactionError::Abort(StoreError::StaleWrite {
                    request_id: request_id.clone(),
                    expected: expected_revision,
                    found: current.revision,
                }));
            }

            tx.insert(entity_key.as_bytes(), entity_bytes.clone())?;
            tx.insert(trail_key.as_bytes(), trail_bytes.clone())?;
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Sled(e)),
        }
    }
}

/// Process local store, handy for callers that persist elsewhere and for tests.
#[derive(Default, Clone)]
pub struct InMemoryRequestStore {
    requests: Arc<Mutex<HashMap<String, (RequestEntity, AuditTrail)>>>,
}

impl InMemoryRequestStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (RequestEntity, AuditTrail)>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RequestStore for InMemoryRequestStore {
    fn insert(&self, entity: &RequestEntity) -> Result<(), StoreError> {
        let mut requests = self.lock();
        if requests.contains_key(&entity.request_id) {
            return Err(StoreError::AlreadyExists(entity.request_id.clone()));
        }
        requests.insert(
            entity.request_id.clone(),
            (entity.clone(), AuditTrail::new(entity.request_id.clone())),
        );
        Ok(())
    }

    fn load(&self, request_id: &str) -> Result<RequestEntity, StoreError> {
        self.lock()
            .get(request_id)
            .map(|(entity, _)| entity.clone())
            .ok_or_else(|| StoreError::NotFound(request_id.to_string()))
    }

    fn load_audit(&self, request_id: &str) -> Result<AuditTrail, StoreError> {
        Ok(self
            .lock()
            .get(request_id)
            .map(|(_, trail)| trail.clone())
            .unwrap_or_else(|| AuditTrail::new(request_id.to_string())))
    }

    fn compare_and_set(
        &self,
        expected_revision: u64,
        next: &RequestEntity,
        trail: &AuditTrail,
    ) -> Result<(), StoreError> {
        let mut requests = self.lock();
        let slot = requests
            .get_mut(&next.request_id)
            .ok_or_else(|| StoreError::NotFound(next.request_id.clone()))?;

        if slot.0.revision != expected_revision {
            return Err(StoreError::StaleWrite {
                request_id: next.request_id.clone(),
                expected: expected_revision,
                found: slot.0.revision,
            });
        }
        *slot = (next.clone(), trail.clone());
        Ok(())
    }
}
