use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow, ensure};
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Operation, OperationDraft, OperationId, User, UserId};

use super::LedgerStore;
use super::store::commit_timestamp;

/// In-memory ledger store for tests, local demos, and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    operations: HashMap<OperationId, Operation>,
    by_user: HashMap<UserId, Vec<OperationId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("ledger store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("ledger store lock poisoned"))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<bool> {
        let mut state = self.write()?;
        if state.emails.contains_key(&user.email) {
            return Ok(false);
        }
        ensure!(
            !state.users.contains_key(&user.id),
            "user {} already stored",
            user.id
        );

        state.emails.insert(user.email.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.read()?;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn append_operation(&self, draft: OperationDraft) -> Result<Operation> {
        ensure!(draft.is_well_formed(), "malformed operation: {:?}", draft);

        let mut state = self.write()?;
        ensure!(
            state.users.contains_key(&draft.user_id),
            "operation references unknown user {}",
            draft.user_id
        );
        if let Some(receiver_id) = draft.receiver_id {
            ensure!(
                state.users.contains_key(&receiver_id),
                "operation references unknown receiver {}",
                receiver_id
            );
        }

        let operation = draft.commit(Uuid::now_v7(), commit_timestamp());

        state
            .by_user
            .entry(operation.user_id)
            .or_default()
            .push(operation.id);
        if let Some(receiver_id) = operation.receiver_id.filter(|r| *r != operation.user_id) {
            state.by_user.entry(receiver_id).or_default().push(operation.id);
        }
        state.operations.insert(operation.id, operation.clone());

        Ok(operation)
    }

    async fn list_operations(&self, user_id: UserId) -> Result<Vec<Operation>> {
        let state = self.read()?;
        let mut operations: Vec<Operation> = state
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.operations.get(id).cloned())
            .collect();

        operations.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(operations)
    }

    async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        Ok(self.read()?.operations.get(&id).cloned())
    }
}
