//! Advisory record locks (team / person / task).
//!
//! [`LockManager`] owns the lock table exclusively. Every operation runs
//! under one async mutex so the check-then-insert in [`LockManager::acquire`]
//! cannot race. Locks never expire; they disappear on explicit release or
//! through [`LockManager::release_all_for_user`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::identity::CallerIdentity;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Lock kinds
// ---------------------------------------------------------------------------

/// The kinds of record that can be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    Team,
    Person,
    Task,
}

impl LockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LockKind::Team => "team",
            LockKind::Person => "person",
            LockKind::Task => "task",
        }
    }
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "team" => Ok(LockKind::Team),
            "person" => Ok(LockKind::Person),
            "task" => Ok(LockKind::Task),
            other => Err(format!("Unknown lock type '{other}'")),
        }
    }
}

/// Reject non-positive record ids.
pub fn validate_lock_target(id: DbId) -> Result<(), CoreError> {
    if id <= 0 {
        return Err(CoreError::Validation(format!(
            "Record id must be positive, got {id}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lock records
// ---------------------------------------------------------------------------

/// The user currently holding a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockHolder {
    pub user_id: DbId,
    pub username: String,
}

/// A held lock as reported to admins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    #[serde(rename = "type")]
    pub kind: LockKind,
    pub id: DbId,
    pub holder: LockHolder,
    pub acquired_at: Timestamp,
}

/// Result of [`LockManager::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Granted,
    /// Another user holds the lock; carries their display name.
    Denied { holder: String },
}

impl LockOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, LockOutcome::Granted)
    }
}

// ---------------------------------------------------------------------------
// HTTP wire types (shared with the client crate)
// ---------------------------------------------------------------------------

/// Body of `POST /locks/acquire` and `POST /locks/release`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    #[serde(rename = "type")]
    pub kind: LockKind,
    pub id: DbId,
}

/// Reply to `POST /locks/acquire`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireResponse {
    pub success: bool,
    /// Display name of the current holder when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
}

impl From<LockOutcome> for AcquireResponse {
    fn from(outcome: LockOutcome) -> Self {
        match outcome {
            LockOutcome::Granted => AcquireResponse {
                success: true,
                holder: None,
            },
            LockOutcome::Denied { holder } => AcquireResponse {
                success: false,
                holder: Some(holder),
            },
        }
    }
}

struct LockEntry {
    holder: LockHolder,
    acquired_at: Timestamp,
}

type LockKey = (LockKind, DbId);

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

/// In-memory table of advisory locks, keyed by `(kind, id)`.
///
/// Designed to be created once at startup and shared via `Arc`.
pub struct LockManager {
    locks: Mutex<HashMap<LockKey, LockEntry>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Try to lock `(kind, id)` for `caller`.
    ///
    /// Re-acquiring a lock the caller already holds is granted without
    /// touching the entry. A lock held by someone else is never replaced.
    pub async fn acquire(&self, kind: LockKind, id: DbId, caller: &CallerIdentity) -> LockOutcome {
        let mut locks = self.locks.lock().await;
        match locks.get(&(kind, id)) {
            Some(entry) if entry.holder.user_id == caller.user_id => LockOutcome::Granted,
            Some(entry) => LockOutcome::Denied {
                holder: entry.holder.username.clone(),
            },
            None => {
                locks.insert(
                    (kind, id),
                    LockEntry {
                        holder: LockHolder {
                            user_id: caller.user_id,
                            username: caller.username.clone(),
                        },
                        acquired_at: chrono::Utc::now(),
                    },
                );
                LockOutcome::Granted
            }
        }
    }

    /// Release `(kind, id)` if `caller_user_id` holds it. Otherwise does nothing.
    pub async fn release(&self, kind: LockKind, id: DbId, caller_user_id: DbId) {
        let mut locks = self.locks.lock().await;
        let held_by_caller = locks
            .get(&(kind, id))
            .is_some_and(|entry| entry.holder.user_id == caller_user_id);
        if held_by_caller {
            locks.remove(&(kind, id));
        }
    }

    /// Drop every lock held by `user_id`. Returns how many were released.
    pub async fn release_all_for_user(&self, user_id: DbId) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|(kind, id), entry| {
            if entry.holder.user_id != user_id {
                return true;
            }
            tracing::info!(
                kind = %kind,
                id,
                user_id,
                username = %entry.holder.username,
                "Releasing lock"
            );
            false
        });
        before - locks.len()
    }

    /// Current holder of `(kind, id)`, if any.
    pub async fn holder(&self, kind: LockKind, id: DbId) -> Option<LockHolder> {
        self.locks
            .lock()
            .await
            .get(&(kind, id))
            .map(|entry| entry.holder.clone())
    }

    /// Every held lock, ordered by kind then id.
    pub async fn snapshot(&self) -> Vec<LockInfo> {
        let locks = self.locks.lock().await;
        let mut infos: Vec<LockInfo> = locks
            .iter()
            .map(|((kind, id), entry)| LockInfo {
                kind: *kind,
                id: *id,
                holder: entry.holder.clone(),
                acquired_at: entry.acquired_at,
            })
            .collect();
        infos.sort_by_key(|info| (info.kind, info.id));
        infos
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::roles::Role;

    fn user(id: DbId, name: &str) -> CallerIdentity {
        CallerIdentity::new(id, name, vec![Role::Member])
    }

    #[tokio::test]
    async fn second_user_is_denied_with_holder_name() {
        let manager = LockManager::new();
        let alice = user(1, "alice");
        let bob = user(2, "bob");

        assert_eq!(manager.acquire(LockKind::Team, 4, &alice).await, LockOutcome::Granted);
        assert_matches!(
            manager.acquire(LockKind::Team, 4, &bob).await,
            LockOutcome::Denied { holder } if holder == "alice"
        );

        let holder = manager.holder(LockKind::Team, 4).await.expect("lock should exist");
        assert_eq!(holder.user_id, 1);
    }

    #[tokio::test]
    async fn reacquire_by_holder_is_idempotent() {
        let manager = LockManager::new();
        let alice = user(1, "alice");

        assert!(manager.acquire(LockKind::Person, 3, &alice).await.is_granted());
        assert!(manager.acquire(LockKind::Person, 3, &alice).await.is_granted());
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn same_id_different_kind_is_a_different_lock() {
        let manager = LockManager::new();

        assert!(manager.acquire(LockKind::Team, 1, &user(1, "alice")).await.is_granted());
        assert!(manager.acquire(LockKind::Task, 1, &user(2, "bob")).await.is_granted());
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn release_by_non_holder_is_noop() {
        let manager = LockManager::new();
        manager.acquire(LockKind::Task, 5, &user(3, "carol")).await;

        manager.release(LockKind::Task, 5, 4).await;

        let holder = manager.holder(LockKind::Task, 5).await.expect("lock should survive");
        assert_eq!(holder.username, "carol");
    }

    #[tokio::test]
    async fn release_of_unknown_key_is_noop() {
        let manager = LockManager::new();
        manager.release(LockKind::Task, 99, 1).await;
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn task_lock_scenario() {
        let manager = LockManager::new();
        let user3 = user(3, "user3");
        let user4 = user(4, "user4");

        assert_eq!(manager.acquire(LockKind::Task, 5, &user3).await, LockOutcome::Granted);
        assert_eq!(
            manager.acquire(LockKind::Task, 5, &user4).await,
            LockOutcome::Denied {
                holder: "user3".to_string()
            }
        );

        manager.release(LockKind::Task, 5, 4).await;
        assert_eq!(
            manager.holder(LockKind::Task, 5).await.map(|h| h.user_id),
            Some(3)
        );

        manager.release(LockKind::Task, 5, 3).await;
        assert!(manager.holder(LockKind::Task, 5).await.is_none());
    }

    #[tokio::test]
    async fn release_all_only_touches_one_user() {
        let manager = LockManager::new();
        let alice = user(1, "alice");
        let bob = user(2, "bob");
        manager.acquire(LockKind::Team, 1, &alice).await;
        manager.acquire(LockKind::Person, 2, &alice).await;
        manager.acquire(LockKind::Task, 3, &alice).await;
        manager.acquire(LockKind::Task, 4, &bob).await;

        let released = manager.release_all_for_user(1).await;

        assert_eq!(released, 3);
        let remaining = manager.snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].holder.user_id, 2);
        assert_eq!(remaining[0].kind, LockKind::Task);
    }

    #[tokio::test]
    async fn concurrent_acquire_grants_exactly_one() {
        let manager = Arc::new(LockManager::new());
        let mut handles = Vec::new();
        for uid in 1..=16 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager
                    .acquire(LockKind::Task, 42, &user(uid, &format!("u{uid}")))
                    .await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_granted() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(manager.len().await, 1);
    }

    #[test]
    fn kind_parses_lowercase_names() {
        assert_eq!("team".parse::<LockKind>(), Ok(LockKind::Team));
        assert_eq!("person".parse::<LockKind>(), Ok(LockKind::Person));
        assert!("Project".parse::<LockKind>().is_err());
        assert_eq!(serde_json::to_string(&LockKind::Task).unwrap(), "\"task\"");
    }

    #[test]
    fn denied_outcome_reports_holder_on_the_wire() {
        let granted = serde_json::to_value(AcquireResponse::from(LockOutcome::Granted)).unwrap();
        assert_eq!(granted, serde_json::json!({ "success": true }));

        let denied = serde_json::to_value(AcquireResponse::from(LockOutcome::Denied {
            holder: "alice".into(),
        }))
        .unwrap();
        assert_eq!(denied, serde_json::json!({ "success": false, "holder": "alice" }));
    }

    #[test]
    fn lock_request_uses_type_field() {
        let req: LockRequest = serde_json::from_str(r#"{"type":"person","id":12}"#).unwrap();
        assert_eq!(req.kind, LockKind::Person);
        assert_eq!(req.id, 12);
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        assert!(validate_lock_target(1).is_ok());
        assert_matches!(
            validate_lock_target(0),
            Err(CoreError::Validation(msg)) if msg.contains("positive")
        );
        assert_matches!(validate_lock_target(-3), Err(CoreError::Validation(_)));
    }
}
