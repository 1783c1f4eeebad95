//! Permission checks run before every admin operation.
//!
//! Grants live in `user_permissions`. A row with a NULL `object_id` is a
//! model-wide grant; otherwise it covers a single object.

use rusqlite::OptionalExtension;
use std::sync::Arc;

use crate::database::{Database, DbResult};
use crate::users::models::UserSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOperation {
    View,
    Change,
}

impl AdminOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminOperation::View => "view",
            AdminOperation::Change => "change",
        }
    }

    /// Permission codename for this operation on `model`, e.g. `change_user`.
    pub fn codename(&self, model: &str) -> String {
        format!("{}_{}", self.as_str(), model)
    }
}

#[derive(Clone)]
pub struct PermissionRepository {
    db: Arc<Database>,
}

impl PermissionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn grant(
        &self,
        user_id: i64,
        codename: &str,
        object_type: &str,
        object_id: Option<i64>,
    ) -> DbResult<()> {
        let db = self.db.clone();
        let codename = codename.to_string();
        let object_type = object_type.to_string();

        tokio::task::spawn_blocking(move || -> DbResult<()> {
            let conn = db.lock()?;
            // UNIQUE does not dedupe NULL object ids, so check first.
            let exists = conn
                .query_row(
                    "SELECT id FROM user_permissions
                     WHERE user_id = ?1 AND codename = ?2 AND object_type = ?3 AND object_id IS ?4",
                    rusqlite::params![user_id, &codename, &object_type, object_id],
                    |_row| Ok(()),
                )
                .optional()?;
            if exists.is_none() {
                conn.execute(
                    "INSERT INTO user_permissions (user_id, codename, object_type, object_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![user_id, &codename, &object_type, object_id],
                )?;
            }
            Ok(())
        })
        .await?
    }

    pub async fn revoke(
        &self,
        user_id: i64,
        codename: &str,
        object_type: &str,
        object_id: Option<i64>,
    ) -> DbResult<()> {
        let db = self.db.clone();
        let codename = codename.to_string();
        let object_type = object_type.to_string();

        tokio::task::spawn_blocking(move || -> DbResult<()> {
            let conn = db.lock()?;
            conn.execute(
                "DELETE FROM user_permissions
                 WHERE user_id = ?1 AND codename = ?2 AND object_type = ?3 AND object_id IS ?4",
                rusqlite::params![user_id, &codename, &object_type, object_id],
            )?;
            Ok(())
        })
        .await?
    }

    /// True when the user holds a model-wide grant, or a grant for
    /// `object_id` when one is given.
    pub async fn has_perm(
        &self,
        user_id: i64,
        codename: &str,
        object_type: &str,
        object_id: Option<i64>,
    ) -> DbResult<bool> {
        let db = self.db.clone();
        let codename = codename.to_string();
        let object_type = object_type.to_string();

        tokio::task::spawn_blocking(move || -> DbResult<bool> {
            let conn = db.lock()?;
            let found = conn
                .query_row(
                    "SELECT id FROM user_permissions
                     WHERE user_id = ?1 AND codename = ?2 AND object_type = ?3
                       AND (object_id IS NULL OR object_id = ?4)
                     LIMIT 1",
                    rusqlite::params![user_id, &codename, &object_type, object_id],
                    |_row| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await?
    }
}

/// Hook a model admin consults before each operation.
#[derive(Clone)]
pub enum PermissionGuard {
    /// Only model-wide grants count.
    ModelLevel(PermissionRepository),
    /// Model-wide grants, or a grant on the object being operated on.
    ObjectLevel(PermissionRepository),
}

impl PermissionGuard {
    pub async fn check(
        &self,
        actor: &UserSession,
        operation: AdminOperation,
        model: &str,
        object_id: Option<i64>,
    ) -> DbResult<bool> {
        if actor.is_superuser {
            return Ok(true);
        }
        if !actor.is_staff {
            return Ok(false);
        }

        let codename = operation.codename(model);
        match self {
            PermissionGuard::ModelLevel(repo) => {
                repo.has_perm(actor.user_id, &codename, model, None).await
            }
            PermissionGuard::ObjectLevel(repo) => {
                repo.has_perm(actor.user_id, &codename, model, object_id)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repository::UserRepository;

    async fn setup() -> (Arc<Database>, i64) {
        let db = Database::new(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        let db = Arc::new(db);
        let staff = UserRepository::new(db.clone())
            .create_user("mod", "mod@example.com", "password123", true, false)
            .await
            .unwrap();
        (db, staff.id)
    }

    fn session(user_id: i64, is_staff: bool, is_superuser: bool) -> UserSession {
        UserSession {
            user_id,
            username: "someone".to_string(),
            is_staff,
            is_superuser,
        }
    }

    #[test]
    fn test_codename() {
        assert_eq!(AdminOperation::Change.codename("user"), "change_user");
        assert_eq!(AdminOperation::View.codename("profile"), "view_profile");
    }

    #[tokio::test]
    async fn test_object_grant_only_covers_that_object() {
        let (db, staff_id) = setup().await;
        let repo = PermissionRepository::new(db);
        repo.grant(staff_id, "change_user", "user", Some(42))
            .await
            .unwrap();

        let guard = PermissionGuard::ObjectLevel(repo.clone());
        let actor = session(staff_id, true, false);
        assert!(guard
            .check(&actor, AdminOperation::Change, "user", Some(42))
            .await
            .unwrap());
        assert!(!guard
            .check(&actor, AdminOperation::Change, "user", Some(43))
            .await
            .unwrap());

        let model_guard = PermissionGuard::ModelLevel(repo);
        assert!(!model_guard
            .check(&actor, AdminOperation::Change, "user", Some(42))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_global_grant_and_revoke() {
        let (db, staff_id) = setup().await;
        let repo = PermissionRepository::new(db);
        repo.grant(staff_id, "change_user", "user", None).await.unwrap();
        repo.grant(staff_id, "change_user", "user", None).await.unwrap();

        assert!(repo
            .has_perm(staff_id, "change_user", "user", Some(7))
            .await
            .unwrap());

        repo.revoke(staff_id, "change_user", "user", None).await.unwrap();
        assert!(!repo
            .has_perm(staff_id, "change_user", "user", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_superuser_and_non_staff_short_circuit() {
        let (db, staff_id) = setup().await;
        let guard = PermissionGuard::ObjectLevel(PermissionRepository::new(db));

        assert!(guard
            .check(&session(999, false, true), AdminOperation::Change, "user", None)
            .await
            .unwrap());
        assert!(!guard
            .check(&session(staff_id, false, false), AdminOperation::View, "user", None)
            .await
            .unwrap());
    }
}
