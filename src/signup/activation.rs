use tracing::info;

use crate::database::DbResult;
use crate::signup::models::ActivationKey;
use crate::signup::repository::SignupRepository;
use crate::users::models::User;
use crate::users::repository::UserRepository;

#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    /// The account is active and can log in.
    Activated(User),
    /// The token was valid; staff still have to accept the signup.
    PendingModeration(User),
}

/// Consumes an activation token.
///
/// Returns `None` when the token is unknown or already used. With
/// moderation on, the signup is parked in pending moderation and the user
/// stays inactive until staff accept it.
pub async fn activate_user(
    signups: &SignupRepository,
    users: &UserRepository,
    token: &str,
    moderate: bool,
) -> DbResult<Option<ActivationOutcome>> {
    let Some(mut signup) = signups.find_by_token(token).await? else {
        return Ok(None);
    };
    let Some(mut user) = users.find_by_id(signup.user_id).await? else {
        return Ok(None);
    };

    if moderate {
        signup.activation_key = ActivationKey::PendingModeration;
        user.is_active = false;
    } else {
        signup.activation_key = ActivationKey::Activated;
        user.is_active = true;
    }
    signups.save_with_user(&signup, &user).await?;

    info!(
        "User {} activated their signup ({})",
        user.username,
        signup.activation_key.status_name()
    );

    Ok(Some(if moderate {
        ActivationOutcome::PendingModeration(user)
    } else {
        ActivationOutcome::Activated(user)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignupSentinels;
    use crate::database::Database;
    use crate::signup::repository::NewRegistration;
    use std::sync::Arc;

    async fn setup() -> (SignupRepository, UserRepository) {
        let db = Database::new(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        let db = Arc::new(db);
        let signups = SignupRepository::new(db.clone(), SignupSentinels::default());
        signups
            .register(NewRegistration {
                username: "eve".to_string(),
                email: "eve@example.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                activation_key: "tok-eve".to_string(),
            })
            .await
            .unwrap();
        (signups, UserRepository::new(db))
    }

    #[tokio::test]
    async fn test_moderated_activation_parks_signup() {
        let (signups, users) = setup().await;
        let outcome = activate_user(&signups, &users, "tok-eve", true)
            .await
            .unwrap();

        let Some(ActivationOutcome::PendingModeration(user)) = outcome else {
            panic!("expected pending moderation, got {:?}", outcome);
        };
        assert!(!user.is_active);
        let signup = signups.find_for_user(user.id).await.unwrap().unwrap();
        assert!(signup.activation_key.is_pending_moderation());
    }

    #[tokio::test]
    async fn test_unmoderated_activation_enables_user() {
        let (signups, users) = setup().await;
        let outcome = activate_user(&signups, &users, "tok-eve", false)
            .await
            .unwrap();

        assert!(matches!(outcome, Some(ActivationOutcome::Activated(ref u)) if u.is_active));
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let (signups, users) = setup().await;
        activate_user(&signups, &users, "tok-eve", true)
            .await
            .unwrap();

        assert!(activate_user(&signups, &users, "tok-eve", true)
            .await
            .unwrap()
            .is_none());
    }
}
