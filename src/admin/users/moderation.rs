use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::SignupSentinels;
use crate::database::{Database, DbResult};
use crate::mailer::{MailResult, Mailer};
use crate::signup::models::{ActivationKey, Signup};
use crate::signup::repository::SignupRepository;
use crate::users::models::User;
use crate::users::repository::UserRepository;

const NOTHING_PROCESSED_HINT: &str =
    " Were the users already rejected, or have they failed to activate their accounts?";

/// Bulk actions offered on the user change list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    AcceptSignup,
    RejectSignup,
}

impl ModerationAction {
    pub const ALL: [ModerationAction; 2] =
        [ModerationAction::AcceptSignup, ModerationAction::RejectSignup];

    pub fn name(&self) -> &'static str {
        match self {
            ModerationAction::AcceptSignup => "accept_signup",
            ModerationAction::RejectSignup => "reject_signup",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    /// Past participle used in the summary message.
    pub fn label(&self) -> &'static str {
        match self {
            ModerationAction::AcceptSignup => "enabled",
            ModerationAction::RejectSignup => "rejected",
        }
    }

    pub fn short_description(&self) -> &'static str {
        match self {
            ModerationAction::AcceptSignup => "Accept selected user signups.",
            ModerationAction::RejectSignup => "Reject selected user signups.",
        }
    }

    /// Moves one pending signup to its final state and notifies the user.
    async fn apply(&self, user: &mut User, signup: &mut Signup, mailer: &Mailer) -> MailResult<()> {
        match self {
            ModerationAction::AcceptSignup => {
                signup.activation_key = ActivationKey::Activated;
                mailer.send_approval_email(user).await?;
                user.is_active = true;
            }
            ModerationAction::RejectSignup => {
                signup.activation_key = ActivationKey::Rejected;
                mailer.send_rejection_email(user).await?;
                user.is_active = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationOutcome {
    pub count: usize,
    pub message: String,
}

pub fn summary_message(count: usize, label: &str) -> String {
    if count == 1 {
        return format!("1 user was {}.", label);
    }

    let mut msg = format!("{} users were {}.", count, label);
    if count == 0 {
        msg.push_str(NOTHING_PROCESSED_HINT);
    }
    msg
}

/// Runs accept/reject over a staff selection of users.
pub struct SignupModerator {
    users: UserRepository,
    signups: SignupRepository,
    mailer: Mailer,
}

impl SignupModerator {
    pub fn new(db: Arc<Database>, sentinels: SignupSentinels, mailer: Mailer) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            signups: SignupRepository::new(db, sentinels),
            mailer,
        }
    }

    pub async fn accept_signup(&self, selected: &[i64]) -> DbResult<ModerationOutcome> {
        self.process(selected, ModerationAction::AcceptSignup).await
    }

    pub async fn reject_signup(&self, selected: &[i64]) -> DbResult<ModerationOutcome> {
        self.process(selected, ModerationAction::RejectSignup).await
    }

    /// Applies `action` to every selected user whose signup is pending
    /// moderation, in selection order.
    ///
    /// Users without a signup, or whose signup is in any other state, are
    /// skipped silently. A mail or database failure aborts the remaining
    /// batch; users handled before it keep their new state.
    pub async fn process(
        &self,
        selected: &[i64],
        action: ModerationAction,
    ) -> DbResult<ModerationOutcome> {
        let mut count = 0;

        for &user_id in selected {
            let Some(mut user) = self.users.find_by_id(user_id).await? else {
                continue;
            };
            let Some(mut signup) = self.signups.find_for_user(user_id).await? else {
                debug!("User {} has no signup, skipping", user.username);
                continue;
            };
            if !signup.activation_key.is_pending_moderation() {
                continue;
            }

            action.apply(&mut user, &mut signup, &self.mailer).await?;
            self.signups.save_with_user(&signup, &user).await?;
            count += 1;

            info!("Signup of {} {}", user.username, action.label());
        }

        let message = summary_message(count, action.label());
        info!("{}: {}", action.name(), message);

        Ok(ModerationOutcome { count, message })
    }
}
