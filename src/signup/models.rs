use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SignupSentinels;

/// Value of a signup's activation key.
///
/// Anything stored that is not one of the configured sentinels is treated
/// as a live, single-use activation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationKey {
    PendingModeration,
    Activated,
    Rejected,
    Token(String),
}

impl ActivationKey {
    pub fn from_stored(raw: String, sentinels: &SignupSentinels) -> Self {
        if raw == sentinels.pending_moderation {
            ActivationKey::PendingModeration
        } else if raw == sentinels.activated {
            ActivationKey::Activated
        } else if raw == sentinels.activation_rejected {
            ActivationKey::Rejected
        } else {
            ActivationKey::Token(raw)
        }
    }

    pub fn to_stored<'a>(&'a self, sentinels: &'a SignupSentinels) -> &'a str {
        match self {
            ActivationKey::PendingModeration => &sentinels.pending_moderation,
            ActivationKey::Activated => &sentinels.activated,
            ActivationKey::Rejected => &sentinels.activation_rejected,
            ActivationKey::Token(token) => token,
        }
    }

    pub fn is_pending_moderation(&self) -> bool {
        matches!(self, ActivationKey::PendingModeration)
    }

    pub fn status_name(&self) -> &'static str {
        match self {
            ActivationKey::PendingModeration => "pending_moderation",
            ActivationKey::Activated => "activated",
            ActivationKey::Rejected => "rejected",
            ActivationKey::Token(_) => "awaiting_activation",
        }
    }
}

/// Signup status attached one-to-one to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Signup {
    pub id: i64,
    pub user_id: i64,
    pub activation_key: ActivationKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stacked inline shown under a user in the admin.
#[derive(Debug, Clone, Serialize)]
pub struct SignupInline {
    pub id: i64,
    pub activation_key: String,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

impl SignupInline {
    pub fn new(signup: &Signup, sentinels: &SignupSentinels) -> Self {
        Self {
            id: signup.id,
            activation_key: signup.activation_key.to_stored(sentinels).to_string(),
            status: signup.activation_key.status_name(),
            created_at: signup.created_at,
        }
    }
}
