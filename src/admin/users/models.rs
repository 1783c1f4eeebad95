use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admin::site::{ActionSpec, AdminPresentation, InlineSpec};
use crate::admin::users::moderation::ModerationAction;
use crate::signup::models::SignupInline;

pub const USER_LIST_DISPLAY: [&str; 7] = [
    "username",
    "email",
    "first_name",
    "last_name",
    "is_staff",
    "is_active",
    "date_joined",
];

/// Stock user admin, replaced during bootstrap.
pub struct DefaultUserAdmin;

impl AdminPresentation for DefaultUserAdmin {
    fn model_name(&self) -> &'static str {
        "user"
    }

    fn list_display(&self) -> Vec<&'static str> {
        vec!["username", "email", "first_name", "last_name", "is_staff"]
    }
}

/// User admin with the signup inline and the moderation actions.
pub struct ModeratedUserAdmin;

impl AdminPresentation for ModeratedUserAdmin {
    fn model_name(&self) -> &'static str {
        "user"
    }

    fn list_display(&self) -> Vec<&'static str> {
        USER_LIST_DISPLAY.to_vec()
    }

    fn inlines(&self) -> Vec<InlineSpec> {
        vec![InlineSpec {
            model: "signup",
            style: "stacked",
            max_num: 1,
        }]
    }

    fn actions(&self) -> Vec<ActionSpec> {
        ModerationAction::ALL
            .iter()
            .map(|action| ActionSpec {
                name: action.name(),
                description: action.short_description(),
            })
            .collect()
    }
}

/// A change-list row: the list-display columns plus the signup inline.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub signup: Option<SignupInline>,
}

/// Body of a bulk-action request from the change list.
#[derive(Debug, Deserialize)]
pub struct AdminActionRequest {
    pub action: String,
    #[serde(default)]
    pub selected: Vec<i64>,
}
