use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admin::site::AdminPresentation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Open,
    Registered,
    Closed,
}

impl From<String> for Privacy {
    fn from(s: String) -> Self {
        match s.as_str() {
            "open" => Privacy::Open,
            "closed" => Privacy::Closed,
            _ => Privacy::Registered,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub privacy: Privacy,
    pub language: String,
    pub mugshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The profile entity this deployment uses, as seen by the admin.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileModel {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// Resolves the configured profile model.
pub fn profile_model() -> ProfileModel {
    ProfileModel {
        name: "profile",
        fields: &[
            "id",
            "username",
            "privacy",
            "language",
            "mugshot_url",
            "created_at",
        ],
    }
}

/// Default presentation: every field, no inlines or actions.
pub struct ProfileAdmin {
    model: ProfileModel,
}

impl ProfileAdmin {
    pub fn new(model: ProfileModel) -> Self {
        Self { model }
    }
}

impl AdminPresentation for ProfileAdmin {
    fn model_name(&self) -> &'static str {
        self.model.name
    }

    fn list_display(&self) -> Vec<&'static str> {
        self.model.fields.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_defaults_to_registered() {
        assert_eq!(Privacy::from("open".to_string()), Privacy::Open);
        assert_eq!(Privacy::from("bogus".to_string()), Privacy::Registered);
        assert_eq!(Privacy::from("closed".to_string()), Privacy::Closed);
    }

    #[test]
    fn test_profile_admin_has_no_actions() {
        let admin = ProfileAdmin::new(profile_model());
        assert_eq!(admin.model_name(), "profile");
        assert!(admin.actions().is_empty());
        assert!(admin.inlines().is_empty());
        assert!(admin.list_display().contains(&"privacy"));
    }
}
