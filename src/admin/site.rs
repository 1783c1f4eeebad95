//! Registry of model admins, built once at startup.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::admin::permissions::{AdminOperation, PermissionGuard, PermissionRepository};
use crate::admin::profiles::{profile_model, ProfileAdmin};
use crate::admin::users::{DefaultUserAdmin, ModeratedUserAdmin};
use crate::database::{Database, DbResult};
use crate::users::models::UserSession;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineSpec {
    pub model: &'static str,
    pub style: &'static str,
    pub max_num: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// How a model shows up in the admin: its columns, inlines and bulk actions.
pub trait AdminPresentation: Send + Sync {
    fn model_name(&self) -> &'static str;

    fn list_display(&self) -> Vec<&'static str>;

    fn inlines(&self) -> Vec<InlineSpec> {
        Vec::new()
    }

    fn actions(&self) -> Vec<ActionSpec> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelAdminDescription {
    pub model: &'static str,
    pub list_display: Vec<&'static str>,
    pub inlines: Vec<InlineSpec>,
    pub actions: Vec<ActionSpec>,
}

/// A presentation paired with the permission hook that guards it.
pub struct ModelAdmin {
    presentation: Box<dyn AdminPresentation>,
    guard: PermissionGuard,
}

impl ModelAdmin {
    pub fn new(presentation: impl AdminPresentation + 'static, guard: PermissionGuard) -> Self {
        Self {
            presentation: Box::new(presentation),
            guard,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.presentation.model_name()
    }

    pub fn list_display(&self) -> Vec<&'static str> {
        self.presentation.list_display()
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.presentation
            .actions()
            .iter()
            .any(|action| action.name == name)
    }

    pub fn describe(&self) -> ModelAdminDescription {
        ModelAdminDescription {
            model: self.presentation.model_name(),
            list_display: self.presentation.list_display(),
            inlines: self.presentation.inlines(),
            actions: self.presentation.actions(),
        }
    }

    pub async fn has_permission(
        &self,
        actor: &UserSession,
        operation: AdminOperation,
        object_id: Option<i64>,
    ) -> DbResult<bool> {
        self.guard
            .check(actor, operation, self.model_name(), object_id)
            .await
    }
}

#[derive(Debug, PartialEq)]
pub enum AdminSiteError {
    AlreadyRegistered(&'static str),
    NotRegistered(String),
}

impl fmt::Display for AdminSiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminSiteError::AlreadyRegistered(model) => {
                write!(f, "model '{}' is already registered", model)
            }
            AdminSiteError::NotRegistered(model) => {
                write!(f, "model '{}' is not registered", model)
            }
        }
    }
}

impl std::error::Error for AdminSiteError {}

#[derive(Default)]
pub struct AdminSite {
    registry: BTreeMap<&'static str, ModelAdmin>,
}

impl AdminSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires the admins this service ships with. Call once during startup.
    pub fn bootstrap(db: Arc<Database>) -> Result<Self, AdminSiteError> {
        let permissions = PermissionRepository::new(db);
        let mut site = Self::new();

        site.register(ModelAdmin::new(
            DefaultUserAdmin,
            PermissionGuard::ModelLevel(permissions.clone()),
        ))?;

        // Swap the stock user admin for the moderated one.
        site.unregister("user")?;
        site.register(ModelAdmin::new(
            ModeratedUserAdmin,
            PermissionGuard::ObjectLevel(permissions.clone()),
        ))?;

        site.register(ModelAdmin::new(
            ProfileAdmin::new(profile_model()),
            PermissionGuard::ModelLevel(permissions),
        ))?;

        info!(
            "Admin site ready with models: {}",
            site.registry.keys().copied().collect::<Vec<_>>().join(", ")
        );
        Ok(site)
    }

    pub fn register(&mut self, admin: ModelAdmin) -> Result<(), AdminSiteError> {
        let name = admin.model_name();
        if self.registry.contains_key(name) {
            return Err(AdminSiteError::AlreadyRegistered(name));
        }
        self.registry.insert(name, admin);
        Ok(())
    }

    pub fn unregister(&mut self, model: &str) -> Result<ModelAdmin, AdminSiteError> {
        self.registry
            .remove(model)
            .ok_or_else(|| AdminSiteError::NotRegistered(model.to_string()))
    }

    pub fn get(&self, model: &str) -> Option<&ModelAdmin> {
        self.registry.get(model)
    }

    pub fn describe(&self) -> Vec<ModelAdminDescription> {
        self.registry.values().map(ModelAdmin::describe).collect()
    }
}
