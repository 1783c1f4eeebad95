pub mod handlers;
pub mod models;
pub mod moderation;
pub mod repository;
pub mod templates;

// Re-export commonly used items
pub use handlers::{get_user, list_models, list_users, run_user_action};
pub use models::{AdminActionRequest, AdminUserRow, DefaultUserAdmin, ModeratedUserAdmin};
pub use moderation::{summary_message, ModerationAction, ModerationOutcome, SignupModerator};
pub use repository::AdminUserRepository;
pub use templates::admin_users_list_handler;
