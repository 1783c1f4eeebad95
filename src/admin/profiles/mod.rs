pub mod handlers;
pub mod models;
pub mod repository;

// Re-export commonly used items
pub use handlers::list_profiles;
pub use models::{profile_model, Privacy, Profile, ProfileAdmin, ProfileModel};
pub use repository::AdminProfileRepository;
