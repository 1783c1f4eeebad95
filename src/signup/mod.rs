pub mod activation;
pub mod models;
pub mod repository;

// Re-export commonly used items
pub use activation::{activate_user, ActivationOutcome};
pub use models::{ActivationKey, Signup, SignupInline};
pub use repository::{NewRegistration, SignupRepository};
