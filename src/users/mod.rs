pub mod handlers;
pub mod models;
pub mod repository;

// Re-export commonly used items for convenience
pub use handlers::{activate_signup, login_user, logout_user, register_user};
pub use models::{CreateUserRequest, LoginRequest, LoginResponse, User, UserResponse, UserSession};
pub use repository::UserRepository;
