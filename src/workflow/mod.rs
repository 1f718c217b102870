pub mod account_session;
pub mod auth_flow;

pub use account_session::AccountSession;
pub use auth_flow::{AuthFlow, AuthResult, AuthState};
