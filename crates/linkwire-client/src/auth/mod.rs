//! Login/register as single-shot request/response calls.

pub mod coordinator;

pub use coordinator::{AuthCoordinator, AuthError, AuthKind, AuthResult, AuthSuccess};
