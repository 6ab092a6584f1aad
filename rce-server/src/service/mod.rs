//! Service Layer
//!
//! Business logic behind the HTTP handlers, free of axum types.

pub mod auth;
pub mod dispatch;
pub mod grants;
pub mod poll;

pub use auth::{Authenticator, StaticTokens};
pub use dispatch::{Dispatcher, ProcessDispatcher, TaskDispatcher};
pub use grants::ReadGrants;
pub use poll::{PollError, PollHandler, PollOutcome};
