//! Authentication module

pub mod api;
pub mod error;
pub mod state;
pub mod storage;
pub mod store;

// Re-export commonly used items
pub use api::AuthApi;
pub use error::{ErrorKind, SessionError};
pub use state::{AccessToken, Session, SessionSnapshot, SessionState};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::{SessionStore, SessionStoreBuilder};
