//! API Lambda handler and request processing

pub mod auth;
pub mod event_handler;
pub mod handler;
pub mod helpers;
pub mod interactive_handler;
pub mod parsing;
pub mod request;
pub mod router;
pub mod signature;

// Re-export the main handler for convenience
pub use handler::{function_handler as handler, handle_request};
