//! Request handler module
//!
//! Dispatches incoming requests and defines what handler functions see and return.

mod dispatch;
mod request;

pub use dispatch::handle_request;
pub use request::{HandlerOutput, HandlerRequest};
