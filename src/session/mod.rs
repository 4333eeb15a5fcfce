//! Session layer
//!
//! The scoped-resource core of the crate: acquire a browser, drive it through
//! the `Page` capability, tear everything down in order.
//!
//! Module structure:
//! - `page`: the `Page` capability trait and its CDP implementation
//! - `lifecycle`: session lifecycle and job dispatch
//! - `mock`: mock implementations for testing

pub mod lifecycle;
pub mod mock;
pub mod page;

pub use lifecycle::{OperatorPrompt, Session, SessionState, StdinPrompt};
pub use page::{CdpPage, Page};
