//! Browser session module
//!
//! The abstract session capability visitors drive, plus the production
//! backend that fulfils it against a remote Chrome DevTools endpoint.

mod capability;
mod errors;
mod remote;

pub use capability::{Element, Session, SessionFactory};
pub use errors::SessionError;
pub use remote::RemoteSessionFactory;
