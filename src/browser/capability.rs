//! Abstract browser-session capability
//!
//! Visitors drive sessions only through these traits; the remote backend is
//! one implementation, test doubles are another. Locators are element ids,
//! per the page contract (unique ready marker, optional "next" affordance).

use std::time::Duration;

use async_trait::async_trait;

use super::SessionError;

/// A page element a visitor can act on
#[async_trait]
pub trait Element: Send + Sync {
    /// Simulate user activation (a click)
    async fn activate(&self) -> Result<(), SessionError>;
}

/// One isolated browsing session against the remote backend.
///
/// A session is exclusively owned by a single visitor for its whole life and
/// closed exactly once, on every exit path.
#[async_trait]
pub trait Session: Send + Sync {
    /// Load the given URL
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Block until the element with the given id is present, bounded by
    /// `timeout`. Exceeding the bound is an error.
    async fn wait_for_element(&self, element_id: &str, timeout: Duration)
        -> Result<(), SessionError>;

    /// Non-blocking probe for the element with the given id. Absence is not
    /// an error; `Ok(None)` is the normal "no such element" answer.
    async fn find_element(&self, element_id: &str)
        -> Result<Option<Box<dyn Element>>, SessionError>;

    /// Release the session and its remote resources
    async fn close(&self) -> Result<(), SessionError>;
}

/// Opens new isolated sessions against the automation backend
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>, SessionError>;
}
