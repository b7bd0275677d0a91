//! Visitor module
//!
//! One simulated visitor per browser session, following the visited site's
//! page chain with randomized dwell times.

mod worker;

pub use worker::{PageMarkers, Visitor, VisitorIdentity};
