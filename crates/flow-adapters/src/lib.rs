//! flow-adapters: the concrete workflow graphs (C5) and their step
//! handlers (§4.4) for the two workflow kinds this core ships — W-A
//! ("account-reconciliation") and W-B ("declaration-upload") — plus the
//! narrow [`browser::BrowserDriver`] collaborator interface they're built
//! against.
//!
//! This crate knows the shape of the two step graphs; it knows nothing
//! about HTTP, the transaction store, or the message bus. Those are wired
//! in by the application binary.

pub mod browser;
pub mod simulated;
pub mod steps;
pub mod workflows;
