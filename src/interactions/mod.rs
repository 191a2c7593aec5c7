//! Chat interaction surface.
//!
//! Signature verification, command dispatch and deferred delivery of
//! comparison reports.

pub mod delivery;
pub mod payload;
pub mod router;
pub mod signature;

pub use delivery::WebhookSink;
pub use router::{create_router, AppState};
pub use signature::SignatureVerifier;
