//! API request handlers.

/// Message submission over REST.
pub mod messages;
/// Round lookup.
pub mod rounds;
/// Service info, health and status.
pub mod status;
