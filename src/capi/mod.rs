//! Meta Conversions API integration: payload types, the HTTP transport, and
//! the forwarder that matches purchases back to stored clicks.

pub mod client;
pub mod forwarder;
pub mod types;

pub use client::{ConversionTransport, GraphApiTransport};
pub use forwarder::{ConversionForwarder, ForwardOutcome, ForwardRequest};
