//! Client core of the partner desk: session, business profile and live
//! reservations, plus the calendar and dashboard view-models derived from them.

pub mod contract;

pub use contract::{client, error, model};

pub mod module;
pub use module::{PartnerDesk, Ports};

// Internal layers, public for integration tests and the CLI.
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
