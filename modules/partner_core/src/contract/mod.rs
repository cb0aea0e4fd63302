pub mod client;
pub mod error;
pub mod model;

pub use client::PartnerDeskApi;
pub use error::PartnerDeskError;
