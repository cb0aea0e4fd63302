pub mod business;
pub mod calendar;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod events;
pub mod filters;
pub mod format;
pub mod location;
pub mod ports;
pub mod reservations;
pub mod session;
pub mod stats;
pub mod validation;
pub mod service;
