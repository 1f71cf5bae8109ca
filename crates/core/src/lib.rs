//! Domain model and report pipelines for the weekly problem report.
//!
//! Everything here is free of HTTP concerns: the monitoring platform is
//! reached through the [`source::EventSource`] seam, and the pipelines in
//! [`aggregate`] are pure functions over normalized [`event::Event`]s.

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod error;
pub mod event;
pub mod filter;
pub mod report;
pub mod severity;
pub mod source;
pub mod types;
pub mod week;
