//! Internship and placement portal.
//!
//! [`portal`] holds the domain layer: identities, job postings, applications,
//! the access policy gating them, and admin reporting, plus an axum router
//! over those services. [`config`], [`telemetry`], and [`error`] carry the
//! environment settings, tracing setup, and application-edge error type shared
//! with the API binary.

pub mod config;
pub mod error;
pub mod portal;
pub mod telemetry;
