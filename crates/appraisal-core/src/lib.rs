//! Core types, planners and scoring for the appraisal engine.
//!
//! No HTTP or database dependencies. Storage backends implement
//! [`store::EvaluationStore`]; [`engine::Engine`] drives them.

pub mod aggregate;
pub mod assignment;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod kpi;
pub mod planner;
pub mod policy;
pub mod pseudonym;
pub mod question;
pub mod rating;
pub mod relationship;
pub mod round;
pub mod store;

pub use error::{Error, Result};
