//! rubricon-core — Grading engine, data model, and fusion logic.
//!
//! This crate defines the rubric model, the modality router, the oracle
//! alignment layer, multi-scorer fusion, and the orchestrating engine
//! that the rest of the rubricon system builds on.

pub mod align;
pub mod config;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod grade;
pub mod model;
pub mod report;
pub mod retrieval;
pub mod router;
pub mod rubric;
pub mod traits;
