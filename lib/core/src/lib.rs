//! Core types and utilities for flowsmith.
//!
//! This crate provides the foundational types and error handling shared by
//! the knowledge graph, AI collaborators and the workflow designer.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{DesignId, ParseIdError, RequestId};
