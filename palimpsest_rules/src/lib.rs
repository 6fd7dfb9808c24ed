//! # Palimpsest Rules
//!
//! The authored world of the narrative graph - nodes, characters, temporal layers,
//! content variants and the vocabulary of conditions and text transformations.
//! This crate owns the node store (the single source of truth for node state)
//! and contains no journey or transformation logic.

pub mod content;
pub mod entities;
pub mod error;
pub mod store;
pub mod transformation;

pub use content::*;
pub use entities::*;
pub use error::*;
pub use store::*;
pub use transformation::*;
