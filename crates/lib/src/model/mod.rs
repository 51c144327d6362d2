//! Type model for specification and implementation types.
//!
//! Rust cannot ask at runtime whether one type "extends" another, so the
//! relationships that matter to the build model are declared explicitly in a
//! [`TypeLattice`]. Each declared edge carries the conversion that performs the
//! upcast, written as an ordinary coercion closure and therefore checked by the
//! compiler at the declaration site.
//!
//! # Submodules
//!
//! - [`lattice`] - The declared subtype graph and upcast paths
//! - `types` - Type tokens and erased boxes

pub mod lattice;
mod types;

pub use lattice::{TypeLattice, UpcastPath};
pub use types::*;
