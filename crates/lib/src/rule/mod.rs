//! Type rules and binding resolution.
//!
//! A [`TypeRule`] declares an abstract type and, optionally, the concrete type
//! implementing it. Running the rule fills a [`TypeBuilder`], which the
//! [`TypeBindingResolver`] validates against the type lattice before anything
//! is registered.
//!
//! # Submodules
//!
//! - [`resolve`] - Validation of a builder into a [`ResolvedImplementation`]
//! - `types` - Rules, builders, descriptors and the binding error

pub mod resolve;
mod types;

pub use resolve::TypeBindingResolver;
pub use types::*;
