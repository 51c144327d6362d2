//! typebind-lib: rule-based type bindings for the build model
//!
//! Type rules declare that an abstract specification type is implemented by a
//! concrete type. This crate provides:
//! - `TypeLattice`: the declared subtype relationships and the upcasts they permit
//! - `TypeBindingResolver`: validation of what a rule bound
//! - `ModelRegistry`: modules, rule dependencies and deferred registrations
//! - `FactoryContainer`: named-instance factories, one per abstract type
//! - `binary`: the binary family and the component model plugins

pub mod binary;
pub mod component;
pub mod config;
pub mod container;
pub mod handler;
pub mod instance;
pub mod model;
pub mod registry;
pub mod rule;
pub mod util;
