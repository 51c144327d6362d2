//! The binary type family.
//!
//! Binary type rules bind an abstract binary type to an implementation built
//! on [`BinaryBase`]. Factories are installed into the [`BinaryContainer`],
//! which only exists once [`ComponentModelBasePlugin`] is active.
//!
//! # Submodules
//!
//! - `types` - Binary traits, shared binary state and the container alias

mod types;

use crate::container::{ContainerError, Extensions};
use crate::handler::{TypeFamily, TypeRuleHandler};
use crate::model::TypeLattice;
use crate::registry::{ModelRegistry, Module, ModuleId, SchedulingError};

pub use types::*;

/// Id of [`LanguageBasePlugin`].
pub const LANGUAGE_BASE: ModuleId = ModuleId("language-base");

/// Id of [`ComponentModelBasePlugin`].
pub const COMPONENT_MODEL_BASE: ModuleId = ModuleId("component-model-base");

/// The family of binary specification types.
pub struct BinaryFamily;

impl TypeFamily for BinaryFamily {
  const KIND: &'static str = "binary";
  type Root = dyn BinarySpec;
  type BaseImplementation = dyn BaseBinarySpec;

  fn owning_module() -> ModuleId {
    COMPONENT_MODEL_BASE
  }
}

/// Handles binary type rules.
pub type BinaryTypeRuleHandler = TypeRuleHandler<BinaryFamily>;

/// Base language support. Contributes nothing of its own.
#[derive(Debug, Default)]
pub struct LanguageBasePlugin;

impl Module for LanguageBasePlugin {
  fn id(&self) -> ModuleId {
    LANGUAGE_BASE
  }

  fn apply(&self, _extensions: &mut Extensions) -> Result<(), ContainerError> {
    Ok(())
  }
}

/// The component model. Owns the [`BinaryContainer`].
#[derive(Debug, Default)]
pub struct ComponentModelBasePlugin;

impl Module for ComponentModelBasePlugin {
  fn id(&self) -> ModuleId {
    COMPONENT_MODEL_BASE
  }

  fn requires(&self) -> Vec<ModuleId> {
    vec![LANGUAGE_BASE]
  }

  fn apply(&self, extensions: &mut Extensions) -> Result<(), ContainerError> {
    extensions.add(BinaryContainer::new(BinaryFamily::KIND))
  }
}

/// Declare the roots of the binary family.
pub fn declare_binary_types(lattice: &mut TypeLattice) -> &mut TypeLattice {
  lattice.extend::<dyn BaseBinarySpec, dyn BinarySpec>(|b| b)
}

/// Declare `T` as a binary implementation.
///
/// Edges to the abstract types `T` implements still have to be declared.
pub fn declare_binary_implementation<T: BaseBinarySpec>(lattice: &mut TypeLattice) -> &mut TypeLattice {
  lattice.extend::<T, dyn BaseBinarySpec>(|b| b)
}

/// Register the component model modules and declare the binary roots.
pub fn register_component_model(registry: &mut ModelRegistry) -> Result<(), SchedulingError> {
  declare_binary_types(registry.types_mut());
  registry.register_module(LanguageBasePlugin)?;
  registry.register_module(ComponentModelBasePlugin)
}
