//! Test fixtures for typebind-lib.
//!
//! Provides a small binary family (`dyn Binary` implemented by
//! [`DefaultBinary`]) wired into a registry with the component model
//! registered.

use std::sync::Arc;

use crate::binary::{
  BaseBinarySpec, BinaryBase, BinarySpec, BinaryTypeRuleHandler, declare_binary_implementation,
  register_component_model,
};
use crate::component::{Named, SoftwareComponent};
use crate::instance::{DirectInstantiator, InstanceInfo};
use crate::model::ModelType;
use crate::registry::ModelRegistry;

/// An abstract binary type.
pub trait Binary: BinarySpec {}

/// The default implementation of [`Binary`].
#[derive(Debug)]
pub struct DefaultBinary {
  base: BinaryBase,
}

impl DefaultBinary {
  pub fn new(info: &InstanceInfo) -> Self {
    Self {
      base: BinaryBase::new(info),
    }
  }
}

impl Named for DefaultBinary {
  fn name(&self) -> &str {
    self.base.name()
  }
}

impl BinarySpec for DefaultBinary {
  fn display_name(&self) -> String {
    self.base.display_name()
  }

  fn is_buildable(&self) -> bool {
    self.base.is_buildable()
  }

  fn model_type(&self) -> ModelType {
    self.base.implementation()
  }
}

impl BaseBinarySpec for DefaultBinary {
  fn base(&self) -> &BinaryBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut BinaryBase {
    &mut self.base
  }
}

impl Binary for DefaultBinary {}

impl SoftwareComponent for DefaultBinary {}

/// A registry with the component model registered and `dyn Binary`
/// implemented by [`DefaultBinary`], plus a handler able to construct it.
pub fn binary_registry() -> (ModelRegistry, BinaryTypeRuleHandler) {
  let mut registry = ModelRegistry::default();
  register_component_model(&mut registry).unwrap();

  let types = registry.types_mut();
  declare_binary_implementation::<DefaultBinary>(types)
    .extend::<dyn Binary, dyn BinarySpec>(|b| b)
    .extend::<DefaultBinary, dyn Binary>(|b| b)
    .declare_component::<DefaultBinary>();

  let handler = BinaryTypeRuleHandler::new(Arc::new(DirectInstantiator::new().with_constructor(DefaultBinary::new)));
  (registry, handler)
}
