//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use typebind_lib::binary::{
  BaseBinarySpec, BinaryBase, BinarySpec, BinaryTypeRuleHandler, declare_binary_implementation,
  register_component_model,
};
use typebind_lib::component::{Named, SoftwareComponent};
use typebind_lib::instance::{DirectInstantiator, InstanceInfo};
use typebind_lib::model::ModelType;
use typebind_lib::registry::ModelRegistry;
use typebind_lib::rule::{RuleDescriptor, TypeRule};

pub trait Binary: BinarySpec {}

pub trait SharedLibraryBinary: BinarySpec {
  fn soname(&self) -> String;
}

/// Implements the binary traits through a [`BinaryBase`].
macro_rules! base_binary {
  ($ty:ident) => {
    impl Named for $ty {
      fn name(&self) -> &str {
        self.base.name()
      }
    }

    impl BinarySpec for $ty {
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

    impl BaseBinarySpec for $ty {
      fn base(&self) -> &BinaryBase {
        &self.base
      }

      fn base_mut(&mut self) -> &mut BinaryBase {
        &mut self.base
      }
    }
  };
}

pub struct DefaultBinary {
  base: BinaryBase,
}

base_binary!(DefaultBinary);
impl Binary for DefaultBinary {}
impl SoftwareComponent for DefaultBinary {}

pub struct DefaultSharedLibraryBinary {
  base: BinaryBase,
}

base_binary!(DefaultSharedLibraryBinary);

impl SharedLibraryBinary for DefaultSharedLibraryBinary {
  fn soname(&self) -> String {
    format!("lib{}.so", self.base.name())
  }
}

/// A [`Binary`] that is not built on [`BinaryBase`].
pub struct ForeignBinary;

impl Named for ForeignBinary {
  fn name(&self) -> &str {
    "foreign"
  }
}

impl BinarySpec for ForeignBinary {
  fn display_name(&self) -> String {
    "foreign binary".to_string()
  }

  fn is_buildable(&self) -> bool {
    false
  }

  fn model_type(&self) -> ModelType {
    ModelType::of::<Self>()
  }
}

impl Binary for ForeignBinary {}

/// A type with no place in the binary family.
pub struct Unrelated;

/// Registry with the component model registered and the fixture types
/// declared.
pub fn registry() -> ModelRegistry {
  let mut registry = ModelRegistry::default();
  register_component_model(&mut registry).unwrap();

  let types = registry.types_mut();
  types
    .extend::<dyn Binary, dyn BinarySpec>(|b| b)
    .extend::<dyn SharedLibraryBinary, dyn BinarySpec>(|b| b)
    .extend::<ForeignBinary, dyn Binary>(|b| b)
    .extend::<DefaultBinary, dyn Binary>(|b| b)
    .extend::<DefaultSharedLibraryBinary, dyn SharedLibraryBinary>(|b| b)
    .declare_component::<DefaultBinary>();
  declare_binary_implementation::<DefaultBinary>(types);
  declare_binary_implementation::<DefaultSharedLibraryBinary>(types);
  types.declare::<Unrelated>();

  registry
}

pub fn handler() -> BinaryTypeRuleHandler {
  let instantiator = DirectInstantiator::new()
    .with_constructor(|info: &InstanceInfo| DefaultBinary {
      base: BinaryBase::new(info),
    })
    .with_constructor(|info: &InstanceInfo| DefaultSharedLibraryBinary {
      base: BinaryBase::new(info),
    })
    .with_constructor(|_: &InstanceInfo| ForeignBinary);
  BinaryTypeRuleHandler::new(Arc::new(instantiator))
}

/// A rule for `dyn Binary` bound to `T`, or declared without implementation.
pub fn binary_rule<T: 'static>(method: &str, bind: bool) -> TypeRule<dyn Binary> {
  TypeRule::new(RuleDescriptor::new("BinaryRules", method), move |builder| {
    if bind {
      builder.default_implementation::<T>();
    }
  })
}
