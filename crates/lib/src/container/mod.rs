//! Named-instance factory containers.
//!
//! A [`FactoryContainer`] holds at most one [`NamedFactory`] per abstract
//! type and produces instances of that type on demand, by logical name.
//! [`install`] is the only way resolved bindings put factories into a
//! container.
//!
//! # Submodules
//!
//! - [`extensions`] - Type-keyed set of containers contributed by modules
//! - `types` - Error types

pub mod extensions;
mod types;

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use crate::instance::{InstantiationError, Instantiator, construct};
use crate::model::ModelType;
use crate::rule::ResolvedImplementation;

pub use extensions::Extensions;
pub use types::*;

type CreateFn<A> = dyn Fn(&str) -> Result<Box<A>, InstantiationError> + Send + Sync;

/// Creates instances of `A` by logical name.
pub struct NamedFactory<A: ?Sized> {
  create: Box<CreateFn<A>>,
}

impl<A: ?Sized> NamedFactory<A> {
  pub fn new(create: impl Fn(&str) -> Result<Box<A>, InstantiationError> + Send + Sync + 'static) -> Self {
    Self {
      create: Box::new(create),
    }
  }

  pub fn create(&self, name: &str) -> Result<Box<A>, InstantiationError> {
    (self.create)(name)
  }
}

impl<A: ?Sized> fmt::Debug for NamedFactory<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NamedFactory").finish_non_exhaustive()
  }
}

/// Factories for one family of specification types.
///
/// `R` is the family root (for binaries, `dyn BinarySpec`). Factories are
/// keyed by the exact abstract type they produce.
pub struct FactoryContainer<R: ?Sized> {
  kind: &'static str,
  factories: HashMap<ModelType, Box<dyn Any + Send + Sync>>,
  order: Vec<ModelType>,
  _root: PhantomData<fn() -> Box<R>>,
}

impl<R: ?Sized> FactoryContainer<R> {
  /// Create an empty container for the family called `kind`.
  pub fn new(kind: &'static str) -> Self {
    Self {
      kind,
      factories: HashMap::new(),
      order: Vec::new(),
      _root: PhantomData,
    }
  }

  pub fn kind(&self) -> &'static str {
    self.kind
  }

  /// Register the factory for abstract type `A`.
  ///
  /// Fails if `A` already has a factory; the existing one is kept.
  pub fn register_factory<A: ?Sized + 'static>(
    &mut self,
    factory: NamedFactory<A>,
  ) -> Result<(), DuplicateRegistrationError> {
    let ty = ModelType::of::<A>();
    match self.factories.entry(ty) {
      Entry::Occupied(_) => Err(DuplicateRegistrationError {
        container: self.kind,
        abstract_type: ty,
      }),
      Entry::Vacant(slot) => {
        slot.insert(Box::new(factory));
        self.order.push(ty);
        info!(container = self.kind, abstract_type = %ty, "registered factory");
        Ok(())
      }
    }
  }

  /// Create a new `A` called `name`.
  ///
  /// Every call returns a fresh instance owned by the caller.
  pub fn create<A: ?Sized + 'static>(&self, name: &str) -> Result<Box<A>, ContainerError> {
    let ty = ModelType::of::<A>();
    let factory = self
      .factories
      .get(&ty)
      .and_then(|factory| factory.downcast_ref::<NamedFactory<A>>())
      .ok_or(ContainerError::NoFactory {
        container: self.kind,
        abstract_type: ty,
      })?;
    Ok(factory.create(name)?)
  }

  pub fn has_factory(&self, ty: ModelType) -> bool {
    self.factories.contains_key(&ty)
  }

  /// Abstract types with a factory, in registration order.
  pub fn registered_types(&self) -> &[ModelType] {
    &self.order
  }
}

impl<R: ?Sized> fmt::Debug for FactoryContainer<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FactoryContainer")
      .field("kind", &self.kind)
      .field("types", &self.order)
      .finish()
  }
}

/// Install the factory for a resolved binding into `container`.
///
/// `binding` can only come from the resolver, so the implementation has
/// already been checked against the family's base implementation.
///
/// The factory builds the implementation through `instantiator` and hands it
/// out typed as `A`. A container that already serves `A` refuses the factory
/// and its error is returned unchanged.
pub fn install<R: ?Sized, A: ?Sized + 'static>(
  container: &mut FactoryContainer<R>,
  binding: ResolvedImplementation<A>,
  instantiator: Arc<dyn Instantiator>,
) -> Result<(), DuplicateRegistrationError> {
  let (implementation, upcast) = binding.into_parts();
  container.register_factory(NamedFactory::new(move |name: &str| {
    construct(implementation, name, &upcast, instantiator.as_ref())
  }))
}
