//! Instance construction.
//!
//! An [`Instantiator`] knows how to build a value of an implementation type,
//! given its [`InstanceInfo`]. [`construct`] combines that with an
//! [`UpcastPath`] so callers receive the value typed as the abstract type
//! they asked for.

mod types;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::model::{ErasedBox, ModelType, UpcastPath};

pub use types::*;

/// Strategy for creating instances of implementation types.
pub trait Instantiator: Send + Sync {
  /// Whether `implementation` can be constructed by this strategy.
  fn can_instantiate(&self, implementation: ModelType) -> bool;

  /// Create a new instance of `implementation`.
  ///
  /// The returned box must hold a value of exactly `implementation`.
  fn new_instance(&self, implementation: ModelType, info: &InstanceInfo) -> Result<ErasedBox, InstantiationError>;
}

type Constructor = Arc<dyn Fn(&InstanceInfo) -> ErasedBox + Send + Sync>;

/// Default strategy: a table of constructor functions, one per type.
///
/// Constructors are supplied by each implementation type when it is made
/// available for binding.
#[derive(Default, Clone)]
pub struct DirectInstantiator {
  constructors: HashMap<ModelType, Constructor>,
}

impl DirectInstantiator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register the constructor for `T`, replacing any previous one.
  pub fn with_constructor<T: 'static>(
    mut self,
    constructor: impl Fn(&InstanceInfo) -> T + Send + Sync + 'static,
  ) -> Self {
    self.register(constructor);
    self
  }

  /// Register the constructor for `T`, replacing any previous one.
  pub fn register<T: 'static>(&mut self, constructor: impl Fn(&InstanceInfo) -> T + Send + Sync + 'static) {
    let ty = ModelType::of::<T>();
    debug!(implementation = %ty, "registering constructor");
    self
      .constructors
      .insert(ty, Arc::new(move |info: &InstanceInfo| ErasedBox::new(Box::new(constructor(info)))));
  }
}

impl Instantiator for DirectInstantiator {
  fn can_instantiate(&self, implementation: ModelType) -> bool {
    self.constructors.contains_key(&implementation)
  }

  fn new_instance(&self, implementation: ModelType, info: &InstanceInfo) -> Result<ErasedBox, InstantiationError> {
    let constructor = self
      .constructors
      .get(&implementation)
      .ok_or(InstantiationError::NoConstructor(implementation))?;
    Ok(constructor(info))
  }
}

impl fmt::Debug for DirectInstantiator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DirectInstantiator")
      .field("types", &self.constructors.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// Build a new `implementation` named `name`, typed as `A`.
///
/// Each call yields a fresh instance owned by the caller. The upcast to `A`
/// is only performed through `upcast`, which the lattice produced after
/// proving `implementation` assignable to `A`.
pub fn construct<A: ?Sized + 'static>(
  implementation: ModelType,
  name: &str,
  upcast: &UpcastPath<A>,
  instantiator: &dyn Instantiator,
) -> Result<Box<A>, InstantiationError> {
  let info = InstanceInfo::new(name, implementation);
  let created = instantiator.new_instance(implementation, &info)?;

  if created.model_type() != implementation {
    return Err(InstantiationError::WrongType {
      expected: implementation,
      actual: created.model_type(),
    });
  }

  upcast.apply(created).map_err(|_| InstantiationError::NotAssignable {
    implementation,
    target: ModelType::of::<A>(),
  })
}
