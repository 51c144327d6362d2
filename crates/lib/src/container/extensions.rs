//! Type-keyed set of extensions contributed by active modules.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::types::ContainerError;
use crate::model::ModelType;

/// Extensions (typically containers) keyed by their type.
///
/// Modules add their extensions when activated; mutators look them up by
/// type through their [`MutationContext`](crate::registry::MutationContext).
#[derive(Default)]
pub struct Extensions {
  entries: HashMap<ModelType, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an extension. Each type may only be added once.
  pub fn add<T: Send + Sync + 'static>(&mut self, extension: T) -> Result<(), ContainerError> {
    let ty = ModelType::of::<T>();
    if self.entries.contains_key(&ty) {
      return Err(ContainerError::DuplicateExtension(ty));
    }
    debug!(extension = %ty, "adding extension");
    self.entries.insert(ty, Box::new(extension));
    Ok(())
  }

  pub fn get<T: 'static>(&self) -> Option<&T> {
    self.entries.get(&ModelType::of::<T>())?.downcast_ref::<T>()
  }

  pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
    self.entries.get_mut(&ModelType::of::<T>())?.downcast_mut::<T>()
  }

  pub fn contains<T: 'static>(&self) -> bool {
    self.entries.contains_key(&ModelType::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl fmt::Debug for Extensions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.entries.keys()).finish()
  }
}
