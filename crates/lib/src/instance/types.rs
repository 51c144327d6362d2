use thiserror::Error;

use crate::model::ModelType;

/// What a constructor is told about the instance it builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
  /// Logical name the instance was requested under.
  pub name: String,
  /// Implementation type being constructed.
  pub implementation: ModelType,
}

impl InstanceInfo {
  pub fn new(name: &str, implementation: ModelType) -> Self {
    Self {
      name: name.to_string(),
      implementation,
    }
  }
}

/// Errors that can occur while creating an instance.
#[derive(Debug, Error)]
pub enum InstantiationError {
  /// The strategy has no constructor for the implementation type.
  #[error("no constructor registered for {0}")]
  NoConstructor(ModelType),

  /// The strategy produced a value of another type than requested.
  #[error("expected an instance of {expected}, got {actual}")]
  WrongType { expected: ModelType, actual: ModelType },

  /// The constructed value could not be upcast to the requested type.
  #[error("instance of {implementation} is not assignable to {target}")]
  NotAssignable {
    implementation: ModelType,
    target: ModelType,
  },
}
