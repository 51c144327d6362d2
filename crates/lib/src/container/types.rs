use thiserror::Error;

use crate::instance::InstantiationError;
use crate::model::ModelType;

/// A second factory was offered for an abstract type that already has one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
  "cannot register a factory for type {abstract_type} in the {container} container: a factory for this type is already registered"
)]
pub struct DuplicateRegistrationError {
  /// Kind of container that refused the factory (e.g. `binary`).
  pub container: &'static str,
  /// Abstract type the factory was offered for.
  pub abstract_type: ModelType,
}

/// Errors that can occur when using a container or the extension set.
#[derive(Debug, Error)]
pub enum ContainerError {
  /// No factory is registered for the requested type.
  #[error("the {container} container has no factory for type {abstract_type}")]
  NoFactory {
    container: &'static str,
    abstract_type: ModelType,
  },

  /// An extension of this type was already added.
  #[error("extension {0} already exists")]
  DuplicateExtension(ModelType),

  /// The factory failed to create the instance.
  #[error("failed to create instance: {0}")]
  Instantiation(#[from] InstantiationError),
}
