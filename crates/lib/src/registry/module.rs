//! Modules that contribute extensions to the model.

use super::types::ModuleId;
use crate::container::{ContainerError, Extensions};

/// A unit of model configuration (a plugin).
///
/// Activating a module applies its requirements first and then the module
/// itself. Each module is applied at most once per registry.
pub trait Module {
  fn id(&self) -> ModuleId;

  /// Modules that must be active before this one.
  fn requires(&self) -> Vec<ModuleId> {
    Vec::new()
  }

  /// Contribute this module's extensions.
  fn apply(&self, extensions: &mut Extensions) -> Result<(), ContainerError>;
}
