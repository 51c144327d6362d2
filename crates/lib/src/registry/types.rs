use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::container::{ContainerError, DuplicateRegistrationError, Extensions};
use crate::model::ModelType;
use crate::rule::{InvalidBindingError, RuleDescriptor};

/// Identifier of a module (plugin), e.g. `component-model-base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub &'static str);

impl fmt::Display for ModuleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0)
  }
}

/// Handle of a queued registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MutatorId(pub(crate) u64);

impl fmt::Display for MutatorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A deferred registration. Runs at most once, after its module is active.
pub type Mutator = Box<dyn FnOnce(&mut MutationContext<'_>) -> Result<(), RegistryError>>;

/// What a mutator can see when it runs.
pub struct MutationContext<'a> {
  extensions: &'a mut Extensions,
  rule: &'a RuleDescriptor,
  module: ModuleId,
}

impl<'a> MutationContext<'a> {
  pub(crate) fn new(extensions: &'a mut Extensions, rule: &'a RuleDescriptor, module: ModuleId) -> Self {
    Self {
      extensions,
      rule,
      module,
    }
  }

  /// The rule that queued the mutator.
  pub fn rule(&self) -> &RuleDescriptor {
    self.rule
  }

  /// The module the mutator waited for.
  pub fn module(&self) -> ModuleId {
    self.module
  }

  pub fn extensions(&self) -> &Extensions {
    self.extensions
  }

  pub fn extensions_mut(&mut self) -> &mut Extensions {
    self.extensions
  }

  /// Look up the extension of type `T`.
  ///
  /// A missing extension means the module the mutator waited for did not
  /// contribute what the rule expected.
  pub fn extension_mut<T: 'static>(&mut self) -> Result<&mut T, SchedulingError> {
    let rule = self.rule;
    self
      .extensions
      .get_mut::<T>()
      .ok_or_else(|| SchedulingError::MissingExtension {
        rule: rule.clone(),
        extension: ModelType::of::<T>(),
      })
  }
}

/// A mutator waiting in the registry queue, tagged with its module.
pub struct PendingRegistration {
  pub id: MutatorId,
  pub rule: RuleDescriptor,
  pub module: ModuleId,
  pub mutator: Mutator,
}

impl fmt::Debug for PendingRegistration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PendingRegistration")
      .field("id", &self.id)
      .field("rule", &self.rule)
      .field("module", &self.module)
      .finish_non_exhaustive()
  }
}

/// Violations of the scheduling contract between rules and modules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
  /// A rule queued a mutator for a module it never declared a dependency on.
  #[error("rule {rule} cannot register against module {module}: no dependency on it was declared")]
  UndeclaredDependency { rule: RuleDescriptor, module: ModuleId },

  /// The module was never registered.
  #[error("unknown module {0}")]
  UnknownModule(ModuleId),

  /// A module with this id is already registered.
  #[error("module {0} is already registered")]
  DuplicateModule(ModuleId),

  /// The module requires itself through its requirements.
  #[error("module {0} is part of a requirement cycle")]
  ModuleCycle(ModuleId),

  /// An active module did not provide the extension a mutator needs.
  #[error("rule {rule} needs extension {extension}, which no active module provides")]
  MissingExtension { rule: RuleDescriptor, extension: ModelType },
}

/// Errors returned by registry and rule handler operations.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// A rule bound an invalid implementation.
  #[error(transparent)]
  InvalidBinding(#[from] InvalidBindingError),

  /// A factory for the abstract type was already installed.
  #[error(transparent)]
  DuplicateRegistration(#[from] DuplicateRegistrationError),

  /// A module failed to contribute its extensions.
  #[error(transparent)]
  Container(#[from] ContainerError),

  /// The scheduling contract was violated.
  #[error(transparent)]
  Scheduling(#[from] SchedulingError),
}

/// Where a binding is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BindingState {
  /// Resolved without an implementation; nothing to install.
  Resolved,
  /// Waiting for the owning module.
  Queued { mutator: MutatorId },
  /// The factory is in the container.
  Installed,
  /// Resolution or installation failed.
  Rejected { reason: String },
}

/// One entry of the binding ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingRecord {
  pub rule: RuleDescriptor,
  /// Family of the binding (e.g. `binary`).
  pub kind: &'static str,
  pub abstract_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub implementation: Option<String>,
  #[serde(flatten)]
  pub state: BindingState,
}

/// Summary of [`ModelRegistry::realize`](super::ModelRegistry::realize).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RealizeReport {
  /// Modules activated while realizing, in activation order.
  pub activated: Vec<ModuleId>,
  /// Mutators that ran while realizing.
  pub delivered: usize,
  /// Mutators whose module never became active.
  pub pending: usize,
}
