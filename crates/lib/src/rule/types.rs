use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ModelType, UpcastPath};

/// Where a rule came from.
///
/// Shown as `source#method`, e.g. `CppPlugin.Rules#binaryTypes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleDescriptor {
  /// The rule source (plugin or rules container) declaring the rule.
  pub source: String,
  /// The rule method within the source.
  pub method: String,
}

impl RuleDescriptor {
  pub fn new(source: &str, method: &str) -> Self {
    Self {
      source: source.to_string(),
      method: method.to_string(),
    }
  }
}

impl fmt::Display for RuleDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.source, self.method)
  }
}

/// Collects what a type rule says about its type.
///
/// A fresh builder is handed to every rule invocation and consumed by
/// resolution as soon as the rule returns.
#[derive(Debug, Clone)]
pub struct TypeBuilder {
  kind: &'static str,
  implementation: Option<ModelType>,
  assignments: usize,
}

impl TypeBuilder {
  pub fn new(kind: &'static str) -> Self {
    Self {
      kind,
      implementation: None,
      assignments: 0,
    }
  }

  /// Bind `T` as the implementation of the declared type.
  pub fn default_implementation<T: 'static>(&mut self) -> &mut Self {
    self.default_implementation_type(ModelType::of::<T>())
  }

  /// Bind `implementation` as the implementation of the declared type.
  pub fn default_implementation_type(&mut self, implementation: ModelType) -> &mut Self {
    self.implementation = Some(implementation);
    self.assignments += 1;
    self
  }

  /// Family the builder collects for (e.g. `binary`).
  pub fn kind(&self) -> &'static str {
    self.kind
  }

  pub fn implementation(&self) -> Option<ModelType> {
    self.implementation
  }

  pub(crate) fn assignments(&self) -> usize {
    self.assignments
  }
}

type RuleBody = Box<dyn FnOnce(&mut TypeBuilder)>;

/// A rule declaring the abstract type `A`, as handed over by rule discovery.
pub struct TypeRule<A: ?Sized> {
  descriptor: RuleDescriptor,
  body: RuleBody,
  _abstract: PhantomData<fn() -> Box<A>>,
}

impl<A: ?Sized + 'static> TypeRule<A> {
  pub fn new(descriptor: RuleDescriptor, body: impl FnOnce(&mut TypeBuilder) + 'static) -> Self {
    Self {
      descriptor,
      body: Box::new(body),
      _abstract: PhantomData,
    }
  }

  pub fn descriptor(&self) -> &RuleDescriptor {
    &self.descriptor
  }

  pub fn abstract_type(&self) -> ModelType {
    ModelType::of::<A>()
  }

  /// Run the rule body against a fresh builder for `kind`.
  pub fn evaluate(self, kind: &'static str) -> (RuleDescriptor, TypeBuilder) {
    let mut builder = TypeBuilder::new(kind);
    (self.body)(&mut builder);
    (self.descriptor, builder)
  }
}

impl<A: ?Sized + 'static> fmt::Debug for TypeRule<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeRule")
      .field("descriptor", &self.descriptor)
      .field("abstract_type", &self.abstract_type())
      .finish_non_exhaustive()
  }
}

/// An implementation proven assignable to the abstract type `A`.
///
/// Only [`TypeBindingResolver::resolve`](super::TypeBindingResolver::resolve)
/// produces one, so holding a value means every binding check passed.
///
/// ```compile_fail
/// use typebind_lib::model::{ModelType, TypeLattice};
/// use typebind_lib::rule::ResolvedImplementation;
///
/// let lattice = TypeLattice::new();
/// let _forged = ResolvedImplementation::<String> {
///   implementation: ModelType::of::<String>(),
///   upcast: lattice.upcast_path::<String>(ModelType::of::<String>()).unwrap(),
/// };
/// ```
pub struct ResolvedImplementation<A: ?Sized> {
  implementation: ModelType,
  upcast: UpcastPath<A>,
}

impl<A: ?Sized + 'static> ResolvedImplementation<A> {
  pub(crate) fn new(implementation: ModelType, upcast: UpcastPath<A>) -> Self {
    Self { implementation, upcast }
  }

  /// The bound implementation type.
  pub fn implementation(&self) -> ModelType {
    self.implementation
  }

  /// Conversion from the implementation to `A`.
  pub fn upcast(&self) -> &UpcastPath<A> {
    &self.upcast
  }

  pub(crate) fn into_parts(self) -> (ModelType, UpcastPath<A>) {
    (self.implementation, self.upcast)
  }
}

impl<A: ?Sized> Clone for ResolvedImplementation<A> {
  fn clone(&self) -> Self {
    Self {
      implementation: self.implementation,
      upcast: self.upcast.clone(),
    }
  }
}

impl<A: ?Sized + 'static> fmt::Debug for ResolvedImplementation<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResolvedImplementation")
      .field("implementation", &self.implementation)
      .field("upcast", &self.upcast)
      .finish()
  }
}

/// Outcome of resolving one rule: the abstract type, its implementation if
/// the rule supplied one, and the rule's provenance.
pub struct RegistrationRule<A: ?Sized> {
  pub abstract_type: ModelType,
  pub implementation: Option<ResolvedImplementation<A>>,
  pub descriptor: RuleDescriptor,
}

impl<A: ?Sized + 'static> fmt::Debug for RegistrationRule<A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RegistrationRule")
      .field("abstract_type", &self.abstract_type)
      .field("implementation", &self.implementation)
      .field("descriptor", &self.descriptor)
      .finish()
  }
}

/// A rule bound an implementation the model cannot accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBindingError {
  /// The declared type does not derive from the family root.
  #[error("{kind} type {abstract_type} must extend {root}")]
  AbstractNotSpecType {
    kind: &'static str,
    abstract_type: ModelType,
    root: ModelType,
  },

  /// The rule set the implementation more than once.
  #[error("{kind} type {abstract_type} cannot set its default implementation multiple times")]
  ImplementationSetTwice {
    kind: &'static str,
    abstract_type: ModelType,
  },

  /// The implementation does not derive from the family's base implementation.
  #[error("{kind} implementation {implementation} must extend {base}")]
  NotBaseImplementation {
    kind: &'static str,
    implementation: ModelType,
    base: ModelType,
  },

  /// The implementation is not assignable to the declared type.
  #[error("{kind} implementation {implementation} must implement {abstract_type}")]
  NotAssignable {
    kind: &'static str,
    implementation: ModelType,
    abstract_type: ModelType,
  },

  /// The instantiation strategy cannot build the implementation.
  #[error("{kind} implementation {implementation} has no registered constructor")]
  NotConstructible {
    kind: &'static str,
    implementation: ModelType,
  },
}
