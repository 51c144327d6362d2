//! Type-binding resolution.
//!
//! Checks what a rule bound against the declared type lattice and, when the
//! binding holds, produces the upcast path the factory will use.

use tracing::debug;

use super::types::{InvalidBindingError, RegistrationRule, ResolvedImplementation, RuleDescriptor, TypeBuilder};
use crate::instance::Instantiator;
use crate::model::{ModelType, TypeLattice};

/// Resolves the implementation a rule bound for one family of types.
pub struct TypeBindingResolver<'a> {
  kind: &'static str,
  root: ModelType,
  base_implementation: ModelType,
  lattice: &'a TypeLattice,
  instantiator: &'a dyn Instantiator,
}

impl<'a> TypeBindingResolver<'a> {
  /// Create a resolver for the family `kind`.
  ///
  /// Abstract types must be assignable to `root`; implementations must be
  /// assignable to `base_implementation` and constructible by `instantiator`.
  pub fn new(
    kind: &'static str,
    root: ModelType,
    base_implementation: ModelType,
    lattice: &'a TypeLattice,
    instantiator: &'a dyn Instantiator,
  ) -> Self {
    Self {
      kind,
      root,
      base_implementation,
      lattice,
      instantiator,
    }
  }

  /// Determine the implementation bound for `A`.
  ///
  /// Returns `Ok(None)` when the rule declared `A` without binding an
  /// implementation.
  pub fn resolve<A: ?Sized + 'static>(
    &self,
    builder: &TypeBuilder,
  ) -> Result<Option<ResolvedImplementation<A>>, InvalidBindingError> {
    let abstract_type = ModelType::of::<A>();
    let kind = self.kind;

    if !self.lattice.contains(abstract_type) || !self.lattice.is_assignable(abstract_type, self.root) {
      return Err(InvalidBindingError::AbstractNotSpecType {
        kind,
        abstract_type,
        root: self.root,
      });
    }

    if builder.assignments() > 1 {
      return Err(InvalidBindingError::ImplementationSetTwice { kind, abstract_type });
    }

    let Some(implementation) = builder.implementation() else {
      debug!(kind, abstract_type = %abstract_type, "type declared without implementation");
      return Ok(None);
    };

    if !self.lattice.is_assignable(implementation, self.base_implementation) {
      return Err(InvalidBindingError::NotBaseImplementation {
        kind,
        implementation,
        base: self.base_implementation,
      });
    }

    let upcast = self
      .lattice
      .upcast_path::<A>(implementation)
      .ok_or(InvalidBindingError::NotAssignable {
        kind,
        implementation,
        abstract_type,
      })?;

    if !self.instantiator.can_instantiate(implementation) {
      return Err(InvalidBindingError::NotConstructible { kind, implementation });
    }

    debug!(
      kind,
      abstract_type = %abstract_type,
      implementation = %implementation,
      steps = upcast.len(),
      "resolved implementation"
    );
    Ok(Some(ResolvedImplementation::new(implementation, upcast)))
  }

  /// Resolve a rule into its [`RegistrationRule`].
  pub fn resolve_rule<A: ?Sized + 'static>(
    &self,
    descriptor: RuleDescriptor,
    builder: &TypeBuilder,
  ) -> Result<RegistrationRule<A>, InvalidBindingError> {
    let implementation = self.resolve::<A>(builder)?;
    Ok(RegistrationRule {
      abstract_type: ModelType::of::<A>(),
      implementation,
      descriptor,
    })
  }
}
