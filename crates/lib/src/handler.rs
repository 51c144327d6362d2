//! Type rule handling.
//!
//! A [`TypeRuleHandler`] turns one type rule into a validated binding and,
//! when the rule supplied an implementation, a deferred registration of the
//! matching factory into the family's container.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info};

use crate::container::{FactoryContainer, install};
use crate::instance::Instantiator;
use crate::model::ModelType;
use crate::registry::{BindingRecord, BindingState, ModelRegistry, ModuleId, MutationContext, MutatorId, RegistryError};
use crate::rule::{RegistrationRule, RuleDescriptor, TypeBindingResolver, TypeBuilder, TypeRule};

/// A family of specification types sharing one container.
pub trait TypeFamily: 'static {
  /// Human-readable family name used in errors and logs.
  const KIND: &'static str;

  /// Every abstract type of the family must be assignable to this.
  type Root: ?Sized + 'static;

  /// Every implementation must be assignable to this.
  type BaseImplementation: ?Sized + 'static;

  /// The module that contributes the family's container.
  fn owning_module() -> ModuleId;
}

/// Handles type rules for the family `F`.
pub struct TypeRuleHandler<F: TypeFamily> {
  instantiator: Arc<dyn Instantiator>,
  _family: PhantomData<fn() -> F>,
}

impl<F: TypeFamily> TypeRuleHandler<F> {
  pub fn new(instantiator: Arc<dyn Instantiator>) -> Self {
    Self {
      instantiator,
      _family: PhantomData,
    }
  }

  /// Register what a rule declared about `A`.
  ///
  /// The binding is validated immediately. The rule always gains a
  /// dependency on the family's owning module; a factory registration is
  /// queued only when the rule bound an implementation. Returns the queued
  /// mutator, if any.
  pub fn register<A: ?Sized + 'static>(
    &self,
    registry: &mut ModelRegistry,
    descriptor: RuleDescriptor,
    builder: &TypeBuilder,
  ) -> Result<Option<MutatorId>, RegistryError> {
    let resolved = TypeBindingResolver::new(
      F::KIND,
      ModelType::of::<F::Root>(),
      ModelType::of::<F::BaseImplementation>(),
      registry.types(),
      self.instantiator.as_ref(),
    )
    .resolve_rule::<A>(descriptor.clone(), builder);

    let RegistrationRule {
      abstract_type,
      implementation,
      descriptor,
    } = match resolved {
      Ok(rule) => rule,
      Err(err) => {
        registry.record_binding(BindingRecord {
          rule: descriptor,
          kind: F::KIND,
          abstract_type: ModelType::of::<A>().to_string(),
          implementation: builder.implementation().map(|ty| ty.to_string()),
          state: BindingState::Rejected { reason: err.to_string() },
        });
        return Err(err.into());
      }
    };

    let module = F::owning_module();
    registry.declare_dependency(&descriptor, module);

    let Some(binding) = implementation else {
      debug!(kind = F::KIND, rule = %descriptor, abstract_type = %abstract_type, "nothing to register");
      registry.record_binding(BindingRecord {
        rule: descriptor,
        kind: F::KIND,
        abstract_type: abstract_type.to_string(),
        implementation: None,
        state: BindingState::Resolved,
      });
      return Ok(None);
    };

    let implementation_type = binding.implementation();
    let instantiator = Arc::clone(&self.instantiator);
    let mutator = registry.mutate(module, descriptor.clone(), move |ctx: &mut MutationContext<'_>| {
      let container = ctx.extension_mut::<FactoryContainer<F::Root>>()?;
      install(container, binding, instantiator)?;
      info!(
        kind = F::KIND,
        abstract_type = %abstract_type,
        implementation = %implementation_type,
        "installed factory"
      );
      Ok(())
    })?;

    registry.record_binding(BindingRecord {
      rule: descriptor,
      kind: F::KIND,
      abstract_type: abstract_type.to_string(),
      implementation: Some(implementation_type.to_string()),
      state: BindingState::Queued { mutator },
    });
    Ok(Some(mutator))
  }

  /// Run `rule` against a fresh builder and register the result.
  pub fn register_rule<A: ?Sized + 'static>(
    &self,
    registry: &mut ModelRegistry,
    rule: TypeRule<A>,
  ) -> Result<Option<MutatorId>, RegistryError> {
    let (descriptor, builder) = rule.evaluate(F::KIND);
    self.register::<A>(registry, descriptor, &builder)
  }
}
