//! The model registry: modules, rule dependencies and deferred registrations.
//!
//! Rules never touch containers directly. They queue a [`Mutator`] tagged with
//! the module that owns the container, and the registry delivers it once that
//! module is active. Queueing against a module the rule did not declare as a
//! dependency is refused.
//!
//! Modules form a requirement graph. Activating a module applies everything it
//! requires first, in dependency order, and then delivers whatever became
//! ready.
//!
//! # Submodules
//!
//! - [`module`] - The [`Module`] trait
//! - `types` - Ids, queued messages, the binding ledger and errors

pub mod module;
mod types;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::container::Extensions;
use crate::model::TypeLattice;
use crate::rule::RuleDescriptor;

pub use module::Module;
pub use types::*;

/// Owns the model under configuration.
pub struct ModelRegistry {
  config: RegistryConfig,
  types: TypeLattice,
  extensions: Extensions,

  /// Registered modules by id.
  modules: HashMap<ModuleId, Box<dyn Module>>,
  /// Requirement graph, edges point from a requirement to its dependent.
  module_graph: DiGraph<ModuleId, ()>,
  module_nodes: HashMap<ModuleId, NodeIndex>,
  /// Active modules, in activation order.
  active: Vec<ModuleId>,

  /// Modules each rule declared a dependency on.
  dependencies: HashMap<RuleDescriptor, BTreeSet<ModuleId>>,
  pending: VecDeque<PendingRegistration>,
  next_mutator: u64,

  bindings: Vec<BindingRecord>,
  /// Ledger index of every binding waiting on a mutator.
  queued: HashMap<MutatorId, usize>,
}

impl Default for ModelRegistry {
  fn default() -> Self {
    Self::new(RegistryConfig::default())
  }
}

impl ModelRegistry {
  pub fn new(config: RegistryConfig) -> Self {
    Self {
      config,
      types: TypeLattice::new(),
      extensions: Extensions::new(),
      modules: HashMap::new(),
      module_graph: DiGraph::new(),
      module_nodes: HashMap::new(),
      active: Vec::new(),
      dependencies: HashMap::new(),
      pending: VecDeque::new(),
      next_mutator: 0,
      bindings: Vec::new(),
      queued: HashMap::new(),
    }
  }

  pub fn config(&self) -> &RegistryConfig {
    &self.config
  }

  /// The declared type lattice.
  pub fn types(&self) -> &TypeLattice {
    &self.types
  }

  pub fn types_mut(&mut self) -> &mut TypeLattice {
    &mut self.types
  }

  /// Extensions contributed by active modules.
  pub fn extensions(&self) -> &Extensions {
    &self.extensions
  }

  pub fn extensions_mut(&mut self) -> &mut Extensions {
    &mut self.extensions
  }

  /// Register a module. Its requirements may be registered later.
  ///
  /// Fails if the id is taken or the module would require itself.
  pub fn register_module(&mut self, module: impl Module + 'static) -> Result<(), SchedulingError> {
    let id = module.id();
    if self.modules.contains_key(&id) {
      return Err(SchedulingError::DuplicateModule(id));
    }

    let requires = module.requires();
    let node = self.module_node(id);
    let mut required = Vec::with_capacity(requires.len());
    for requirement in requires {
      let from = self.module_node(requirement);
      if has_path_connecting(&self.module_graph, node, from, None) {
        return Err(SchedulingError::ModuleCycle(id));
      }
      required.push(from);
    }

    for from in required {
      self.module_graph.update_edge(from, node, ());
    }
    self.modules.insert(id, Box::new(module));
    debug!(module = %id, "registered module");
    Ok(())
  }

  pub fn is_registered(&self, id: ModuleId) -> bool {
    self.modules.contains_key(&id)
  }

  pub fn is_active(&self, id: ModuleId) -> bool {
    self.active.contains(&id)
  }

  /// Active modules, in activation order.
  pub fn active_modules(&self) -> &[ModuleId] {
    &self.active
  }

  /// Record that `rule` depends on `module`.
  pub fn declare_dependency(&mut self, rule: &RuleDescriptor, module: ModuleId) {
    if self.dependencies.entry(rule.clone()).or_default().insert(module) {
      debug!(rule = %rule, module = %module, "declared rule dependency");
    }
  }

  /// Modules `rule` declared a dependency on.
  pub fn dependencies_of(&self, rule: &RuleDescriptor) -> impl Iterator<Item = ModuleId> + '_ {
    self.dependencies.get(rule).into_iter().flatten().copied()
  }

  /// Queue `mutator` to run once `module` is active.
  ///
  /// The mutator never runs here, even if the module is already active; it
  /// runs on the next delivery.
  pub fn mutate(
    &mut self,
    module: ModuleId,
    rule: RuleDescriptor,
    mutator: impl FnOnce(&mut MutationContext<'_>) -> Result<(), RegistryError> + 'static,
  ) -> Result<MutatorId, SchedulingError> {
    let declared = self.dependencies.get(&rule).is_some_and(|modules| modules.contains(&module));
    if !declared {
      return Err(SchedulingError::UndeclaredDependency { rule, module });
    }

    let id = MutatorId(self.next_mutator);
    self.next_mutator += 1;
    debug!(mutator = %id, rule = %rule, module = %module, "queued registration");
    self.pending.push_back(PendingRegistration {
      id,
      rule,
      module,
      mutator: Box::new(mutator),
    });
    Ok(id)
  }

  /// Number of queued registrations that have not run.
  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Activate `id` and everything it requires, then deliver.
  ///
  /// Returns the number of mutators delivered. Activating an active module
  /// only delivers.
  pub fn activate(&mut self, id: ModuleId) -> Result<usize, RegistryError> {
    let start = self
      .module_nodes
      .get(&id)
      .copied()
      .filter(|_| self.modules.contains_key(&id))
      .ok_or(SchedulingError::UnknownModule(id))?;

    let mut needed = HashSet::new();
    let mut dfs = Dfs::new(Reversed(&self.module_graph), start);
    while let Some(idx) = dfs.next(Reversed(&self.module_graph)) {
      let module = self.module_graph[idx];
      if !self.modules.contains_key(&module) {
        return Err(SchedulingError::UnknownModule(module).into());
      }
      needed.insert(idx);
    }

    let order = toposort(&self.module_graph, None)
      .map_err(|cycle| SchedulingError::ModuleCycle(self.module_graph[cycle.node_id()]))?;

    for idx in order.into_iter().filter(|idx| needed.contains(idx)) {
      let module_id = self.module_graph[idx];
      if self.is_active(module_id) {
        continue;
      }
      let module = self
        .modules
        .get(&module_id)
        .ok_or(SchedulingError::UnknownModule(module_id))?;
      module.apply(&mut self.extensions)?;
      self.active.push(module_id);
      info!(module = %module_id, "activated module");
    }

    self.deliver()
  }

  /// Run every queued mutator whose module is active, in queue order.
  ///
  /// Each mutator runs once. The first failure stops delivery and is
  /// returned; the failed mutator is consumed and the rest stay queued.
  pub fn deliver(&mut self) -> Result<usize, RegistryError> {
    let mut delivered = 0;
    let mut waiting = VecDeque::with_capacity(self.pending.len());

    while let Some(message) = self.pending.pop_front() {
      if !self.is_active(message.module) {
        waiting.push_back(message);
        continue;
      }

      let PendingRegistration {
        id,
        rule,
        module,
        mutator,
      } = message;
      let mut context = MutationContext::new(&mut self.extensions, &rule, module);
      match mutator(&mut context) {
        Ok(()) => {
          debug!(mutator = %id, rule = %rule, module = %module, "delivered registration");
          self.settle(id, BindingState::Installed);
          delivered += 1;
        }
        Err(err) => {
          self.settle(id, BindingState::Rejected { reason: err.to_string() });
          waiting.append(&mut self.pending);
          self.pending = waiting;
          return Err(err);
        }
      }
    }

    self.pending = waiting;
    Ok(delivered)
  }

  /// Finish configuring the model.
  ///
  /// With `auto_activate`, every registered module some rule depends on is
  /// activated first. Registrations still waiting afterwards are reported,
  /// not treated as errors.
  pub fn realize(&mut self) -> Result<RealizeReport, RegistryError> {
    let mut report = RealizeReport::default();

    if self.config.auto_activate {
      let wanted: BTreeSet<ModuleId> = self
        .dependencies
        .values()
        .flatten()
        .copied()
        .filter(|id| self.modules.contains_key(id))
        .collect();

      for id in wanted {
        if self.is_active(id) {
          continue;
        }
        let before = self.active.len();
        report.delivered += self.activate(id)?;
        report.activated.extend_from_slice(&self.active[before..]);
      }
    }

    report.delivered += self.deliver()?;
    report.pending = self.pending.len();

    for message in &self.pending {
      if self.config.warn_unfired {
        warn!(rule = %message.rule, module = %message.module, "registration never fired: module is not active");
      } else {
        debug!(rule = %message.rule, module = %message.module, "registration never fired: module is not active");
      }
    }

    info!(
      activated = report.activated.len(),
      delivered = report.delivered,
      pending = report.pending,
      "realized model"
    );
    Ok(report)
  }

  /// Add an entry to the binding ledger.
  pub fn record_binding(&mut self, record: BindingRecord) {
    if let BindingState::Queued { mutator } = record.state {
      self.queued.insert(mutator, self.bindings.len());
    }
    self.bindings.push(record);
  }

  /// Every binding seen so far, in registration order.
  pub fn bindings(&self) -> &[BindingRecord] {
    &self.bindings
  }

  fn settle(&mut self, mutator: MutatorId, state: BindingState) {
    if let Some(index) = self.queued.remove(&mutator)
      && let Some(record) = self.bindings.get_mut(index)
    {
      record.state = state;
    }
  }

  fn module_node(&mut self, id: ModuleId) -> NodeIndex {
    *self
      .module_nodes
      .entry(id)
      .or_insert_with(|| self.module_graph.add_node(id))
  }
}

impl std::fmt::Debug for ModelRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ModelRegistry")
      .field("config", &self.config)
      .field("types", &self.types)
      .field("extensions", &self.extensions)
      .field("active", &self.active)
      .field("pending", &self.pending.len())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::rc::Rc;

  use tracing_test::traced_test;

  use super::*;
  use crate::container::ContainerError;

  #[derive(Debug, Default)]
  struct Log(Vec<&'static str>);

  struct TestModule {
    id: &'static str,
    requires: Vec<ModuleId>,
  }

  impl TestModule {
    fn new(id: &'static str) -> Self {
      Self {
        id,
        requires: Vec::new(),
      }
    }

    fn requiring(mut self, id: &'static str) -> Self {
      self.requires.push(ModuleId(id));
      self
    }
  }

  impl Module for TestModule {
    fn id(&self) -> ModuleId {
      ModuleId(self.id)
    }

    fn requires(&self) -> Vec<ModuleId> {
      self.requires.clone()
    }

    fn apply(&self, extensions: &mut Extensions) -> Result<(), ContainerError> {
      if extensions.get::<Log>().is_none() {
        extensions.add(Log::default())?;
      }
      if let Some(log) = extensions.get_mut::<Log>() {
        log.0.push(self.id);
      }
      Ok(())
    }
  }

  const BASE: ModuleId = ModuleId("base");
  const TOP: ModuleId = ModuleId("top");

  fn rule() -> RuleDescriptor {
    RuleDescriptor::new("Rules", "types")
  }

  fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::default();
    registry.register_module(TestModule::new("base")).unwrap();
    registry.register_module(TestModule::new("top").requiring("base")).unwrap();
    registry
  }

  fn boxed(mutator: impl FnOnce(&mut MutationContext<'_>) -> Result<(), RegistryError> + 'static) -> Mutator {
    Box::new(mutator)
  }

  fn counter() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Mutator) {
    let runs = Rc::new(RefCell::new(Vec::new()));
    let handle = Rc::clone(&runs);
    let make = move |n: u32| -> Mutator {
      let runs = Rc::clone(&handle);
      boxed(move |_| {
        runs.borrow_mut().push(n);
        Ok(())
      })
    };
    (runs, make)
  }

  mod modules {
    use super::*;

    #[test]
    fn duplicate_module_is_rejected() {
      let mut registry = registry();
      let err = registry.register_module(TestModule::new("base")).unwrap_err();
      assert_eq!(err, SchedulingError::DuplicateModule(BASE));
    }

    #[test]
    fn requirement_cycle_is_rejected() {
      let mut registry = ModelRegistry::default();
      registry.register_module(TestModule::new("a").requiring("b")).unwrap();
      let err = registry.register_module(TestModule::new("b").requiring("a")).unwrap_err();

      assert_eq!(err, SchedulingError::ModuleCycle(ModuleId("b")));
      assert!(!registry.is_registered(ModuleId("b")));
    }

    #[test]
    fn activation_applies_requirements_first() {
      let mut registry = registry();
      registry.activate(TOP).unwrap();

      assert_eq!(registry.active_modules(), &[BASE, TOP]);
      assert_eq!(registry.extensions().get::<Log>().unwrap().0, vec!["base", "top"]);
    }

    #[test]
    fn modules_are_applied_once() {
      let mut registry = registry();
      registry.activate(BASE).unwrap();
      registry.activate(TOP).unwrap();
      registry.activate(TOP).unwrap();

      assert_eq!(registry.extensions().get::<Log>().unwrap().0, vec!["base", "top"]);
    }

    #[test]
    fn unknown_module_cannot_be_activated() {
      let mut registry = registry();
      let err = registry.activate(ModuleId("missing")).unwrap_err();
      assert!(matches!(
        err,
        RegistryError::Scheduling(SchedulingError::UnknownModule(ModuleId("missing")))
      ));
    }

    #[test]
    fn unregistered_requirement_blocks_activation() {
      let mut registry = ModelRegistry::default();
      registry.register_module(TestModule::new("top").requiring("base")).unwrap();

      let err = registry.activate(TOP).unwrap_err();
      assert!(matches!(err, RegistryError::Scheduling(SchedulingError::UnknownModule(BASE))));
      assert!(registry.active_modules().is_empty());
    }
  }

  mod mutators {
    use super::*;

    #[test]
    fn undeclared_dependency_is_refused() {
      let mut registry = registry();
      let (_, make) = counter();

      let err = registry.mutate(BASE, rule(), make(1)).unwrap_err();
      assert_eq!(
        err,
        SchedulingError::UndeclaredDependency {
          rule: rule(),
          module: BASE
        }
      );
      assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn mutators_wait_for_their_module() {
      let mut registry = registry();
      let (runs, make) = counter();
      registry.declare_dependency(&rule(), TOP);
      registry.mutate(TOP, rule(), make(1)).unwrap();

      assert_eq!(registry.activate(BASE).unwrap(), 0);
      assert!(runs.borrow().is_empty());

      assert_eq!(registry.activate(TOP).unwrap(), 1);
      assert_eq!(*runs.borrow(), vec![1]);
    }

    #[test]
    fn queueing_against_an_active_module_does_not_run_immediately() {
      let mut registry = registry();
      let (runs, make) = counter();
      registry.activate(BASE).unwrap();
      registry.declare_dependency(&rule(), BASE);

      registry.mutate(BASE, rule(), make(1)).unwrap();
      assert!(runs.borrow().is_empty());

      assert_eq!(registry.deliver().unwrap(), 1);
      assert_eq!(*runs.borrow(), vec![1]);
    }

    #[test]
    fn delivery_is_fifo_and_runs_each_mutator_once() {
      let mut registry = registry();
      let (runs, make) = counter();
      registry.declare_dependency(&rule(), BASE);
      for n in 1..=3 {
        registry.mutate(BASE, rule(), make(n)).unwrap();
      }

      registry.activate(BASE).unwrap();
      registry.deliver().unwrap();
      registry.activate(BASE).unwrap();

      assert_eq!(*runs.borrow(), vec![1, 2, 3]);
      assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn first_failure_stops_delivery() {
      let mut registry = registry();
      let (runs, make) = counter();
      registry.declare_dependency(&rule(), BASE);
      registry.mutate(BASE, rule(), make(1)).unwrap();
      registry
        .mutate(BASE, rule(), |ctx: &mut MutationContext<'_>| {
          ctx.extension_mut::<String>()?;
          Ok(())
        })
        .unwrap();
      registry.mutate(BASE, rule(), make(3)).unwrap();

      let err = registry.activate(BASE).unwrap_err();
      assert!(matches!(
        err,
        RegistryError::Scheduling(SchedulingError::MissingExtension { .. })
      ));
      assert_eq!(*runs.borrow(), vec![1]);
      assert_eq!(registry.pending_count(), 1);

      assert_eq!(registry.deliver().unwrap(), 1);
      assert_eq!(*runs.borrow(), vec![1, 3]);
    }

    #[test]
    fn context_exposes_rule_module_and_extensions() {
      let mut registry = registry();
      registry.declare_dependency(&rule(), TOP);
      registry
        .mutate(TOP, rule(), |ctx: &mut MutationContext<'_>| {
          assert_eq!(ctx.rule(), &RuleDescriptor::new("Rules", "types"));
          assert_eq!(ctx.module(), TOP);
          ctx.extension_mut::<Log>()?.0.push("mutator");
          Ok(())
        })
        .unwrap();

      registry.activate(TOP).unwrap();
      assert_eq!(registry.extensions().get::<Log>().unwrap().0, vec!["base", "top", "mutator"]);
    }
  }

  mod realize {
    use super::*;

    #[test]
    fn activates_modules_rules_depend_on() {
      let mut registry = registry();
      let (runs, make) = counter();
      registry.declare_dependency(&rule(), TOP);
      registry.mutate(TOP, rule(), make(7)).unwrap();

      let report = registry.realize().unwrap();

      assert_eq!(report.activated, vec![BASE, TOP]);
      assert_eq!(report.delivered, 1);
      assert_eq!(report.pending, 0);
      assert_eq!(*runs.borrow(), vec![7]);
    }

    #[test]
    #[traced_test]
    fn unfired_registrations_are_reported() {
      let config = RegistryConfig {
        auto_activate: false,
        warn_unfired: true,
      };
      let mut registry = ModelRegistry::new(config);
      registry.register_module(TestModule::new("base")).unwrap();
      let (runs, make) = counter();
      registry.declare_dependency(&rule(), BASE);
      registry.mutate(BASE, rule(), make(1)).unwrap();

      let report = registry.realize().unwrap();

      assert!(report.activated.is_empty());
      assert_eq!(report.pending, 1);
      assert!(runs.borrow().is_empty());
      assert!(logs_contain("registration never fired"));
    }

    #[test]
    fn dependencies_on_unregistered_modules_stay_pending() {
      let mut registry = ModelRegistry::default();
      let (_, make) = counter();
      registry.declare_dependency(&rule(), ModuleId("elsewhere"));
      registry.mutate(ModuleId("elsewhere"), rule(), make(1)).unwrap();

      let report = registry.realize().unwrap();
      assert!(report.activated.is_empty());
      assert_eq!(report.pending, 1);
    }
  }

  mod ledger {
    use super::*;

    fn record(state: BindingState) -> BindingRecord {
      BindingRecord {
        rule: rule(),
        kind: "test",
        abstract_type: "Thing".to_string(),
        implementation: Some("DefaultThing".to_string()),
        state,
      }
    }

    #[test]
    fn delivered_bindings_become_installed() {
      let mut registry = registry();
      let (_, make) = counter();
      registry.declare_dependency(&rule(), BASE);
      let mutator = registry.mutate(BASE, rule(), make(1)).unwrap();
      registry.record_binding(record(BindingState::Queued { mutator }));

      registry.activate(BASE).unwrap();

      assert_eq!(registry.bindings()[0].state, BindingState::Installed);
    }

    #[test]
    fn failed_bindings_become_rejected() {
      let mut registry = registry();
      registry.declare_dependency(&rule(), BASE);
      let mutator = registry
        .mutate(BASE, rule(), |ctx: &mut MutationContext<'_>| {
          ctx.extension_mut::<String>()?;
          Ok(())
        })
        .unwrap();
      registry.record_binding(record(BindingState::Queued { mutator }));

      registry.activate(BASE).unwrap_err();

      assert!(matches!(
        &registry.bindings()[0].state,
        BindingState::Rejected { reason } if reason.contains("String")
      ));
    }
  }
}
