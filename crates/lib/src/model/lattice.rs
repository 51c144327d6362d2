//! The declared subtype graph.
//!
//! Nodes are [`ModelType`]s, and an edge `S -> T` states that every `S` is also
//! a `T`. The edge stores the conversion `Box<S> -> Box<T>` given when it was
//! declared, so an assignability answer from the lattice always comes with a
//! way to perform the upcast.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use petgraph::algo::{astar, has_path_connecting};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use tracing::debug;

use super::types::{ErasedBox, ModelType};

/// One declared upcast, applied to an erased value.
type Conversion = Arc<dyn Fn(ErasedBox) -> Result<ErasedBox, ErasedBox> + Send + Sync>;

/// Declared subtype relationships between model types.
#[derive(Default)]
pub struct TypeLattice {
  graph: DiGraph<ModelType, Conversion>,
  nodes: HashMap<ModelType, NodeIndex>,
}

impl TypeLattice {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare `T` without any supertypes. Declaring twice is a no-op.
  pub fn declare<T: ?Sized + 'static>(&mut self) -> ModelType {
    let ty = ModelType::of::<T>();
    self.node(ty);
    ty
  }

  /// Declare that every `S` is a `T`.
  ///
  /// `upcast` is normally `|b| b`: the compiler only accepts it when `Box<S>`
  /// coerces to `Box<T>`, so the edge cannot lie. Both types are declared if
  /// they were not already. Re-declaring an existing edge keeps the first
  /// conversion, and a self edge (`S == T`) is ignored.
  pub fn extend<S, T>(&mut self, upcast: impl Fn(Box<S>) -> Box<T> + Send + Sync + 'static) -> &mut Self
  where
    S: ?Sized + 'static,
    T: ?Sized + 'static,
  {
    let sub = ModelType::of::<S>();
    let sup = ModelType::of::<T>();
    if sub == sup {
      debug!(ty = %sub, "ignoring self edge");
      return self;
    }

    let from = self.node(sub);
    let to = self.node(sup);
    if self.graph.find_edge(from, to).is_some() {
      debug!(sub = %sub, sup = %sup, "supertype already declared");
      return self;
    }

    let conversion: Conversion =
      Arc::new(move |value: ErasedBox| value.downcast::<S>().map(|sub| ErasedBox::new(upcast(sub))));
    self.graph.add_edge(from, to, conversion);
    debug!(sub = %sub, sup = %sup, "declared supertype");
    self
  }

  /// Whether `ty` has been declared.
  pub fn contains(&self, ty: ModelType) -> bool {
    self.nodes.contains_key(&ty)
  }

  /// Number of declared types.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Whether a value of type `from` may be used where `to` is expected.
  ///
  /// Every type is assignable to itself, declared or not.
  pub fn is_assignable(&self, from: ModelType, to: ModelType) -> bool {
    if from == to {
      return true;
    }
    match (self.nodes.get(&from), self.nodes.get(&to)) {
      (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
      _ => false,
    }
  }

  /// All types `ty` is assignable to, excluding itself, breadth first.
  pub fn supertypes(&self, ty: ModelType) -> Vec<ModelType> {
    let Some(&start) = self.nodes.get(&ty) else {
      return Vec::new();
    };

    let mut bfs = Bfs::new(&self.graph, start);
    let mut found = Vec::new();
    while let Some(idx) = bfs.next(&self.graph) {
      if idx != start {
        found.push(self.graph[idx]);
      }
    }
    found
  }

  /// The shortest chain of declared upcasts from `from` to `T`.
  ///
  /// Returns `None` when `from` is not assignable to `T`.
  pub fn upcast_path<T: ?Sized + 'static>(&self, from: ModelType) -> Option<UpcastPath<T>> {
    let target = ModelType::of::<T>();
    if from == target {
      return Some(UpcastPath::new(from, Vec::new()));
    }

    let start = *self.nodes.get(&from)?;
    let goal = *self.nodes.get(&target)?;
    let (_, route) = astar(&self.graph, start, |idx| idx == goal, |_| 1usize, |_| 0)?;

    let steps = route
      .windows(2)
      .map(|pair| self.graph.find_edge(pair[0], pair[1]).map(|edge| Arc::clone(&self.graph[edge])))
      .collect::<Option<Vec<_>>>()?;

    Some(UpcastPath::new(from, steps))
  }

  fn node(&mut self, ty: ModelType) -> NodeIndex {
    *self.nodes.entry(ty).or_insert_with(|| self.graph.add_node(ty))
  }
}

impl fmt::Debug for TypeLattice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeLattice")
      .field("types", &self.nodes.len())
      .field("edges", &self.graph.edge_count())
      .finish()
  }
}

/// A proven upcast from one model type to `T`.
///
/// The path owns its conversions, so it can outlive the lattice that produced
/// it (factories keep one for every instance they create).
pub struct UpcastPath<T: ?Sized> {
  source: ModelType,
  steps: Vec<Conversion>,
  _target: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> UpcastPath<T> {
  fn new(source: ModelType, steps: Vec<Conversion>) -> Self {
    Self {
      source,
      steps,
      _target: PhantomData,
    }
  }

  /// The type the path starts from.
  pub fn source(&self) -> ModelType {
    self.source
  }

  /// The type the path ends at.
  pub fn target(&self) -> ModelType {
    ModelType::of::<T>()
  }

  /// Number of declared edges walked.
  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Run the chain on `value`.
  ///
  /// `value` must hold the path's source type. Anything else comes back
  /// untouched in `Err`.
  pub fn apply(&self, value: ErasedBox) -> Result<Box<T>, ErasedBox> {
    let mut current = value;
    for step in &self.steps {
      current = step(current)?;
    }
    current.downcast::<T>()
  }
}

impl<T: ?Sized> Clone for UpcastPath<T> {
  fn clone(&self) -> Self {
    Self {
      source: self.source,
      steps: self.steps.clone(),
      _target: PhantomData,
    }
  }
}

impl<T: ?Sized + 'static> fmt::Debug for UpcastPath<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UpcastPath")
      .field("source", &self.source)
      .field("target", &self.target())
      .field("steps", &self.steps.len())
      .finish()
  }
}
