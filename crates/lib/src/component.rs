//! Software component capability.
//!
//! Downstream code classifies model objects as logical components through a
//! capability query on the [`TypeLattice`] rather than by inspecting concrete
//! types.

use crate::model::{ModelType, TypeLattice};

/// Something with a name in the build model.
pub trait Named {
  fn name(&self) -> &str;
}

/// A logical software component.
///
/// Carries no behaviour beyond being [`Named`]. Types opt in by implementing
/// the trait and declaring the capability with
/// [`TypeLattice::declare_component`].
pub trait SoftwareComponent: Named {}

impl TypeLattice {
  /// Record that `T` is a software component.
  pub fn declare_component<T: SoftwareComponent + 'static>(&mut self) -> &mut Self {
    self.extend::<T, dyn SoftwareComponent>(|b| b)
  }

  /// Whether values of `ty` can be classified as software components.
  pub fn is_component(&self, ty: ModelType) -> bool {
    self.is_assignable(ty, ModelType::of::<dyn SoftwareComponent>())
  }
}
