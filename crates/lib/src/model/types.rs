use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a type that takes part in the build model.
///
/// Tokens can be taken for sized types (`DefaultBinary`) as well as trait
/// objects (`dyn Binary`). Two tokens are equal when they denote the same
/// Rust type; the recorded name is only used for display.
#[derive(Clone, Copy)]
pub struct ModelType {
  id: TypeId,
  name: &'static str,
}

impl ModelType {
  /// Token for `T`.
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  /// Fully qualified type name, as reported by the compiler.
  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Type name without its module path or `dyn` prefix.
  ///
  /// Generic arguments are kept as-is.
  pub fn simple_name(&self) -> &'static str {
    let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
      Some(idx) => &name[idx + 2..],
      None => name,
    }
  }
}

impl PartialEq for ModelType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for ModelType {}

impl Hash for ModelType {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Display for ModelType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.simple_name())
  }
}

impl fmt::Debug for ModelType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ModelType({})", self.name)
  }
}

/// An owned `Box<T>` whose `T` has been erased.
///
/// The only way back to a typed box is [`ErasedBox::downcast`], which checks
/// the type at runtime and hands the value back unchanged on mismatch.
pub struct ErasedBox {
  value: Box<dyn Any>,
  ty: ModelType,
}

impl ErasedBox {
  /// Erase a boxed value.
  pub fn new<T: ?Sized + 'static>(value: Box<T>) -> Self {
    Self {
      value: Box::new(value),
      ty: ModelType::of::<T>(),
    }
  }

  /// The type currently held.
  pub fn model_type(&self) -> ModelType {
    self.ty
  }

  /// Recover the typed box, or get `self` back if it holds something else.
  pub fn downcast<T: ?Sized + 'static>(self) -> Result<Box<T>, Self> {
    let Self { value, ty } = self;
    match value.downcast::<Box<T>>() {
      Ok(typed) => Ok(*typed),
      Err(value) => Err(Self { value, ty }),
    }
  }
}

impl fmt::Debug for ErasedBox {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErasedBox").field("ty", &self.ty).finish_non_exhaustive()
  }
}
