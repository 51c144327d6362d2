use crate::component::Named;
use crate::container::FactoryContainer;
use crate::instance::InstanceInfo;
use crate::model::ModelType;

/// A binary produced by the build model.
///
/// Every abstract binary type (`dyn Binary`, `dyn SharedLibraryBinary`, ...)
/// extends this trait.
pub trait BinarySpec: Named + Send + Sync + 'static {
  /// Name for messages, e.g. `binary 'mainBinary'`.
  fn display_name(&self) -> String;

  /// Whether the binary can be built in the current environment.
  fn is_buildable(&self) -> bool;

  /// The implementation type of this binary.
  fn model_type(&self) -> ModelType;
}

/// Binaries built on [`BinaryBase`].
///
/// Every implementation bound by a binary type rule must implement this.
pub trait BaseBinarySpec: BinarySpec {
  fn base(&self) -> &BinaryBase;
  fn base_mut(&mut self) -> &mut BinaryBase;
}

/// State shared by every binary implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBase {
  name: String,
  implementation: ModelType,
  buildable: bool,
}

impl BinaryBase {
  /// Base state for the instance described by `info`.
  pub fn new(info: &InstanceInfo) -> Self {
    Self {
      name: info.name.clone(),
      implementation: info.implementation,
      buildable: true,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn implementation(&self) -> ModelType {
    self.implementation
  }

  pub fn is_buildable(&self) -> bool {
    self.buildable
  }

  pub fn set_buildable(&mut self, buildable: bool) {
    self.buildable = buildable;
  }

  /// `<type> '<name>'`, with a leading `Default` dropped from the type name.
  pub fn display_name(&self) -> String {
    let type_name = self.implementation.simple_name();
    let type_name = type_name.strip_prefix("Default").filter(|rest| !rest.is_empty()).unwrap_or(type_name);
    format!("{} '{}'", type_name, self.name)
  }
}

/// The container of binary factories, contributed by
/// [`ComponentModelBasePlugin`](super::ComponentModelBasePlugin).
pub type BinaryContainer = FactoryContainer<dyn BinarySpec>;

#[cfg(test)]
mod tests {
  use super::*;

  struct DefaultSharedLibrary;
  struct Default;

  #[test]
  fn display_name_uses_the_implementation_type() {
    let base = BinaryBase::new(&InstanceInfo::new("zlib", ModelType::of::<DefaultSharedLibrary>()));
    assert_eq!(base.display_name(), "SharedLibrary 'zlib'");
  }

  #[test]
  fn display_name_keeps_a_bare_default() {
    let base = BinaryBase::new(&InstanceInfo::new("x", ModelType::of::<Default>()));
    assert_eq!(base.display_name(), "Default 'x'");
  }

  #[test]
  fn binaries_start_buildable() {
    let mut base = BinaryBase::new(&InstanceInfo::new("main", ModelType::of::<DefaultSharedLibrary>()));
    assert!(base.is_buildable());
    assert_eq!(base.name(), "main");

    base.set_buildable(false);
    assert!(!base.is_buildable());
  }
}
