use crate::urls::names::PackageNameMapper;
use ahash::HashSet;
use parking_lot::Mutex;
use tracing::warn;

/// State shared by everything in one conversion run. Nothing here is process-global, so independent runs in one process never see each other's warnings or name overrides.
pub struct RunContext {
  names: Box<dyn PackageNameMapper>,
  warned: Mutex<HashSet<String>>,
}

impl RunContext {
  pub fn new(names: impl PackageNameMapper + 'static) -> RunContext {
    RunContext {
      names: Box::new(names),
      warned: Mutex::new(HashSet::default()),
    }
  }

  /// Target-space name of an origin package. Unmapped names pass through unchanged, with one warning per name per run.
  pub fn npm_name(&self, origin_package: &str) -> String {
    match self.names.lookup(origin_package) {
      Some(name) => name,
      None => {
        if self.first_warning(&format!("package-name:{origin_package}")) {
          warn!(
            package = origin_package,
            "no target package name known, keeping the origin name"
          );
        };
        origin_package.to_string()
      }
    }
  }

  /// Returns true exactly once per key for the lifetime of this context.
  pub fn first_warning(&self, key: &str) -> bool {
    self.warned.lock().insert(key.to_string())
  }

  pub fn warned_keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.warned.lock().iter().cloned().collect();
    keys.sort();
    keys
  }
}

#[cfg(test)]
mod tests {
  use super::RunContext;
  use crate::urls::names::DependencyMap;

  #[test]
  fn unmapped_names_warn_once_per_context() {
    let ctx = RunContext::new(DependencyMap::default());
    assert_eq!(ctx.npm_name("my-thing"), "my-thing");
    assert_eq!(ctx.npm_name("my-thing"), "my-thing");
    assert_eq!(ctx.npm_name("other-thing"), "other-thing");
    assert_eq!(ctx.warned_keys(), vec![
      "package-name:my-thing".to_string(),
      "package-name:other-thing".to_string(),
    ]);

    let fresh = RunContext::new(DependencyMap::default());
    assert!(fresh.warned_keys().is_empty());
  }

  #[test]
  fn mapped_names_do_not_warn() {
    let ctx = RunContext::new(DependencyMap::default());
    assert_eq!(ctx.npm_name("polymer"), "@polymer/polymer");
    assert!(ctx.warned_keys().is_empty());
  }
}
