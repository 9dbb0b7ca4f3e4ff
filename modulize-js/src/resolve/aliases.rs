use crate::exports::ExportName;
use crate::exports::ExportTarget;
use crate::js::idents::camel_case;
use ahash::HashMap;
use ahash::HashSet;

/// Local names for imported exports. Each export gets one alias per document, never shadowing an existing identifier or another alias.
pub struct AliasAllocator {
  taken: HashSet<String>,
  assigned: HashMap<(String, ExportName, String), String>,
}

impl AliasAllocator {
  pub fn new(existing: HashSet<String>) -> AliasAllocator {
    AliasAllocator {
      taken: existing,
      assigned: HashMap::default(),
    }
  }

  // Namespace imports are told apart by the legacy name they stand for, so two claims on one module stay visible.
  fn key(legacy_name: &str, target: &ExportTarget) -> (String, ExportName, String) {
    let claim = match &target.name {
      ExportName::Named(_) => String::new(),
      ExportName::Namespace => legacy_name.to_string(),
    };
    (target.url.as_str().to_string(), target.name.clone(), claim)
  }

  /// Returns the alias and whether it was newly allocated.
  pub fn allocate(&mut self, legacy_name: &str, target: &ExportTarget) -> (String, bool) {
    let key = Self::key(legacy_name, target);
    if let Some(alias) = self.assigned.get(&key) {
      return (alias.clone(), false);
    };
    let base = match &target.name {
      ExportName::Named(name) => name.clone(),
      ExportName::Namespace => camel_case(target.url.file_stem()),
    };
    let alias = if self.taken.contains(&base) {
      (0..)
        .map(|i| format!("{base}${i}"))
        .find(|candidate| !self.taken.contains(candidate))
        .unwrap_or_default()
    } else {
      base
    };
    self.taken.insert(alias.clone());
    self.assigned.insert(key, alias.clone());
    (alias, true)
  }

  pub fn get(&self, legacy_name: &str, target: &ExportTarget) -> Option<&str> {
    self
      .assigned
      .get(&Self::key(legacy_name, target))
      .map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::urls::ConvertedUrl;

  fn target(url: &str, name: ExportName) -> ExportTarget {
    ExportTarget {
      url: ConvertedUrl::new(url),
      name,
    }
  }

  #[test]
  fn suffixes_until_free() {
    let existing = ["foo".to_string(), "foo$0".to_string()].into_iter().collect();
    let mut aliases = AliasAllocator::new(existing);
    let a = target("a.js", ExportName::Named("foo".into()));
    let b = target("b.js", ExportName::Named("foo".into()));
    assert_eq!(aliases.allocate("NS.foo", &a), ("foo$1".to_string(), true));
    assert_eq!(aliases.allocate("Other.foo", &b), ("foo$2".to_string(), true));
    assert_eq!(aliases.allocate("NS.foo", &a), ("foo$1".to_string(), false));
  }

  #[test]
  fn namespaces_are_named_after_the_file() {
    let mut aliases = AliasAllocator::new(HashSet::default());
    let t = target("./lib/utils/render-status.js", ExportName::Namespace);
    assert_eq!(aliases.allocate("Polymer.RenderStatus", &t).0, "renderStatus");
    assert_eq!(aliases.get("Polymer.RenderStatus", &t), Some("renderStatus"));
  }

  #[test]
  fn namespace_claims_are_kept_apart() {
    let mut aliases = AliasAllocator::new(HashSet::default());
    let t = target("./async.js", ExportName::Namespace);
    assert_eq!(aliases.allocate("Async", &t), ("async".to_string(), true));
    assert_eq!(aliases.allocate("Polymer.Async", &t), ("async$0".to_string(), true));
    assert_eq!(aliases.allocate("Async", &t), ("async".to_string(), false));
  }
}
