use ahash::HashMap;
use once_cell::sync::Lazy;

/// Maps an origin-space package name (a `bower_components` directory or workspace directory) to its target-space name.
pub trait PackageNameMapper: Send + Sync {
  fn lookup(&self, origin_package: &str) -> Option<String>;
}

static WELL_KNOWN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::default();
  for (origin, target) in [
    ("polymer", "@polymer/polymer"),
    ("shadycss", "@webcomponents/shadycss"),
    ("webcomponentsjs", "@webcomponents/webcomponentsjs"),
    ("web-component-tester", "wct-browser-legacy"),
    ("test-fixture", "@polymer/test-fixture"),
    ("font-roboto", "@polymer/font-roboto"),
    ("font-roboto-local", "@polymer/font-roboto-local"),
    ("neon-animation", "@polymer/neon-animation"),
    ("marked-element", "@polymer/marked-element"),
    ("prism-element", "@polymer/prism-element"),
    ("promise-polyfill", "@polymer/promise-polyfill"),
    ("sinonjs", "sinon"),
    ("chai", "chai"),
    ("mocha", "mocha"),
  ] {
    map.insert(origin, target);
  }
  map
});

// Element families published under the @polymer scope with their origin names.
const SCOPED_PREFIXES: &[&str] = &["app-", "gold-", "iron-", "paper-", "platinum-"];

/// Built-in table of well-known legacy packages plus caller overrides. Overrides win.
#[derive(Clone, Debug, Default)]
pub struct DependencyMap {
  overrides: HashMap<String, String>,
}

impl DependencyMap {
  pub fn new(overrides: HashMap<String, String>) -> DependencyMap {
    DependencyMap { overrides }
  }

  pub fn with_override(mut self, origin: impl Into<String>, target: impl Into<String>) -> Self {
    self.overrides.insert(origin.into(), target.into());
    self
  }
}

impl PackageNameMapper for DependencyMap {
  fn lookup(&self, origin_package: &str) -> Option<String> {
    if let Some(name) = self.overrides.get(origin_package) {
      return Some(name.clone());
    };
    if let Some(name) = WELL_KNOWN.get(origin_package) {
      return Some(name.to_string());
    };
    SCOPED_PREFIXES
      .iter()
      .any(|p| origin_package.starts_with(p))
      .then(|| format!("@polymer/{origin_package}"))
  }
}

pub fn is_scoped(npm_name: &str) -> bool {
  npm_name.starts_with('@') && npm_name.contains('/')
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn overrides_take_precedence_over_the_builtin_table() {
    let map = DependencyMap::default().with_override("polymer", "polymer-fork");
    assert_eq!(map.lookup("polymer").as_deref(), Some("polymer-fork"));
    assert_eq!(
      map.lookup("shadycss").as_deref(),
      Some("@webcomponents/shadycss")
    );
  }

  #[test]
  fn element_families_are_scoped() {
    let map = DependencyMap::default();
    assert_eq!(
      map.lookup("iron-icon").as_deref(),
      Some("@polymer/iron-icon")
    );
    assert_eq!(map.lookup("left-pad"), None);
    assert!(is_scoped("@polymer/iron-icon"));
    assert!(!is_scoped("wct-browser-legacy"));
  }
}
