use ahash::HashMap;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
  /// One package at the root, dependencies vendored under `bower_components/`.
  #[default]
  Package,
  /// Every top-level directory is its own package.
  Workspace,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
  /// Installed into another project's `node_modules`, so dependencies are siblings.
  #[default]
  Element,
  /// Served from its own root, so dependencies stay under `node_modules`.
  Application,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStyle {
  /// `../@polymer/polymer/polymer-legacy.js`
  #[default]
  Path,
  /// `@polymer/polymer/polymer-legacy.js`
  Name,
}

/// Configuration for one conversion run. Deserializable from a JSON config file; every field is optional there.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConversionSettings {
  pub layout: Layout,
  /// Origin name of the package at the root (package layout only).
  pub package_name: String,
  /// Target name of the package at the root, e.g. `@polymer/paper-button`.
  pub npm_name: Option<String>,
  pub package_type: PackageType,
  pub import_style: ImportStyle,
  /// Dotted roots whose assignments become exports, in addition to any `@namespace` declarations found.
  pub namespaces: Vec<String>,
  /// Origin URLs to delete rather than convert.
  pub excludes: Vec<String>,
  /// Legacy names that must never be turned into imports.
  pub reference_excludes: Vec<String>,
  /// Legacy name to export name overrides.
  pub export_renames: HashMap<String, String>,
  /// Origin package name to target package name overrides.
  pub package_names: HashMap<String, String>,
  pub detect_export_conflicts: bool,
  pub fetch_concurrency: usize,
}

impl Default for ConversionSettings {
  fn default() -> Self {
    let mut export_renames = HashMap::default();
    export_renames.insert("Polymer.Element".to_string(), "PolymerElement".to_string());
    ConversionSettings {
      layout: Layout::Package,
      package_name: String::new(),
      npm_name: None,
      package_type: PackageType::Element,
      import_style: ImportStyle::Path,
      namespaces: Vec::new(),
      excludes: Vec::new(),
      reference_excludes: Vec::new(),
      export_renames,
      package_names: HashMap::default(),
      detect_export_conflicts: false,
      fetch_concurrency: 4,
    }
  }
}

impl ConversionSettings {
  pub fn new(layout: Layout) -> Self {
    ConversionSettings {
      layout,
      ..Default::default()
    }
  }

  pub fn from_json_file(path: &Path) -> io::Result<Self> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
  }

  pub fn with_package(mut self, name: impl Into<String>, npm_name: Option<String>) -> Self {
    self.package_name = name.into();
    self.npm_name = npm_name;
    self
  }

  pub fn with_package_type(mut self, package_type: PackageType) -> Self {
    self.package_type = package_type;
    self
  }

  pub fn with_import_style(mut self, import_style: ImportStyle) -> Self {
    self.import_style = import_style;
    self
  }

  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespaces.push(namespace.into());
    self
  }

  pub fn with_exclude(mut self, url: impl Into<String>) -> Self {
    self.excludes.push(url.into());
    self
  }

  pub fn with_reference_exclude(mut self, legacy_name: impl Into<String>) -> Self {
    self.reference_excludes.push(legacy_name.into());
    self
  }

  pub fn with_export_rename(mut self, legacy_name: impl Into<String>, name: impl Into<String>) -> Self {
    self.export_renames.insert(legacy_name.into(), name.into());
    self
  }

  pub fn with_package_name_override(
    mut self,
    origin: impl Into<String>,
    target: impl Into<String>,
  ) -> Self {
    self.package_names.insert(origin.into(), target.into());
    self
  }

  pub fn with_export_conflict_detection(mut self, enabled: bool) -> Self {
    self.detect_export_conflicts = enabled;
    self
  }

  pub fn with_fetch_concurrency(mut self, threads: usize) -> Self {
    self.fetch_concurrency = threads.max(1);
    self
  }

  /// Target name of the root package; falls back to the origin name.
  pub fn npm_name(&self) -> &str {
    self.npm_name.as_deref().unwrap_or(&self.package_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_file_fields_are_optional() {
    let settings: ConversionSettings = serde_json::from_str(
      r#"{ "layout": "workspace", "namespaces": ["Polymer"], "import_style": "name" }"#,
    )
    .unwrap();
    assert_eq!(settings.layout, Layout::Workspace);
    assert_eq!(settings.import_style, ImportStyle::Name);
    assert_eq!(settings.namespaces, vec!["Polymer".to_string()]);
    assert_eq!(settings.fetch_concurrency, 4);
    assert_eq!(
      settings.export_renames.get("Polymer.Element").map(String::as_str),
      Some("PolymerElement")
    );
  }

  #[test]
  fn npm_name_defaults_to_origin_name() {
    let settings = ConversionSettings::new(Layout::Package).with_package("paper-button", None);
    assert_eq!(settings.npm_name(), "paper-button");
    let settings = settings.with_package("paper-button", Some("@polymer/paper-button".into()));
    assert_eq!(settings.npm_name(), "@polymer/paper-button");
  }
}
