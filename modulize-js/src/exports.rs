use crate::urls::ConvertedUrl;
use ahash::HashMap;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use tracing::warn;

/// What a legacy name is exported as: a named export, or the whole module (`*`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExportName {
  Named(String),
  Namespace,
}

impl ExportName {
  pub fn named(&self) -> Option<&str> {
    match self {
      ExportName::Named(name) => Some(name),
      ExportName::Namespace => None,
    }
  }
}

impl Display for ExportName {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      ExportName::Named(name) => f.write_str(name),
      ExportName::Namespace => f.write_str("*"),
    }
  }
}

impl Serialize for ExportName {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ExportName {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(if raw == "*" {
      ExportName::Namespace
    } else {
      ExportName::Named(raw)
    })
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMigrationRecord {
  pub legacy_name: String,
  pub exported_as: ExportName,
}

impl ExportMigrationRecord {
  pub fn new(legacy_name: impl Into<String>, exported_as: ExportName) -> ExportMigrationRecord {
    ExportMigrationRecord {
      legacy_name: legacy_name.into(),
      exported_as,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportTarget {
  pub url: ConvertedUrl,
  pub name: ExportName,
}

/// A claim on a legacy name that lost to an earlier one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportConflict {
  pub legacy_name: String,
  pub kept: ExportTarget,
  pub dropped: ExportTarget,
}

/// Legacy dotted name to its post-conversion module and export. The first claim on a name wins.
#[derive(Debug, Default)]
pub struct GlobalExportTable {
  entries: HashMap<String, ExportTarget>,
  detect_conflicts: bool,
  conflicts: Vec<ExportConflict>,
}

impl GlobalExportTable {
  pub fn new(detect_conflicts: bool) -> GlobalExportTable {
    GlobalExportTable {
      detect_conflicts,
      ..Default::default()
    }
  }

  /// Returns whether the claim was kept.
  pub fn insert(&mut self, legacy_name: &str, url: &ConvertedUrl, name: ExportName) -> bool {
    if let Some(kept) = self.entries.get(legacy_name) {
      if self.detect_conflicts && (kept.url != *url || kept.name != name) {
        warn!(
          legacy_name,
          kept = %kept.url,
          dropped = %url,
          "legacy name already exported elsewhere"
        );
        self.conflicts.push(ExportConflict {
          legacy_name: legacy_name.to_string(),
          kept: kept.clone(),
          dropped: ExportTarget {
            url: url.clone(),
            name,
          },
        });
      };
      return false;
    };
    self
      .entries
      .insert(legacy_name.to_string(), ExportTarget {
        url: url.clone(),
        name,
      });
    true
  }

  pub fn merge_records(&mut self, url: &ConvertedUrl, records: &[ExportMigrationRecord]) {
    for record in records {
      self.insert(&record.legacy_name, url, record.exported_as.clone());
    }
  }

  pub fn get(&self, legacy_name: &str) -> Option<&ExportTarget> {
    self.entries.get(legacy_name)
  }

  pub fn contains(&self, legacy_name: &str) -> bool {
    self.entries.contains_key(legacy_name)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn conflicts(&self) -> &[ExportConflict] {
    &self.conflicts
  }

  /// Entries sorted by legacy name.
  pub fn entries(&self) -> Vec<(&str, &ExportTarget)> {
    let mut entries: Vec<_> = self
      .entries
      .iter()
      .map(|(k, v)| (k.as_str(), v))
      .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_writer_wins() {
    let a = ConvertedUrl::new("a.js");
    let b = ConvertedUrl::new("b.js");
    let mut table = GlobalExportTable::new(false);
    assert!(table.insert("NS.foo", &a, ExportName::Named("foo".into())));
    assert!(!table.insert("NS.foo", &b, ExportName::Named("foo".into())));
    assert_eq!(table.get("NS.foo").unwrap().url, a);
    assert!(table.conflicts().is_empty());
  }

  #[test]
  fn conflicts_are_recorded_when_enabled() {
    let a = ConvertedUrl::new("a.js");
    let b = ConvertedUrl::new("b.js");
    let mut table = GlobalExportTable::new(true);
    table.insert("NS.foo", &a, ExportName::Named("foo".into()));
    // Same claim again is not a conflict.
    table.insert("NS.foo", &a, ExportName::Named("foo".into()));
    table.insert("NS.foo", &b, ExportName::Named("foo".into()));
    assert_eq!(table.conflicts().len(), 1);
    assert_eq!(table.conflicts()[0].dropped.url, b);
  }

  #[test]
  fn export_names_serialize_as_strings() {
    let record = ExportMigrationRecord::new("NS", ExportName::Namespace);
    assert_eq!(
      serde_json::to_string(&record).unwrap(),
      r#"{"legacyName":"NS","exportedAs":"*"}"#
    );
    let back: ExportName = serde_json::from_str(r#""foo""#).unwrap();
    assert_eq!(back, ExportName::Named("foo".into()));
  }
}
