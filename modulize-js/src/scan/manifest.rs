use super::ProjectScan;
use super::ScanResult;
use crate::err::RegistryError;
use crate::exports::ExportMigrationRecord;
use crate::exports::ExportName;
use crate::urls::UrlHandler;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
  /// Package-relative converted path.
  pub converted_url: String,
  pub exports: BTreeMap<String, ExportName>,
}

/// Published export table of one package. Keys are package-relative origin paths; `null` marks a deleted file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  pub files: BTreeMap<String, Option<ManifestFile>>,
}

impl Manifest {
  /// Collects the scan results of every document in `package`.
  pub fn from_scan(scan: &ProjectScan, package: &str, urls: &dyn UrlHandler) -> Manifest {
    let files = scan
      .files
      .iter()
      .filter(|(url, _)| urls.package_name(url) == package)
      .filter_map(|(url, result)| {
        let entry = match result {
          ScanResult::DeleteFile => None,
          ScanResult::JsModule { url: converted, records, .. } => Some(ManifestFile {
            converted_url: urls.package_relative_converted(converted),
            exports: records
              .iter()
              .map(|r| (r.legacy_name.clone(), r.exported_as.clone()))
              .collect(),
          }),
          // Pages have nothing to import.
          ScanResult::HtmlDocument { .. } => return None,
        };
        Some((urls.package_relative_origin(url), entry))
      })
      .collect();
    Manifest { files }
  }

  /// Records every file of `package` in `scan` as the manifest describes it, and merges its exports.
  pub fn apply(&self, package: &str, urls: &dyn UrlHandler, scan: &mut ProjectScan) {
    for (relative, entry) in &self.files {
      let origin = urls.origin_from_package_relative(package, relative);
      let result = match entry {
        None => ScanResult::DeleteFile,
        Some(file) => {
          let converted = urls.converted_from_package_relative(package, &file.converted_url);
          let records: Vec<ExportMigrationRecord> = file
            .exports
            .iter()
            .map(|(legacy, name)| ExportMigrationRecord::new(legacy.clone(), name.clone()))
            .collect();
          scan.exports.merge_records(&converted, &records);
          ScanResult::JsModule {
            url: converted,
            records,
            namespaces: Vec::new(),
          }
        }
      };
      scan.files.insert(origin, result);
    }
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

/// A dependency package as the registry knows it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRef {
  pub origin_name: String,
  pub npm_name: String,
  pub version: Option<String>,
}

pub trait ManifestRegistry: Sync {
  fn fetch(&self, package: &PackageRef) -> Result<Manifest, RegistryError>;
}

/// Manifests laid out as `<root>/<npm name>/<version>/manifest.json`, with `latest` standing in for unknown versions.
pub struct DirectoryRegistry {
  root: PathBuf,
}

impl DirectoryRegistry {
  pub fn new(root: impl Into<PathBuf>) -> DirectoryRegistry {
    DirectoryRegistry { root: root.into() }
  }

  fn manifest_path(&self, package: &PackageRef) -> PathBuf {
    self
      .root
      .join(&package.npm_name)
      .join(package.version.as_deref().unwrap_or("latest"))
      .join("manifest.json")
  }

  pub fn publish(&self, package: &PackageRef, manifest: &Manifest) -> Result<(), RegistryError> {
    let path = self.manifest_path(package);
    if let Some(dir) = path.parent() {
      fs::create_dir_all(dir)?;
    };
    fs::write(path, manifest.to_json()?)?;
    Ok(())
  }
}

impl ManifestRegistry for DirectoryRegistry {
  fn fetch(&self, package: &PackageRef) -> Result<Manifest, RegistryError> {
    let raw = match fs::read_to_string(self.manifest_path(package)) {
      Ok(raw) => raw,
      Err(err) if err.kind() == io::ErrorKind::NotFound => {
        return Err(RegistryError::NotFound {
          package: package.npm_name.clone(),
        })
      }
      Err(err) => return Err(err.into()),
    };
    Ok(serde_json::from_str(&raw)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn package(version: Option<&str>) -> PackageRef {
    PackageRef {
      origin_name: "iron-icon".into(),
      npm_name: "@polymer/iron-icon".into(),
      version: version.map(str::to_string),
    }
  }

  #[test]
  fn manifest_json_shape() {
    let manifest: Manifest = serde_json::from_str(
      r#"{"files": {
        "iron-icon.html": {"convertedUrl": "iron-icon.js", "exports": {"Polymer.IronIcon": "IronIcon", "IronMeta": "*"}},
        "demo/index.html": null
      }}"#,
    )
    .unwrap();
    assert_eq!(manifest.files["demo/index.html"], None);
    let file = manifest.files["iron-icon.html"].as_ref().unwrap();
    assert_eq!(file.converted_url, "iron-icon.js");
    assert_eq!(file.exports["IronMeta"], ExportName::Namespace);
    assert_eq!(
      file.exports["Polymer.IronIcon"],
      ExportName::Named("IronIcon".into())
    );
  }

  #[test]
  fn directory_registry_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = DirectoryRegistry::new(dir.path());
    let mut manifest = Manifest::default();
    manifest.files.insert("a.html".into(), None);
    registry.publish(&package(Some("2.0.1")), &manifest).unwrap();
    assert!(dir
      .path()
      .join("@polymer/iron-icon/2.0.1/manifest.json")
      .is_file());
    assert_eq!(registry.fetch(&package(Some("2.0.1"))).unwrap(), manifest);
    assert!(matches!(
      registry.fetch(&package(None)),
      Err(RegistryError::NotFound { package }) if package == "@polymer/iron-icon"
    ));
  }

  #[test]
  fn malformed_manifests_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("@polymer/iron-icon/latest");
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("manifest.json"), "{ nope").unwrap();
    let registry = DirectoryRegistry::new(dir.path());
    assert!(matches!(
      registry.fetch(&package(None)),
      Err(RegistryError::Malformed(_))
    ));
  }
}
