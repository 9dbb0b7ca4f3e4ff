use super::AnalyzedDocument;
use super::DocumentHost;
use crate::err::HostError;
use crate::urls::OriginUrl;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

#[derive(Deserialize)]
struct BowerManifest {
  version: Option<String>,
}

/// Documents read from a project directory.
pub struct FsHost {
  root: PathBuf,
}

impl FsHost {
  pub fn new(root: impl Into<PathBuf>) -> FsHost {
    FsHost { root: root.into() }
  }
}

impl DocumentHost for FsHost {
  fn document(&self, url: &OriginUrl) -> Result<AnalyzedDocument, HostError> {
    let path = self.root.join(url.as_str());
    let bytes = fs::read(&path).map_err(|source| match source.kind() {
      io::ErrorKind::NotFound => HostError::NotFound(url.clone()),
      _ => HostError::Io {
        url: url.clone(),
        source,
      },
    })?;
    let text = String::from_utf8(bytes).map_err(|_| HostError::InvalidUtf8(url.clone()))?;
    debug!(document = %url, bytes = text.len(), "read document");
    AnalyzedDocument::analyze(url.clone(), text)
  }

  fn package_version(&self, package_root: &str) -> Option<String> {
    // Installed packages carry `.bower.json`; checkouts only `bower.json`.
    [".bower.json", "bower.json"].iter().find_map(|name| {
      let raw = fs::read_to_string(self.root.join(package_root).join(name)).ok()?;
      serde_json::from_str::<BowerManifest>(&raw).ok()?.version
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_documents_and_versions() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("bower_components/dep")).unwrap();
    fs::write(dir.path().join("a.js"), "Foo.x = 1;").unwrap();
    fs::write(
      dir.path().join("bower_components/dep/.bower.json"),
      r#"{"name": "dep", "version": "2.1.0"}"#,
    )
    .unwrap();
    let host = FsHost::new(dir.path());
    assert_eq!(host.document(&OriginUrl::new("a.js")).unwrap().text, "Foo.x = 1;");
    assert!(matches!(
      host.document(&OriginUrl::new("missing.js")),
      Err(HostError::NotFound(_))
    ));
    assert_eq!(
      host.package_version("bower_components/dep/").as_deref(),
      Some("2.1.0")
    );
    assert_eq!(host.package_version(""), None);
  }
}
