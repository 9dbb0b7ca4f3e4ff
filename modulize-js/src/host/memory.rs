use super::AnalyzedDocument;
use super::DocumentHost;
use crate::err::HostError;
use crate::urls::OriginUrl;
use ahash::HashMap;

/// Documents held in memory, keyed by origin path.
#[derive(Default)]
pub struct MemoryHost {
  documents: HashMap<OriginUrl, String>,
  versions: HashMap<String, String>,
}

impl MemoryHost {
  pub fn new() -> MemoryHost {
    MemoryHost::default()
  }

  pub fn with_document(mut self, path: &str, text: impl Into<String>) -> Self {
    self.documents.insert(OriginUrl::new(path), text.into());
    self
  }

  pub fn with_version(mut self, package_root: &str, version: impl Into<String>) -> Self {
    self.versions.insert(package_root.to_string(), version.into());
    self
  }
}

impl DocumentHost for MemoryHost {
  fn document(&self, url: &OriginUrl) -> Result<AnalyzedDocument, HostError> {
    let text = self
      .documents
      .get(url)
      .ok_or_else(|| HostError::NotFound(url.clone()))?;
    AnalyzedDocument::analyze(url.clone(), text.clone())
  }

  fn package_version(&self, package_root: &str) -> Option<String> {
    self.versions.get(package_root).cloned()
  }
}
