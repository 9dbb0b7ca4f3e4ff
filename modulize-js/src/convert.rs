use crate::document::insert_prologue;
use crate::document::inline_module_script;
use crate::document::leftover_markup;
use crate::document::module_script_tag;
use crate::document::template_prologue;
use crate::err::ConversionResult;
use crate::host::AnalyzedDocument;
use crate::host::InclusionKind;
use crate::js::edit::EditBatch;
use crate::resolve::ReferenceResolver;
use crate::scan::ProjectScan;
use crate::scan::ScanFailure;
use crate::scan::ScanResult;
use crate::settings::ConversionSettings;
use crate::urls::ConvertedFilePath;
use crate::urls::ConvertedUrl;
use crate::urls::OriginUrl;
use crate::urls::UrlHandler;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing::debug_span;
use tracing::info_span;
use tracing::warn;

/// Receives the converter's output. All disk access happens behind this.
pub trait FileWriter {
  fn write(&mut self, path: &ConvertedFilePath, contents: &str) -> io::Result<()>;
  fn delete(&mut self, path: &ConvertedFilePath) -> io::Result<()>;
}

/// Writes under an output root, creating directories as needed.
pub struct DiskWriter {
  root: PathBuf,
}

impl DiskWriter {
  pub fn new(root: impl Into<PathBuf>) -> DiskWriter {
    DiskWriter { root: root.into() }
  }
}

impl FileWriter for DiskWriter {
  fn write(&mut self, path: &ConvertedFilePath, contents: &str) -> io::Result<()> {
    let dest = self.root.join(path.as_str());
    if let Some(dir) = dest.parent() {
      fs::create_dir_all(dir)?;
    };
    fs::write(dest, contents)
  }

  fn delete(&mut self, path: &ConvertedFilePath) -> io::Result<()> {
    match fs::remove_file(self.root.join(path.as_str())) {
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
      res => res,
    }
  }
}

#[derive(Debug, Default)]
pub struct MemoryWriter {
  pub files: BTreeMap<ConvertedFilePath, String>,
  pub deleted: BTreeSet<ConvertedFilePath>,
}

impl MemoryWriter {
  pub fn new() -> MemoryWriter {
    MemoryWriter::default()
  }

  pub fn get(&self, path: &str) -> Option<&str> {
    self
      .files
      .get(&ConvertedFilePath::new(path))
      .map(String::as_str)
  }
}

impl FileWriter for MemoryWriter {
  fn write(&mut self, path: &ConvertedFilePath, contents: &str) -> io::Result<()> {
    self.deleted.remove(path);
    self.files.insert(path.clone(), contents.to_string());
    Ok(())
  }

  fn delete(&mut self, path: &ConvertedFilePath) -> io::Result<()> {
    self.files.remove(path);
    self.deleted.insert(path.clone());
    Ok(())
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConvertedDocument {
  Written {
    origin: OriginUrl,
    path: ConvertedFilePath,
    contents: String,
  },
  /// Removed from the output, at its origin path.
  Deleted {
    origin: OriginUrl,
    path: ConvertedFilePath,
  },
}

#[derive(Clone, Debug, Default)]
pub struct ConversionReport {
  /// Sorted by origin URL.
  pub documents: Vec<ConvertedDocument>,
  /// Scan failures followed by conversion failures.
  pub failures: Vec<ScanFailure>,
}

impl ConversionReport {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn contents(&self, path: &str) -> Option<&str> {
    let path = ConvertedFilePath::new(path);
    self.documents.iter().find_map(|d| match d {
      ConvertedDocument::Written { path: p, contents, .. } if *p == path => Some(contents.as_str()),
      _ => None,
    })
  }

  pub fn deleted(&self) -> impl Iterator<Item = &OriginUrl> {
    self.documents.iter().filter_map(|d| match d {
      ConvertedDocument::Deleted { origin, .. } => Some(origin),
      _ => None,
    })
  }

  /// Hands every document to `writer`, stopping at the first I/O error.
  pub fn write_to(&self, writer: &mut dyn FileWriter) -> io::Result<()> {
    for document in &self.documents {
      match document {
        ConvertedDocument::Written { path, contents, .. } => writer.write(path, contents)?,
        ConvertedDocument::Deleted { path, .. } => writer.delete(path)?,
      };
    }
    Ok(())
  }
}

/// Produces the final text of every document in the scanned packages.
pub struct ProjectConverter<'c> {
  scan: &'c ProjectScan,
  urls: &'c dyn UrlHandler,
  settings: &'c ConversionSettings,
}

impl<'c> ProjectConverter<'c> {
  pub fn new(
    scan: &'c ProjectScan,
    urls: &'c dyn UrlHandler,
    settings: &'c ConversionSettings,
  ) -> ProjectConverter<'c> {
    ProjectConverter {
      scan,
      urls,
      settings,
    }
  }

  fn resolver(&self) -> ReferenceResolver<'c> {
    ReferenceResolver::new(&self.scan.exports, self.urls, self.settings.import_style)
      .with_reference_excludes(self.settings.reference_excludes.iter().cloned())
  }

  pub fn convert(&self) -> ConversionReport {
    let _span = info_span!("modulize_js.convert", packages = self.scan.packages.len()).entered();
    let mut origins: Vec<&OriginUrl> = self
      .scan
      .files
      .keys()
      .filter(|url| self.scan.packages.contains(&self.urls.package_name(url)))
      .collect();
    origins.sort();

    let mut report = ConversionReport {
      failures: self.scan.failures.clone(),
      ..Default::default()
    };
    for origin in origins {
      let _span = debug_span!("modulize_js.convert_document", document = %origin).entered();
      let converted = match &self.scan.files[origin] {
        ScanResult::DeleteFile => Ok(ConvertedDocument::Deleted {
          origin: origin.clone(),
          path: ConvertedFilePath::new(origin.as_str()),
        }),
        ScanResult::JsModule { url, .. } => self.convert_module(origin, url),
        ScanResult::HtmlDocument { url } => self.convert_page(origin, url),
      };
      match converted {
        Ok(document) => {
          debug!("converted document");
          report.documents.push(document);
        }
        Err(message) => {
          warn!(document = %origin, error = %message, "dropping document");
          report.failures.push(ScanFailure {
            url: origin.clone(),
            message,
          });
        }
      };
    }
    report
  }

  fn document(&self, origin: &OriginUrl) -> Result<&'c AnalyzedDocument, String> {
    self
      .scan
      .documents
      .get(origin)
      .ok_or_else(|| format!("document {origin} was not crawled"))
  }

  /// Converted URL of an inclusion target, unless it was deleted or never scanned.
  fn kept_target(&self, target: &OriginUrl) -> Option<&'c ConvertedUrl> {
    if self.scan.is_deleted(target) {
      return None;
    };
    self.scan.converted_url(target)
  }

  fn convert_module(&self, origin: &OriginUrl, url: &ConvertedUrl) -> Result<ConvertedDocument, String> {
    let doc = self.document(origin)?;
    let text = self
      .scan
      .rewritten
      .get(origin)
      .ok_or_else(|| format!("module {origin} was not scanned from source"))?;
    let text = match doc.is_html().then(|| leftover_markup(doc)).flatten() {
      Some(markup) => insert_prologue(text, &template_prologue(&markup)),
      None => text.clone(),
    };
    let explicit: Vec<ConvertedUrl> = doc
      .inclusions()
      .filter_map(|i| i.target.as_ref().ok())
      .filter_map(|target| self.kept_target(target).cloned())
      .collect();
    let out = self
      .resolver()
      .resolve(url, &text, &explicit)
      .map_err(|err| err.to_string())?;
    Ok(ConvertedDocument::Written {
      origin: origin.clone(),
      path: self.urls.converted_file_path(origin, false),
      contents: out.text,
    })
  }

  fn convert_page(&self, origin: &OriginUrl, url: &ConvertedUrl) -> Result<ConvertedDocument, String> {
    let doc = self.document(origin)?;
    let contents = self.page_text(doc, url).map_err(|err| err.to_string())?;
    Ok(ConvertedDocument::Written {
      origin: origin.clone(),
      path: self.urls.converted_file_path(origin, true),
      contents,
    })
  }

  fn page_text(&self, doc: &AnalyzedDocument, url: &ConvertedUrl) -> ConversionResult<String> {
    let mut edits = EditBatch::new();
    for import in doc.inclusions().filter(|i| i.kind == InclusionKind::HtmlImport) {
      let Ok(target) = &import.target else {
        continue;
      };
      if self.scan.is_deleted(target) {
        edits.delete(import.range.clone());
      } else if let Some(converted) = self.scan.converted_url(target) {
        let specifier = self
          .urls
          .relative_import_specifier(url, converted, self.settings.import_style);
        edits.replace(import.range.clone(), module_script_tag(&specifier));
      };
    }
    let resolver = self.resolver();
    for script in doc.inline_scripts() {
      let out = resolver.resolve(url, &doc.text[script.body.clone()], &[])?;
      if out.imports_added {
        edits.replace(script.element.clone(), inline_module_script(&out.text));
      };
    }
    edits.apply(&doc.text)
  }
}
