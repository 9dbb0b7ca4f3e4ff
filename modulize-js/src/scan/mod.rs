use crate::document::join_scripts;
use crate::err::ConversionResult;
use crate::exports::ExportMigrationRecord;
use crate::exports::GlobalExportTable;
use crate::host::AnalyzedDocument;
use crate::host::DocumentHost;
use crate::host::InclusionKind;
use crate::rewrite::NamespaceRewriter;
use crate::rewrite::TrackedNamespaces;
use crate::settings::ConversionSettings;
use crate::urls::ConvertedUrl;
use crate::urls::OriginUrl;
use crate::urls::UrlHandler;
use ahash::HashMap;
use manifest::Manifest;
use manifest::ManifestRegistry;
use manifest::PackageRef;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use tracing::debug;
use tracing::debug_span;
use tracing::info_span;
use tracing::warn;

pub mod manifest;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entrypoint {
  /// The document and everything it includes become modules.
  Module(OriginUrl),
  /// The page stays HTML. Documents it imports become modules; its classic scripts are left alone.
  Page(OriginUrl),
}

impl Entrypoint {
  pub fn url(&self) -> &OriginUrl {
    match self {
      Entrypoint::Module(url) | Entrypoint::Page(url) => url,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanResult {
  JsModule {
    url: ConvertedUrl,
    records: Vec<ExportMigrationRecord>,
    /// Namespace roots the module defines.
    namespaces: Vec<String>,
  },
  HtmlDocument {
    url: ConvertedUrl,
  },
  DeleteFile,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanFailure {
  pub url: OriginUrl,
  pub message: String,
}

/// Everything the converter needs to know about a project before touching any document.
#[derive(Debug, Default)]
pub struct ProjectScan {
  pub files: HashMap<OriginUrl, ScanResult>,
  pub exports: GlobalExportTable,
  pub namespaces: TrackedNamespaces,
  /// Packages the entrypoints belong to, sorted.
  pub packages: Vec<String>,
  /// Crawled documents, dependencies before dependents.
  pub order: Vec<OriginUrl>,
  pub documents: HashMap<OriginUrl, AnalyzedDocument>,
  /// Rewritten script text of modules scanned from source.
  pub rewritten: HashMap<OriginUrl, String>,
  pub failures: Vec<ScanFailure>,
}

impl ProjectScan {
  pub fn result(&self, url: &OriginUrl) -> Option<&ScanResult> {
    self.files.get(url)
  }

  /// Converted URL of a document that survives conversion.
  pub fn converted_url(&self, url: &OriginUrl) -> Option<&ConvertedUrl> {
    match self.files.get(url)? {
      ScanResult::JsModule { url, .. } | ScanResult::HtmlDocument { url } => Some(url),
      ScanResult::DeleteFile => None,
    }
  }

  pub fn is_deleted(&self, url: &OriginUrl) -> bool {
    matches!(self.files.get(url), Some(ScanResult::DeleteFile))
  }

  fn fail(&mut self, url: &OriginUrl, message: String) {
    warn!(document = %url, error = %message, "dropping document");
    self.failures.push(ScanFailure {
      url: url.clone(),
      message,
    });
  }
}

#[derive(Default)]
struct Crawl {
  as_module: HashMap<OriginUrl, bool>,
  order: Vec<OriginUrl>,
  documents: HashMap<OriginUrl, AnalyzedDocument>,
  excluded: Vec<OriginUrl>,
  failures: Vec<(OriginUrl, String)>,
}

/// Builds the global export table by walking the document graph from its entrypoints.
pub struct ProjectScanner<'s> {
  host: &'s dyn DocumentHost,
  urls: &'s dyn UrlHandler,
  settings: &'s ConversionSettings,
  registry: Option<&'s dyn ManifestRegistry>,
}

impl<'s> ProjectScanner<'s> {
  pub fn new(
    host: &'s dyn DocumentHost,
    urls: &'s dyn UrlHandler,
    settings: &'s ConversionSettings,
  ) -> ProjectScanner<'s> {
    ProjectScanner {
      host,
      urls,
      settings,
      registry: None,
    }
  }

  /// Dependencies with a published manifest skip source scanning.
  pub fn with_registry(mut self, registry: &'s dyn ManifestRegistry) -> Self {
    self.registry = Some(registry);
    self
  }

  fn is_excluded(&self, url: &OriginUrl) -> bool {
    self.settings.excludes.iter().any(|e| {
      let e = e.trim_start_matches("./");
      url.as_str() == e || (e.ends_with('/') && url.as_str().starts_with(e))
    })
  }

  pub fn scan(&self, entrypoints: &[Entrypoint]) -> ProjectScan {
    let _span = info_span!("modulize_js.scan", entrypoints = entrypoints.len()).entered();
    let mut packages: Vec<String> = entrypoints
      .iter()
      .map(|e| self.urls.package_name(e.url()))
      .collect();
    packages.sort();
    packages.dedup();

    let mut crawl = Crawl::default();
    for entrypoint in entrypoints {
      match entrypoint {
        Entrypoint::Module(url) => self.visit(&mut crawl, url, true),
        Entrypoint::Page(url) => self.visit(&mut crawl, url, false),
      };
    }

    let mut scan = ProjectScan {
      exports: GlobalExportTable::new(self.settings.detect_export_conflicts),
      namespaces: self.settings.namespaces.iter().cloned().collect(),
      packages,
      ..Default::default()
    };
    for (url, message) in crawl.failures {
      scan.fail(&url, message);
    }
    for url in crawl.excluded {
      scan.files.insert(url, ScanResult::DeleteFile);
    }
    for url in &crawl.order {
      if let Some(doc) = crawl.documents.get(url) {
        scan.namespaces.extend(doc.namespaces());
      };
    }
    debug!(
      documents = crawl.order.len(),
      namespaces = scan.namespaces.len(),
      "crawled project"
    );

    let mut external: Vec<String> = crawl
      .order
      .iter()
      .map(|url| self.urls.package_name(url))
      .filter(|p| !scan.packages.contains(p))
      .collect();
    external.sort();
    external.dedup();
    let mut manifests: HashMap<String, Manifest> = self.fetch_manifests(&external).into_iter().collect();

    let rewriter = NamespaceRewriter::new(&scan.namespaces, &self.settings.export_renames);
    let mut results = Vec::new();
    let mut rewritten = Vec::new();
    let mut failures = Vec::new();
    for url in &crawl.order {
      let package = self.urls.package_name(url);
      if manifests.contains_key(&package) {
        continue;
      };
      let Some(doc) = crawl.documents.get(url) else {
        continue;
      };
      if !crawl.as_module.get(url).copied().unwrap_or(false) {
        results.push((url.clone(), ScanResult::HtmlDocument {
          url: self.urls.convert(url),
        }));
        continue;
      };
      let _span = debug_span!("modulize_js.scan_document", document = %url).entered();
      match self.scan_module(&rewriter, doc) {
        Ok((result, text)) => {
          results.push((url.clone(), result));
          rewritten.push((url.clone(), text));
        }
        Err(err) => failures.push((url.clone(), err.to_string())),
      };
    }
    drop(rewriter);

    // Merge sequentially so the first claim in dependency order wins. A package's manifest is merged where its first document would have been.
    let mut results = results.into_iter().peekable();
    for url in &crawl.order {
      let package = self.urls.package_name(url);
      if let Some(manifest) = manifests.remove(&package) {
        debug!(package = %package, files = manifest.files.len(), "using published manifest");
        manifest.apply(&package, self.urls, &mut scan);
        continue;
      };
      if let Some((_, result)) = results.next_if(|(u, _)| u == url) {
        if let ScanResult::JsModule { url: converted, records, .. } = &result {
          scan.exports.merge_records(converted, records);
        };
        scan.files.insert(url.clone(), result);
      };
    }
    for (url, message) in failures {
      scan.fail(&url, message);
    }
    scan.rewritten = rewritten.into_iter().collect();
    scan.order = crawl.order;
    scan.documents = crawl.documents;
    scan
  }

  fn scan_module(
    &self,
    rewriter: &NamespaceRewriter<'_>,
    doc: &AnalyzedDocument,
  ) -> ConversionResult<(ScanResult, String)> {
    let out = rewriter.rewrite(&join_scripts(doc.script_bodies()))?;
    debug!(document = %doc.url, exports = out.records.len(), "scanned module");
    Ok((
      ScanResult::JsModule {
        url: self.urls.convert(&doc.url),
        records: out.records,
        namespaces: out.namespace_names,
      },
      out.text,
    ))
  }

  fn visit(&self, crawl: &mut Crawl, url: &OriginUrl, as_module: bool) {
    if let Some(seen) = crawl.as_module.get_mut(url) {
      if as_module && !*seen {
        *seen = true;
        // A page that something imports becomes a module after all, along with everything it includes.
        let targets = crawl
          .documents
          .get(url)
          .map(|doc| self.traversed(doc, true))
          .unwrap_or_default();
        for target in targets {
          self.visit(crawl, &target, true);
        }
      };
      return;
    };
    crawl.as_module.insert(url.clone(), as_module);
    if self.is_excluded(url) {
      debug!(document = %url, "excluded");
      crawl.excluded.push(url.clone());
      return;
    };
    let doc = match self.host.document(url) {
      Ok(doc) => doc,
      Err(err) => {
        crawl.failures.push((url.clone(), err.to_string()));
        return;
      }
    };
    for inclusion in doc.inclusions() {
      if let Err(href) = &inclusion.target {
        warn!(document = %url, href = %href, "cannot resolve inclusion");
      };
    }
    let targets = self.traversed(&doc, as_module);
    crawl.documents.insert(url.clone(), doc);
    for target in targets {
      self.visit(crawl, &target, true);
    }
    crawl.order.push(url.clone());
  }

  /// Documents an analyzed document pulls in. Pages keep their classic scripts.
  fn traversed(&self, doc: &AnalyzedDocument, as_module: bool) -> Vec<OriginUrl> {
    doc
      .inclusions()
      .filter(|i| as_module || i.kind == InclusionKind::HtmlImport)
      .filter_map(|i| i.target.as_ref().ok().cloned())
      .collect()
  }

  fn fetch_manifests(&self, packages: &[String]) -> Vec<(String, Manifest)> {
    let Some(registry) = self.registry else {
      return Vec::new();
    };
    if packages.is_empty() {
      return Vec::new();
    };
    let refs: Vec<PackageRef> = packages
      .iter()
      .map(|p| PackageRef {
        origin_name: p.clone(),
        npm_name: self.urls.npm_name(p),
        version: self.host.package_version(&self.urls.package_root(p)),
      })
      .collect();
    let pool = match rayon::ThreadPoolBuilder::new()
      .num_threads(self.settings.fetch_concurrency.max(1))
      .build()
    {
      Ok(pool) => pool,
      Err(err) => {
        warn!(error = %err, "cannot create fetch pool, scanning dependencies from source");
        return Vec::new();
      }
    };
    let fetched: Vec<_> = pool.install(|| {
      refs
        .into_par_iter()
        .map(|package| {
          let manifest = registry.fetch(&package);
          (package, manifest)
        })
        .collect()
    });
    fetched
      .into_iter()
      .filter_map(|(package, manifest)| match manifest {
        Ok(manifest) => Some((package.origin_name, manifest)),
        Err(err) => {
          warn!(package = %package.npm_name, error = %err, "no usable manifest, scanning from source");
          None
        }
      })
      .collect()
  }
}
