use common::assert_file;
use common::host;
use modulize_js::convert_project;
use modulize_js::err::RegistryError;
use modulize_js::exports::ExportName;
use modulize_js::host::MemoryHost;
use modulize_js::scan::manifest::Manifest;
use modulize_js::scan::manifest::ManifestFile;
use modulize_js::scan::manifest::ManifestRegistry;
use modulize_js::scan::manifest::PackageRef;
use modulize_js::scan::Entrypoint;
use modulize_js::settings::ConversionSettings;
use modulize_js::settings::Layout;
use modulize_js::urls::OriginUrl;
use parking_lot::Mutex;

mod common;

/// Serves one manifest for `dep` and remembers what was asked for.
struct FixedRegistry {
  manifest: Option<Manifest>,
  requests: Mutex<Vec<PackageRef>>,
}

impl FixedRegistry {
  fn new(manifest: Option<Manifest>) -> FixedRegistry {
    FixedRegistry {
      manifest,
      requests: Mutex::new(Vec::new()),
    }
  }
}

impl ManifestRegistry for FixedRegistry {
  fn fetch(&self, package: &PackageRef) -> Result<Manifest, RegistryError> {
    self.requests.lock().push(package.clone());
    match (&self.manifest, package.origin_name.as_str()) {
      (Some(manifest), "dep") => Ok(manifest.clone()),
      _ => Err(RegistryError::NotFound {
        package: package.npm_name.clone(),
      }),
    }
  }
}

fn project() -> MemoryHost {
  host(&[
    (
      "my-app.html",
      "<link rel=\"import\" href=\"bower_components/dep/dep.html\">\n<script>Dep.thing();</script>\n",
    ),
    (
      "bower_components/dep/dep.html",
      "<script>Dep.thing = function() {};</script>\n",
    ),
  ])
  .with_version("bower_components/dep/", "1.2.3")
}

fn settings() -> ConversionSettings {
  ConversionSettings::new(Layout::Package)
    .with_package("my-app", None)
    .with_namespace("Dep")
}

fn published() -> Manifest {
  let mut manifest = Manifest::default();
  manifest.files.insert(
    "dep.html".into(),
    Some(ManifestFile {
      converted_url: "dep.js".into(),
      exports: [("Dep.thing".to_string(), ExportName::Named("doThing".into()))]
        .into_iter()
        .collect(),
    }),
  );
  manifest
}

fn entrypoints() -> Vec<Entrypoint> {
  vec![Entrypoint::Module(OriginUrl::new("my-app.html"))]
}

#[test]
fn published_manifests_replace_source_scanning() {
  let registry = FixedRegistry::new(Some(published()));
  let report = convert_project(&project(), &settings(), &entrypoints(), Some(&registry));
  assert!(report.is_success(), "{:?}", report.failures);
  assert_file(
    &report,
    "my-app.js",
    "import { doThing } from '../dep/dep.js';\ndoThing();\n",
  );
  let requests = registry.requests.lock();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].npm_name, "dep");
  assert_eq!(requests[0].version.as_deref(), Some("1.2.3"));
}

#[test]
fn failed_fetches_fall_back_to_source() {
  let registry = FixedRegistry::new(None);
  let report = convert_project(&project(), &settings(), &entrypoints(), Some(&registry));
  assert!(report.is_success(), "{:?}", report.failures);
  assert_file(
    &report,
    "my-app.js",
    "import { thing } from '../dep/dep.js';\nthing();\n",
  );
}

#[test]
fn dependencies_are_not_written() {
  let report = convert_project(&project(), &settings(), &entrypoints(), None);
  assert_eq!(report.documents.len(), 1);
  assert_eq!(report.contents("node_modules/dep/dep.js"), None);
}
