use context::RunContext;
use convert::ConversionReport;
use convert::ProjectConverter;
use host::DocumentHost;
use scan::manifest::ManifestRegistry;
use scan::Entrypoint;
use scan::ProjectScanner;
use settings::ConversionSettings;
use settings::Layout;
use std::sync::Arc;
use urls::names::DependencyMap;
use urls::package::PackageUrlHandler;
use urls::workspace::WorkspaceUrlHandler;
use urls::UrlHandler;

pub mod context;
pub mod convert;
pub mod document;
pub mod err;
pub mod exports;
pub mod host;
pub mod js;
pub mod resolve;
pub mod rewrite;
pub mod scan;
pub mod settings;
pub mod urls;

/// The URL handler for the configured layout.
pub fn url_handler(settings: &ConversionSettings, ctx: Arc<RunContext>) -> Box<dyn UrlHandler> {
  match settings.layout {
    Layout::Package => Box::new(PackageUrlHandler::new(
      ctx,
      settings.package_name.clone(),
      settings.npm_name(),
      settings.package_type,
    )),
    Layout::Workspace => Box::new(WorkspaceUrlHandler::new(ctx)),
  }
}

/// Scans and converts every package the entrypoints belong to, in a fresh run context.
///
/// # Examples
///
/// ```
/// use modulize_js::convert_project;
/// use modulize_js::host::MemoryHost;
/// use modulize_js::scan::Entrypoint;
/// use modulize_js::settings::ConversionSettings;
/// use modulize_js::settings::Layout;
/// use modulize_js::urls::OriginUrl;
///
/// let host = MemoryHost::new()
///   .with_document("app/a.js", "NS.foo = 10;\n")
///   .with_document("app/b.js", "console.log(NS.foo);\n");
/// let settings = ConversionSettings::new(Layout::Workspace).with_namespace("NS");
/// let report = convert_project(&host, &settings, &[
///   Entrypoint::Module(OriginUrl::new("app/a.js")),
///   Entrypoint::Module(OriginUrl::new("app/b.js")),
/// ], None);
/// assert_eq!(report.contents("app/a.js"), Some("export const foo = 10;\n"));
/// assert_eq!(
///   report.contents("app/b.js"),
///   Some("import { foo } from './a.js';\nconsole.log(foo);\n")
/// );
/// ```
pub fn convert_project(
  host: &dyn DocumentHost,
  settings: &ConversionSettings,
  entrypoints: &[Entrypoint],
  registry: Option<&dyn ManifestRegistry>,
) -> ConversionReport {
  let ctx = Arc::new(RunContext::new(DependencyMap::new(
    settings.package_names.clone(),
  )));
  let urls = url_handler(settings, ctx);
  let mut scanner = ProjectScanner::new(host, urls.as_ref(), settings);
  if let Some(registry) = registry {
    scanner = scanner.with_registry(registry);
  };
  let scan = scanner.scan(entrypoints);
  ProjectConverter::new(&scan, urls.as_ref(), settings).convert()
}
