use anyhow::bail;
use anyhow::Context;
use clap::Parser;
use clap::ValueEnum;
use modulize_js::context::RunContext;
use modulize_js::convert::ConvertedDocument;
use modulize_js::convert::DiskWriter;
use modulize_js::convert::ProjectConverter;
use modulize_js::host::FsHost;
use modulize_js::scan::manifest::DirectoryRegistry;
use modulize_js::scan::manifest::Manifest;
use modulize_js::scan::Entrypoint;
use modulize_js::scan::ProjectScanner;
use modulize_js::settings::ConversionSettings;
use modulize_js::settings::ImportStyle;
use modulize_js::settings::Layout;
use modulize_js::settings::PackageType;
use modulize_js::url_handler;
use modulize_js::urls::names::DependencyMap;
use modulize_js::urls::OriginUrl;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(
  name = "modulize-js",
  about = "Converts namespace-based browser scripts into JavaScript modules"
)]
struct Cli {
  /// Project root; inclusion paths are resolved relative to it.
  #[arg(default_value = ".")]
  root: PathBuf,

  /// Where converted files are written; defaults to the project root.
  #[arg(short, long)]
  out: Option<PathBuf>,

  /// JSON settings file. Flags override its values.
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[arg(long, value_enum)]
  layout: Option<LayoutArg>,

  /// Origin name of the package at the root.
  #[arg(long)]
  package_name: Option<String>,

  /// Target name of the package at the root, e.g. `@polymer/paper-button`.
  #[arg(long)]
  npm_name: Option<String>,

  #[arg(long, value_enum)]
  package_type: Option<PackageTypeArg>,

  #[arg(long, value_enum)]
  import_style: Option<ImportStyleArg>,

  /// Namespace root whose assignments become exports. Repeatable.
  #[arg(short, long = "namespace")]
  namespaces: Vec<String>,

  /// Document to delete instead of converting. Repeatable.
  #[arg(long = "exclude")]
  excludes: Vec<String>,

  /// Legacy name never turned into an import. Repeatable.
  #[arg(long = "reference-exclude")]
  reference_excludes: Vec<String>,

  /// Document converted to a module along with everything it includes. Repeatable.
  #[arg(short, long = "entrypoint")]
  entrypoints: Vec<String>,

  /// Page that stays HTML while the documents it imports become modules. Repeatable.
  #[arg(short, long = "page")]
  pages: Vec<String>,

  /// Directory of published manifests for dependencies.
  #[arg(long)]
  registry: Option<PathBuf>,

  /// Also write the scanned packages' manifest to this file.
  #[arg(long)]
  emit_manifest: Option<PathBuf>,

  /// Record legacy names claimed by more than one module.
  #[arg(long)]
  detect_conflicts: bool,

  /// Concurrent manifest fetches.
  #[arg(short, long)]
  jobs: Option<usize>,

  /// Print the documents that would be written without touching the disk.
  #[arg(long)]
  dry_run: bool,

  #[arg(short, long)]
  verbose: bool,

  /// Emit JSON trace events, including span timings.
  #[arg(long)]
  trace_json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
  Package,
  Workspace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PackageTypeArg {
  Element,
  Application,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ImportStyleArg {
  Path,
  Name,
}

fn init_tracing(verbose: bool, json: bool) {
  let level = if verbose { Level::DEBUG } else { Level::WARN };
  let builder = tracing_subscriber::fmt()
    .with_max_level(level)
    .with_writer(std::io::stderr);
  let res = if json {
    builder
      .with_span_events(FmtSpan::CLOSE)
      .json()
      .with_ansi(false)
      .try_init()
  } else {
    builder.try_init()
  };
  if let Err(err) = res {
    eprintln!("failed to install tracing subscriber: {err}");
  }
}

fn settings(args: &Cli) -> anyhow::Result<ConversionSettings> {
  let mut settings = match &args.config {
    Some(path) => ConversionSettings::from_json_file(path)
      .with_context(|| format!("read settings from {}", path.display()))?,
    None => ConversionSettings::default(),
  };
  if let Some(layout) = args.layout {
    settings.layout = match layout {
      LayoutArg::Package => Layout::Package,
      LayoutArg::Workspace => Layout::Workspace,
    };
  };
  if let Some(name) = &args.package_name {
    settings.package_name = name.clone();
  };
  if let Some(name) = &args.npm_name {
    settings.npm_name = Some(name.clone());
  };
  if let Some(package_type) = args.package_type {
    settings = settings.with_package_type(match package_type {
      PackageTypeArg::Element => PackageType::Element,
      PackageTypeArg::Application => PackageType::Application,
    });
  };
  if let Some(style) = args.import_style {
    settings = settings.with_import_style(match style {
      ImportStyleArg::Path => ImportStyle::Path,
      ImportStyleArg::Name => ImportStyle::Name,
    });
  };
  settings.namespaces.extend(args.namespaces.iter().cloned());
  settings.excludes.extend(args.excludes.iter().cloned());
  settings
    .reference_excludes
    .extend(args.reference_excludes.iter().cloned());
  if args.detect_conflicts {
    settings = settings.with_export_conflict_detection(true);
  };
  if let Some(jobs) = args.jobs {
    settings = settings.with_fetch_concurrency(jobs);
  };
  Ok(settings)
}

fn run(args: Cli) -> anyhow::Result<bool> {
  let settings = settings(&args)?;
  let entrypoints: Vec<Entrypoint> = args
    .entrypoints
    .iter()
    .map(|e| Entrypoint::Module(OriginUrl::new(e)))
    .chain(args.pages.iter().map(|p| Entrypoint::Page(OriginUrl::new(p))))
    .collect();
  if entrypoints.is_empty() {
    bail!("at least one --entrypoint or --page is required");
  };

  let host = FsHost::new(&args.root);
  let ctx = Arc::new(RunContext::new(DependencyMap::new(
    settings.package_names.clone(),
  )));
  let urls = url_handler(&settings, ctx);
  let registry = args.registry.as_ref().map(DirectoryRegistry::new);
  let mut scanner = ProjectScanner::new(&host, urls.as_ref(), &settings);
  if let Some(registry) = &registry {
    scanner = scanner.with_registry(registry);
  };
  let scan = scanner.scan(&entrypoints);

  if let Some(path) = &args.emit_manifest {
    let mut manifest = Manifest::default();
    for package in &scan.packages {
      manifest
        .files
        .extend(Manifest::from_scan(&scan, package, urls.as_ref()).files);
    }
    let json = manifest.to_json().context("serialize manifest")?;
    fs::write(path, json).with_context(|| format!("write manifest to {}", path.display()))?;
  };

  let report = ProjectConverter::new(&scan, urls.as_ref(), &settings).convert();
  if args.dry_run {
    for document in &report.documents {
      match document {
        ConvertedDocument::Written { path, contents, .. } => {
          println!("==> {path}");
          print!("{contents}");
        }
        ConvertedDocument::Deleted { path, .. } => println!("==> {path} (deleted)"),
      };
    }
  } else {
    let out = args.out.clone().unwrap_or_else(|| args.root.clone());
    let mut writer = DiskWriter::new(&out);
    report
      .write_to(&mut writer)
      .with_context(|| format!("write output to {}", out.display()))?;
  };

  let deleted = report.deleted().count();
  eprintln!(
    "{} documents converted, {} deleted, {} failed",
    report.documents.len() - deleted,
    deleted,
    report.failures.len()
  );
  for failure in &report.failures {
    eprintln!("{}: {}", failure.url, failure.message);
  }
  Ok(report.is_success())
}

fn main() {
  let args = Cli::parse();
  init_tracing(args.verbose, args.trace_json);
  match run(args) {
    Ok(true) => {}
    Ok(false) => process::exit(1),
    Err(err) => {
      eprintln!("error: {err:#}");
      process::exit(2);
    }
  }
}
