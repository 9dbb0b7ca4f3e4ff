use super::names::is_scoped;
use super::relative_path;
use super::remap_legacy_file;
use super::to_module_extension;
use super::ConvertedUrl;
use super::OriginUrl;
use super::UrlHandler;
use crate::context::RunContext;
use crate::settings::ImportStyle;
use crate::settings::PackageType;
use std::sync::Arc;

const COMPONENTS_DIR: &str = "bower_components/";
const MODULES_DIR: &str = "node_modules/";

/// A single package at the project root with its dependencies vendored under `bower_components/`.
///
/// Own documents convert in place (`x/y.html` to `./x/y.js`); dependency documents move under `./node_modules/<target name>/`.
pub struct PackageUrlHandler {
  ctx: Arc<RunContext>,
  package_name: String,
  npm_name: String,
  package_type: PackageType,
}

impl PackageUrlHandler {
  pub fn new(
    ctx: Arc<RunContext>,
    package_name: impl Into<String>,
    npm_name: impl Into<String>,
    package_type: PackageType,
  ) -> PackageUrlHandler {
    PackageUrlHandler {
      ctx,
      package_name: package_name.into(),
      npm_name: npm_name.into(),
      package_type,
    }
  }

  fn npm_name_of(&self, package: &str) -> String {
    if package == self.package_name {
      self.npm_name.clone()
    } else {
      self.ctx.npm_name(package)
    }
  }

  /// Splits `./node_modules/@scope/name/rest` into (`@scope/name`, `rest`).
  fn split_dependency(url: &ConvertedUrl) -> Option<(&str, &str)> {
    let inner = url.path().strip_prefix(MODULES_DIR)?;
    let name_segments = if inner.starts_with('@') { 2 } else { 1 };
    let mut split_at = 0;
    for _ in 0..name_segments {
      split_at += inner[split_at..].find('/')? + 1;
    }
    Some((&inner[..split_at - 1], &inner[split_at..]))
  }
}

impl UrlHandler for PackageUrlHandler {
  fn package_name(&self, url: &OriginUrl) -> String {
    match url.as_str().strip_prefix(COMPONENTS_DIR) {
      Some(rest) => rest.split('/').next().unwrap_or(rest).to_string(),
      None => self.package_name.clone(),
    }
  }

  fn package_root(&self, package: &str) -> String {
    if package == self.package_name {
      String::new()
    } else {
      format!("{COMPONENTS_DIR}{package}/")
    }
  }

  fn npm_name(&self, package: &str) -> String {
    self.npm_name_of(package)
  }

  fn convert(&self, url: &OriginUrl) -> ConvertedUrl {
    let package = self.package_name(url);
    let relative = to_module_extension(&self.package_relative_origin(url));
    self.converted_from_package_relative(&package, &relative)
  }

  fn converted_from_package_relative(&self, package: &str, relative: &str) -> ConvertedUrl {
    let npm_name = self.npm_name_of(package);
    let relative = remap_legacy_file(&npm_name, relative);
    if package == self.package_name {
      ConvertedUrl::new(relative)
    } else {
      ConvertedUrl::new(format!("{MODULES_DIR}{npm_name}/{relative}"))
    }
  }

  fn package_relative_converted(&self, url: &ConvertedUrl) -> String {
    match Self::split_dependency(url) {
      Some((_, rest)) => rest.to_string(),
      None => url.path().to_string(),
    }
  }

  fn relative_import_specifier(
    &self,
    from: &ConvertedUrl,
    to: &ConvertedUrl,
    style: ImportStyle,
  ) -> String {
    let from_dep = Self::split_dependency(from);
    let to_dep = Self::split_dependency(to);
    if let (ImportStyle::Name, Some((to_pkg, _))) = (style, to_dep) {
      if from_dep.map(|(p, _)| p) != Some(to_pkg) {
        return to.path()[MODULES_DIR.len()..].to_string();
      };
    };
    let path = relative_path(from, to);
    if from_dep.is_some() || to_dep.is_none() || self.package_type != PackageType::Element {
      return path;
    };
    // This package will itself live in node_modules, so its dependencies become siblings.
    let ups = path.matches("../").count();
    let Some(idx) = path.find(MODULES_DIR) else {
      return path;
    };
    let rest = &path[idx + MODULES_DIR.len()..];
    let scope_up = if is_scoped(&self.npm_name) { 1 } else { 0 };
    format!("{}{rest}", "../".repeat(ups + 1 + scope_up))
  }
}
