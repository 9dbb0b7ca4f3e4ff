use super::names::is_scoped;
use super::relative_path;
use super::remap_legacy_file;
use super::to_module_extension;
use super::ConvertedUrl;
use super::OriginUrl;
use super::UrlHandler;
use crate::context::RunContext;
use crate::settings::ImportStyle;
use std::sync::Arc;

/// A flat directory of sibling packages, each converted in place. Target-space package names only surface in import specifiers.
pub struct WorkspaceUrlHandler {
  ctx: Arc<RunContext>,
}

impl WorkspaceUrlHandler {
  pub fn new(ctx: Arc<RunContext>) -> WorkspaceUrlHandler {
    WorkspaceUrlHandler { ctx }
  }

  fn split(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or(("", path))
  }
}

impl UrlHandler for WorkspaceUrlHandler {
  fn package_name(&self, url: &OriginUrl) -> String {
    Self::split(url.as_str()).0.to_string()
  }

  fn package_root(&self, package: &str) -> String {
    if package.is_empty() {
      String::new()
    } else {
      format!("{package}/")
    }
  }

  fn npm_name(&self, package: &str) -> String {
    self.ctx.npm_name(package)
  }

  fn convert(&self, url: &OriginUrl) -> ConvertedUrl {
    let package = self.package_name(url);
    let relative = to_module_extension(&self.package_relative_origin(url));
    self.converted_from_package_relative(&package, &relative)
  }

  fn converted_from_package_relative(&self, package: &str, relative: &str) -> ConvertedUrl {
    let relative = remap_legacy_file(&self.ctx.npm_name(package), relative);
    ConvertedUrl::new(format!("{}{relative}", self.package_root(package)))
  }

  fn package_relative_converted(&self, url: &ConvertedUrl) -> String {
    Self::split(url.path()).1.to_string()
  }

  fn relative_import_specifier(
    &self,
    from: &ConvertedUrl,
    to: &ConvertedUrl,
    style: ImportStyle,
  ) -> String {
    let (from_pkg, from_rest) = Self::split(from.path());
    let (to_pkg, to_rest) = Self::split(to.path());
    if from_pkg == to_pkg {
      return relative_path(from, to);
    };
    let target = format!("{}/{to_rest}", self.ctx.npm_name(to_pkg));
    match style {
      ImportStyle::Name => target,
      ImportStyle::Path => {
        // Packages install side by side, never nested in each other's dependency directory.
        let depth = from_rest.matches('/').count();
        let scope_up = if is_scoped(&self.ctx.npm_name(from_pkg)) { 1 } else { 0 };
        format!("{}{target}", "../".repeat(depth + 1 + scope_up))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::urls::names::DependencyMap;

  fn handler() -> WorkspaceUrlHandler {
    let names = DependencyMap::default().with_override("my-lib", "my-lib");
    WorkspaceUrlHandler::new(Arc::new(RunContext::new(names)))
  }

  #[test]
  fn converts_in_place() {
    let urls = handler();
    let url = OriginUrl::new("paper-button/paper-button.html");
    assert_eq!(urls.convert(&url).as_str(), "./paper-button/paper-button.js");
    assert_eq!(urls.package_name(&url), "paper-button");
    assert_eq!(
      urls.convert(&OriginUrl::new("polymer/polymer.html")).as_str(),
      "./polymer/polymer-legacy.js"
    );
    assert_eq!(
      urls.package_relative_converted(&ConvertedUrl::new("polymer/lib/a.js")),
      "lib/a.js"
    );
  }

  #[test]
  fn sibling_packages_are_path_siblings() {
    let urls = handler();
    let from = ConvertedUrl::new("paper-button/paper-button.js");
    let to = ConvertedUrl::new("polymer/polymer-legacy.js");
    assert_eq!(
      urls.relative_import_specifier(&from, &to, ImportStyle::Path),
      "../../@polymer/polymer/polymer-legacy.js"
    );
    let nested = ConvertedUrl::new("paper-button/demo/index.js");
    assert_eq!(
      urls.relative_import_specifier(&nested, &to, ImportStyle::Path),
      "../../../@polymer/polymer/polymer-legacy.js"
    );
    assert_eq!(
      urls.relative_import_specifier(&from, &to, ImportStyle::Name),
      "@polymer/polymer/polymer-legacy.js"
    );
  }

  #[test]
  fn unscoped_importers_need_one_level_less() {
    let urls = handler();
    let from = ConvertedUrl::new("my-lib/index.js");
    let to = ConvertedUrl::new("polymer/polymer-legacy.js");
    assert_eq!(
      urls.relative_import_specifier(&from, &to, ImportStyle::Path),
      "../@polymer/polymer/polymer-legacy.js"
    );
    assert_eq!(
      urls.relative_import_specifier(&from, &ConvertedUrl::new("my-lib/lib/x.js"), ImportStyle::Path),
      "./lib/x.js"
    );
  }
}
