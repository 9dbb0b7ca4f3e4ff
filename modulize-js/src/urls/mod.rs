use crate::settings::ImportStyle;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

pub mod names;
pub mod package;
pub mod workspace;

/// Location of a document before conversion, relative to the project root (`bower_components/polymer/polymer.html`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginUrl(String);

/// Module-space location of a document after conversion (`./node_modules/@polymer/polymer/polymer-legacy.js`). Always names a loadable module, even for documents that stay HTML.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvertedUrl(String);

/// Where the converted text is written, relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvertedFilePath(String);

impl OriginUrl {
  pub fn new(path: impl AsRef<str>) -> OriginUrl {
    let path = path.as_ref().replace('\\', "/");
    OriginUrl(normalize_segments(path.trim_start_matches("./").trim_start_matches('/')))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_html(&self) -> bool {
    self.0.ends_with(".html")
  }

  pub fn is_js(&self) -> bool {
    self.0.ends_with(".js")
  }

  /// Resolves an `href`/`src` attribute relative to this document. Returns None for anything that is not a project-relative path.
  pub fn resolve(&self, href: &str) -> Option<OriginUrl> {
    let href = href.split(|c| c == '?' || c == '#').next().unwrap_or("").trim();
    if href.is_empty() || href.starts_with('/') || href.contains("://") || href.starts_with("data:") {
      return None;
    };
    let base = match self.0.rfind('/') {
      Some(i) => &self.0[..=i],
      None => "",
    };
    let joined = format!("{base}{href}");
    let mut out: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
      match seg {
        "" | "." => {}
        ".." => {
          // Escapes the project root.
          out.pop()?;
        }
        seg => out.push(seg),
      }
    }
    Some(OriginUrl(out.join("/")))
  }
}

impl ConvertedUrl {
  pub fn new(path: impl AsRef<str>) -> ConvertedUrl {
    let path = path.as_ref().trim_start_matches("./").trim_start_matches('/');
    ConvertedUrl(format!("./{}", normalize_segments(path)))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Path without the leading `./`.
  pub fn path(&self) -> &str {
    &self.0[2..]
  }

  /// File name without its extension.
  pub fn file_stem(&self) -> &str {
    let name = self.0.rsplit('/').next().unwrap_or(&self.0);
    match name.rfind('.') {
      Some(0) | None => name,
      Some(i) => &name[..i],
    }
  }
}

impl ConvertedFilePath {
  pub fn new(path: impl AsRef<str>) -> ConvertedFilePath {
    ConvertedFilePath(normalize_segments(
      path.as_ref().trim_start_matches("./").trim_start_matches('/'),
    ))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

macro_rules! display_as_str {
  ($($t:ty),*) => {
    $(
      impl Display for $t {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
          f.write_str(&self.0)
        }
      }
    )*
  };
}

display_as_str!(OriginUrl, ConvertedUrl, ConvertedFilePath);

fn normalize_segments(path: &str) -> String {
  path
    .split('/')
    .filter(|s| !s.is_empty() && *s != ".")
    .collect::<Vec<_>>()
    .join("/")
}

/// Swaps an `.html` extension for `.js`; anything else keeps its extension.
pub fn to_module_extension(path: &str) -> String {
  match path.strip_suffix(".html") {
    Some(stem) => format!("{stem}.js"),
    None => path.to_string(),
  }
}

// (target package, package-relative path) renamed after generic translation.
const LEGACY_FILE_REMAPS: &[(&str, &str, &str)] = &[
  ("@polymer/polymer", "polymer.js", "polymer-legacy.js"),
  (
    "@webcomponents/shadycss",
    "apply-shim.js",
    "entrypoints/apply-shim.js",
  ),
  (
    "@webcomponents/shadycss",
    "custom-style-interface.js",
    "entrypoints/custom-style-interface.js",
  ),
];

pub fn remap_legacy_file(npm_package: &str, relative: &str) -> String {
  LEGACY_FILE_REMAPS
    .iter()
    .find(|(pkg, from, _)| *pkg == npm_package && *from == relative)
    .map(|(_, _, to)| to.to_string())
    .unwrap_or_else(|| relative.to_string())
}

/// Path from the directory containing `from` to `to`, always starting with `./` or `../`.
pub fn relative_path(from: &ConvertedUrl, to: &ConvertedUrl) -> String {
  let from_segs: Vec<&str> = from.path().split('/').collect();
  let to_segs: Vec<&str> = to.path().split('/').collect();
  let from_dir = &from_segs[..from_segs.len() - 1];
  let common = from_dir
    .iter()
    .zip(to_segs.iter())
    .take_while(|(a, b)| a == b)
    .count()
    .min(to_segs.len() - 1);
  let ups = from_dir.len() - common;
  let rest = to_segs[common..].join("/");
  if ups == 0 {
    format!("./{rest}")
  } else {
    format!("{}{rest}", "../".repeat(ups))
  }
}

/// Translates between origin space and converted space for one project layout.
pub trait UrlHandler: Send + Sync {
  /// Origin name of the package a document belongs to.
  fn package_name(&self, url: &OriginUrl) -> String;

  /// Origin directory prefix of a package, with a trailing slash unless empty.
  fn package_root(&self, package: &str) -> String;

  /// Target-space name of an origin package.
  fn npm_name(&self, package: &str) -> String;

  fn convert(&self, url: &OriginUrl) -> ConvertedUrl;

  /// Converted URL of a package-relative converted path, as found in a published manifest.
  fn converted_from_package_relative(&self, package: &str, relative: &str) -> ConvertedUrl;

  fn package_relative_converted(&self, url: &ConvertedUrl) -> String;

  fn relative_import_specifier(
    &self,
    from: &ConvertedUrl,
    to: &ConvertedUrl,
    style: ImportStyle,
  ) -> String;

  fn origin_url(&self, project_relative_path: &str) -> OriginUrl {
    OriginUrl::new(project_relative_path)
  }

  fn is_internal(&self, a: &OriginUrl, b: &OriginUrl) -> bool {
    self.package_name(a) == self.package_name(b)
  }

  fn package_relative_origin(&self, url: &OriginUrl) -> String {
    let root = self.package_root(&self.package_name(url));
    url
      .as_str()
      .strip_prefix(root.as_str())
      .unwrap_or(url.as_str())
      .to_string()
  }

  fn origin_from_package_relative(&self, package: &str, relative: &str) -> OriginUrl {
    OriginUrl::new(format!("{}{relative}", self.package_root(package)))
  }

  /// On-disk location of a converted document. Documents that stay HTML keep their extension.
  fn converted_file_path(&self, url: &OriginUrl, stays_html: bool) -> ConvertedFilePath {
    let converted = self.convert(url);
    let path = converted.path();
    match (stays_html, path.strip_suffix(".js")) {
      (true, Some(stem)) if url.is_html() => ConvertedFilePath::new(format!("{stem}.html")),
      _ => ConvertedFilePath::new(path),
    }
  }
}
