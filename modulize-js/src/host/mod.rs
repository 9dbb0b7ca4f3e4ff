use crate::err::HostError;
use crate::js::namespaces::declared_namespaces;
use crate::urls::OriginUrl;
use std::ops::Range;

pub mod fs;
pub mod html;
pub mod memory;

pub use fs::FsHost;
pub use memory::MemoryHost;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
  Html,
  Js,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InclusionKind {
  /// `<link rel="import" href>`.
  HtmlImport,
  /// `<script src>`.
  ExternalScript,
}

/// An edge to another document. Targets that are not project-relative paths stay as the raw `href` so callers can report them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inclusion {
  pub kind: InclusionKind,
  pub target: Result<OriginUrl, String>,
  /// The whole element.
  pub range: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineScript {
  pub body: Range<usize>,
  pub element: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feature {
  Inclusion(Inclusion),
  InlineScript(InlineScript),
  /// A `@namespace` declared in one of the document's scripts.
  Namespace(String),
  /// A custom element declared with `<dom-module id>`.
  Element(String),
}

/// A document with the features static analysis found in it, in source order.
#[derive(Clone, Debug)]
pub struct AnalyzedDocument {
  pub url: OriginUrl,
  pub kind: DocumentKind,
  pub text: String,
  pub features: Vec<Feature>,
}

impl AnalyzedDocument {
  pub fn analyze(url: OriginUrl, text: String) -> Result<AnalyzedDocument, HostError> {
    let (kind, mut features) = if url.is_html() {
      (DocumentKind::Html, html::scan_html(&url, &text)?)
    } else {
      (DocumentKind::Js, Vec::new())
    };
    let scripts: Vec<Range<usize>> = match kind {
      DocumentKind::Html => features
        .iter()
        .filter_map(|f| match f {
          Feature::InlineScript(s) => Some(s.body.clone()),
          _ => None,
        })
        .collect(),
      DocumentKind::Js => vec![0..text.len()],
    };
    for body in scripts {
      features.extend(
        declared_namespaces(&text[body])
          .into_iter()
          .map(Feature::Namespace),
      );
    }
    Ok(AnalyzedDocument {
      url,
      kind,
      text,
      features,
    })
  }

  pub fn is_html(&self) -> bool {
    self.kind == DocumentKind::Html
  }

  pub fn inclusions(&self) -> impl Iterator<Item = &Inclusion> {
    self.features.iter().filter_map(|f| match f {
      Feature::Inclusion(i) => Some(i),
      _ => None,
    })
  }

  pub fn html_imports(&self) -> impl Iterator<Item = &Inclusion> {
    self
      .inclusions()
      .filter(|i| i.kind == InclusionKind::HtmlImport)
  }

  pub fn inline_scripts(&self) -> impl Iterator<Item = &InlineScript> {
    self.features.iter().filter_map(|f| match f {
      Feature::InlineScript(s) => Some(s),
      _ => None,
    })
  }

  pub fn namespaces(&self) -> impl Iterator<Item = &str> {
    self.features.iter().filter_map(|f| match f {
      Feature::Namespace(n) => Some(n.as_str()),
      _ => None,
    })
  }

  pub fn elements(&self) -> impl Iterator<Item = &str> {
    self.features.iter().filter_map(|f| match f {
      Feature::Element(n) => Some(n.as_str()),
      _ => None,
    })
  }

  /// Script bodies in source order. A JS document is one script.
  pub fn script_bodies(&self) -> Vec<&str> {
    match self.kind {
      DocumentKind::Js => vec![self.text.as_str()],
      DocumentKind::Html => self
        .inline_scripts()
        .map(|s| &self.text[s.body.clone()])
        .collect(),
    }
  }
}

/// Where documents come from, already analyzed.
pub trait DocumentHost: Send + Sync {
  fn document(&self, url: &OriginUrl) -> Result<AnalyzedDocument, HostError>;

  /// Version a package directory declares, used to pick its published manifest.
  fn package_version(&self, package_root: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn namespaces_come_from_every_script() {
    let doc = AnalyzedDocument::analyze(
      OriginUrl::new("a.html"),
      concat!(
        "<script>/** @namespace */ var Foo = {};</script>\n",
        "<script>\n/** @namespace Bar.Baz */\n</script>\n",
      )
      .to_string(),
    )
    .unwrap();
    assert_eq!(doc.namespaces().collect::<Vec<_>>(), vec!["Foo", "Bar.Baz"]);
    assert_eq!(doc.script_bodies().len(), 2);
  }

  #[test]
  fn scripts_are_one_body() {
    let doc = AnalyzedDocument::analyze(OriginUrl::new("a.js"), "Foo.x = 1;".to_string()).unwrap();
    assert_eq!(doc.kind, DocumentKind::Js);
    assert_eq!(doc.script_bodies(), vec!["Foo.x = 1;"]);
    assert_eq!(doc.inclusions().count(), 0);
  }
}
