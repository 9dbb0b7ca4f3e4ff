use super::Feature;
use super::Inclusion;
use super::InclusionKind;
use super::InlineScript;
use crate::err::HostError;
use crate::urls::OriginUrl;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::BuildError;
use aho_corasick::MatchKind;
use once_cell::sync::Lazy;
use std::ops::Range;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Opener {
  Comment,
  Link,
  Script,
  DomModule,
}

const OPENERS: &[(Opener, &str)] = &[
  (Opener::Comment, "<!--"),
  (Opener::Link, "<link"),
  (Opener::Script, "<script"),
  (Opener::DomModule, "<dom-module"),
];

static MATCHER: Lazy<Result<AhoCorasick, BuildError>> = Lazy::new(|| {
  AhoCorasickBuilder::new()
    .ascii_case_insensitive(true)
    .match_kind(MatchKind::LeftmostLongest)
    .build(OPENERS.iter().map(|(_, p)| *p))
});

static SCRIPT_CLOSE: Lazy<Result<AhoCorasick, BuildError>> = Lazy::new(|| {
  AhoCorasickBuilder::new()
    .ascii_case_insensitive(true)
    .build(["</script"])
});

fn matcher(m: &'static Lazy<Result<AhoCorasick, BuildError>>) -> Result<&'static AhoCorasick, HostError> {
  Lazy::force(m)
    .as_ref()
    .map_err(|err| HostError::TagMatcher(err.clone()))
}

struct Tag {
  attrs: Vec<(String, String)>,
  /// Just past the closing `>`.
  end: usize,
}

impl Tag {
  fn attr(&self, name: &str) -> Option<&str> {
    self
      .attrs
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }
}

/// Reads attributes from just after the tag name through the closing `>`.
fn read_tag(text: &str, mut pos: usize) -> Option<Tag> {
  let bytes = text.as_bytes();
  let mut attrs = Vec::new();
  loop {
    while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
      pos += 1;
    }
    if *bytes.get(pos)? == b'>' {
      return Some(Tag {
        attrs,
        end: pos + 1,
      });
    };
    let name_start = pos;
    while pos < bytes.len() && !matches!(bytes[pos], b'=' | b'>' | b'/') && !bytes[pos].is_ascii_whitespace() {
      pos += 1;
    }
    let name = text[name_start..pos].to_ascii_lowercase();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
      pos += 1;
    }
    let mut value = String::new();
    if bytes.get(pos) == Some(&b'=') {
      pos += 1;
      while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
      }
      match bytes.get(pos)? {
        q @ (b'"' | b'\'') => {
          let close = text[pos + 1..].find(*q as char)?;
          value = text[pos + 1..pos + 1 + close].to_string();
          pos += close + 2;
        }
        _ => {
          let start = pos;
          while pos < bytes.len() && bytes[pos] != b'>' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
          }
          value = text[start..pos].to_string();
        }
      };
    };
    attrs.push((name, value));
  }
}

fn is_script_type(ty: Option<&str>) -> bool {
  match ty.map(|t| t.trim().to_ascii_lowercase()) {
    None => true,
    Some(t) => t.is_empty() || t == "module" || t.ends_with("/javascript") || t.ends_with("/ecmascript"),
  }
}

fn inclusion(url: &OriginUrl, kind: InclusionKind, href: &str, range: Range<usize>) -> Feature {
  Feature::Inclusion(Inclusion {
    kind,
    target: url.resolve(href).ok_or_else(|| href.to_string()),
    range,
  })
}

/// Extracts imports, scripts and element declarations from an HTML document. Script bodies and comments are never searched for tags.
pub fn scan_html(url: &OriginUrl, text: &str) -> Result<Vec<Feature>, HostError> {
  let openers = matcher(&MATCHER)?;
  let script_close = matcher(&SCRIPT_CLOSE)?;
  let mut features = Vec::new();
  let mut pos = 0;
  while let Some(m) = openers.find(&text[pos..]) {
    let start = pos + m.start();
    let after_name = pos + m.end();
    let opener = OPENERS[m.pattern().as_usize()].0;
    pos = after_name;
    if opener == Opener::Comment {
      pos = text[after_name..]
        .find("-->")
        .map_or(text.len(), |i| after_name + i + 3);
      continue;
    };
    // `<linked-thing>` is not `<link>`.
    if !matches!(text.as_bytes().get(after_name), Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
    {
      continue;
    };
    let Some(tag) = read_tag(text, after_name) else {
      break;
    };
    pos = tag.end;
    match opener {
      Opener::Link => {
        let is_import = tag
          .attr("rel")
          .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("import")));
        if let (true, Some(href)) = (is_import, tag.attr("href")) {
          features.push(inclusion(url, InclusionKind::HtmlImport, href, start..tag.end));
        };
      }
      Opener::Script => {
        let (body_end, element_end) = match script_close.find(&text[tag.end..]) {
          Some(close) => {
            let close_start = tag.end + close.start();
            let element_end = text[close_start..]
              .find('>')
              .map_or(text.len(), |i| close_start + i + 1);
            (close_start, element_end)
          }
          None => (text.len(), text.len()),
        };
        pos = element_end;
        if let Some(src) = tag.attr("src") {
          features.push(inclusion(url, InclusionKind::ExternalScript, src, start..element_end));
        } else if is_script_type(tag.attr("type")) {
          features.push(Feature::InlineScript(InlineScript {
            body: tag.end..body_end,
            element: start..element_end,
          }));
        };
      }
      Opener::DomModule => {
        if let Some(id) = tag.attr("id") {
          features.push(Feature::Element(id.to_string()));
        };
      }
      Opener::Comment => {}
    };
  }
  Ok(features)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scan(text: &str) -> Vec<Feature> {
    scan_html(&OriginUrl::new("app/index.html"), text).unwrap()
  }

  #[test]
  fn finds_imports_and_scripts() {
    let text = concat!(
      "<link rel=\"import\" href=\"../lib/util.html\">\n",
      "<LINK REL=stylesheet href=\"x.css\">\n",
      "<!-- <link rel=\"import\" href=\"gone.html\"> -->\n",
      "<script src='boot.js'></script>\n",
      "<script>\n  Foo.bar = 1;\n</script>\n",
      "<script type=\"text/template\"><link rel=import href=no.html></script>\n",
      "<dom-module id=\"x-foo\"></dom-module>\n",
    );
    let features = scan(text);
    assert_eq!(features.len(), 4);
    match &features[0] {
      Feature::Inclusion(Inclusion {
        kind: InclusionKind::HtmlImport,
        target,
        range,
      }) => {
        assert_eq!(target.as_ref().unwrap().as_str(), "lib/util.html");
        assert_eq!(&text[range.clone()], "<link rel=\"import\" href=\"../lib/util.html\">");
      }
      _ => panic!("expected an import"),
    };
    match &features[1] {
      Feature::Inclusion(Inclusion {
        kind: InclusionKind::ExternalScript,
        target,
        ..
      }) => assert_eq!(target.as_ref().unwrap().as_str(), "app/boot.js"),
      _ => panic!("expected an external script"),
    };
    match &features[2] {
      Feature::InlineScript(InlineScript { body, element }) => {
        assert_eq!(&text[body.clone()], "\n  Foo.bar = 1;\n");
        assert!(text[element.clone()].ends_with("</script>"));
      }
      _ => panic!("expected an inline script"),
    };
    assert!(matches!(&features[3], Feature::Element(name) if name == "x-foo"));
  }

  #[test]
  fn unresolvable_hrefs_are_reported() {
    let features = scan("<link rel=\"import\" href=\"https://cdn.example/x.html\">");
    assert!(matches!(
      &features[0],
      Feature::Inclusion(Inclusion { target: Err(href), .. }) if href == "https://cdn.example/x.html"
    ));
  }

  #[test]
  fn similar_tag_names_are_ignored() {
    assert!(scan("<linked-list rel=import href=a.html></linked-list>").is_empty());
  }
}
