use crate::host::AnalyzedDocument;
use crate::js::trivia::import_insertion_point;
use std::ops::Range;

/// Markup of an HTML document once its imports and scripts are taken out, or None when nothing but whitespace is left.
pub fn leftover_markup(doc: &AnalyzedDocument) -> Option<String> {
  let mut removed: Vec<Range<usize>> = doc
    .inclusions()
    .map(|i| i.range.clone())
    .chain(doc.inline_scripts().map(|s| s.element.clone()))
    .collect();
  removed.sort_by_key(|r| r.start);
  let mut markup = String::new();
  let mut pos = 0;
  for range in removed {
    if range.start >= pos {
      markup.push_str(&doc.text[pos..range.start]);
      pos = range.end;
    };
  }
  markup.push_str(&doc.text[pos..]);
  let markup = markup.trim();
  (!markup.is_empty()).then(|| markup.to_string())
}

fn escape_template_literal(text: &str) -> String {
  text
    .replace('\\', "\\\\")
    .replace('`', "\\`")
    .replace("${", "\\${")
}

/// Script that appends `markup` to the document head when the module loads.
pub fn template_prologue(markup: &str) -> String {
  format!(
    "const $_documentContainer = document.createElement('template');\n$_documentContainer.innerHTML = `{}`;\ndocument.head.appendChild($_documentContainer.content);\n",
    escape_template_literal(markup)
  )
}

/// Puts `prologue` at the top of `script`, after a leading license comment.
pub fn insert_prologue(script: &str, prologue: &str) -> String {
  let at = import_insertion_point(script);
  if at == 0 {
    format!("{prologue}{script}")
  } else {
    format!("{}\n{prologue}{}", &script[..at], &script[at..])
  }
}

/// Script bodies of one document joined into a single module body.
pub fn join_scripts<'s>(bodies: impl IntoIterator<Item = &'s str>) -> String {
  let mut out = String::new();
  for body in bodies {
    let body = body.trim_matches(|c| c == '\n' || c == '\r');
    if body.trim().is_empty() {
      continue;
    };
    out.push_str(body);
    out.push('\n');
  }
  out
}

pub fn module_script_tag(specifier: &str) -> String {
  format!("<script type=\"module\" src=\"{specifier}\"></script>")
}

pub fn inline_module_script(body: &str) -> String {
  format!("<script type=\"module\">\n{}\n</script>", body.trim_end())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::urls::OriginUrl;

  fn doc(text: &str) -> AnalyzedDocument {
    AnalyzedDocument::analyze(OriginUrl::new("x/a.html"), text.to_string()).unwrap()
  }

  #[test]
  fn markup_without_imports_and_scripts() {
    let d = doc(concat!(
      "<link rel=\"import\" href=\"b.html\">\n",
      "<dom-module id=\"x-a\"><template>`${x}`</template></dom-module>\n",
      "<script>A.b = 1;</script>\n",
    ));
    let markup = leftover_markup(&d).unwrap();
    assert_eq!(markup, "<dom-module id=\"x-a\"><template>`${x}`</template></dom-module>");
    assert!(template_prologue(&markup).contains("<template>\\`\\${x}\\`</template>"));
  }

  #[test]
  fn whitespace_only_markup_is_dropped() {
    let d = doc("<link rel=\"import\" href=\"b.html\">\n\n<script>A.b = 1;</script>\n");
    assert_eq!(leftover_markup(&d), None);
  }

  #[test]
  fn prologue_goes_after_license() {
    assert_eq!(insert_prologue("/* @license */\nfoo();\n", "P;\n"), "/* @license */\nP;\n\nfoo();\n");
    assert_eq!(insert_prologue("foo();\n", "P;\n"), "P;\nfoo();\n");
  }

  #[test]
  fn joins_non_empty_bodies() {
    assert_eq!(join_scripts(["\n  a();\n", "  \n", "b();"]), "  a();\nb();\n");
  }
}
