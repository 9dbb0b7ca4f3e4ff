use parse_js::ast::ClassOrObjectMemberKey;
use parse_js::ast::NodeData;
use parse_js::ast::Syntax;
use parse_js::source::SourceRange;
use parse_js::symbol::Scope;

/// A dotted reference such as `Polymer.Async.timeOut`, with a leading `window.` removed.
pub struct MemberPath<'a> {
  pub dotted: String,
  /// The identifier the chain starts at; None when it starts at `this`.
  pub root: Option<SourceRange<'a>>,
}

impl<'a> MemberPath<'a> {
  pub fn is_this_rooted(&self) -> bool {
    self.root.is_none()
  }

  pub fn last_segment(&self) -> &str {
    last_segment(&self.dotted)
  }
}

pub fn member_path<'a>(node: &NodeData<'a>) -> Option<MemberPath<'a>> {
  let mut segments = Vec::new();
  let mut cur = node;
  let root = loop {
    match &cur.stx {
      Syntax::MemberExpr {
        left,
        right,
        optional_chaining: false,
        ..
      } => {
        segments.push(right.as_str());
        cur = &**left;
      }
      Syntax::IdentifierExpr { name } | Syntax::IdentifierPattern { name } => {
        segments.push(name.as_str());
        break Some(*name);
      }
      Syntax::ThisExpr {} => {
        segments.push("this");
        break None;
      }
      _ => return None,
    };
  };
  segments.reverse();
  if segments.len() > 1 && segments[0] == "window" {
    segments.remove(0);
  };
  Some(MemberPath {
    dotted: segments.join("."),
    root,
  })
}

pub fn last_segment(dotted: &str) -> &str {
  dotted.rsplit('.').next().unwrap_or(dotted)
}

pub fn parent_path(dotted: &str) -> Option<&str> {
  dotted.rfind('.').map(|i| &dotted[..i])
}

/// Property name of an object literal key: identifiers and keywords as written, string keys unquoted, computed keys None.
pub fn direct_key_name(key: &ClassOrObjectMemberKey) -> Option<String> {
  match key {
    ClassOrObjectMemberKey::Direct(range) => {
      let raw = range.as_str();
      let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
      Some(unquoted.unwrap_or(raw).to_string())
    }
    ClassOrObjectMemberKey::Computed(_) => None,
  }
}

/// Whether `name`, used from `scope`, binds to something other than a top-level declaration. Scopes in `top_scopes` count as top level; the root scope always does.
pub fn is_shadowed<'a>(scope: Scope<'a>, name: SourceRange<'a>, top_scopes: &[Scope<'a>]) -> bool {
  let mut cur = scope;
  loop {
    if top_scopes.contains(&cur) {
      return false;
    };
    let Some(parent) = cur.parent() else {
      return false;
    };
    if cur.get_symbol(name).is_some() {
      return true;
    };
    cur = parent;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::js::with_parsed;
  use parse_js::visit::JourneyControls;
  use parse_js::visit::Visitor;

  struct Paths(Vec<String>);

  impl<'a> Visitor<'a> for Paths {
    fn on_syntax_down(&mut self, node: &mut NodeData<'a>, ctl: &mut JourneyControls) {
      if let Syntax::MemberExpr { .. } = node.stx {
        if let Some(path) = member_path(node) {
          self.0.push(path.dotted);
          ctl.skip();
        };
      };
    }
  }

  fn paths(src: &str) -> Vec<String> {
    with_parsed(src, |top| {
      let mut v = Paths(Vec::new());
      v.visit(top);
      v.0
    })
    .unwrap()
  }

  #[test]
  fn extracts_outermost_paths() {
    assert_eq!(paths("window.Polymer.Async.timeOut.run(f);"), vec![
      "Polymer.Async.timeOut.run".to_string()
    ]);
    assert_eq!(paths("this.x.y = 1;"), vec!["this.x.y".to_string()]);
    assert_eq!(paths("a.b?.c;"), vec!["a.b".to_string()]);
    assert_eq!(paths("f().x;"), Vec::<String>::new());
  }

  #[test]
  fn segments() {
    assert_eq!(last_segment("A.b.c"), "c");
    assert_eq!(last_segment("A"), "A");
    assert_eq!(parent_path("A.b.c"), Some("A.b"));
    assert_eq!(parent_path("A"), None);
  }
}
