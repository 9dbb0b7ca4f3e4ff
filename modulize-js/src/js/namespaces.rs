use super::path::member_path;
use super::trivia::balanced;
use super::trivia::doc_comments_in;
use super::trivia::leading_doc_comment;
use super::trivia::namespace_tag;
use super::trivia::skip_trivia;
use super::with_parsed;
use parse_js::ast::NodeData;
use parse_js::ast::Syntax;
use parse_js::operator::OperatorName;
use parse_js::visit::JourneyControls;
use parse_js::visit::Visitor;

/// Name a statement declares when it is the target of a bare `@namespace` tag: the assigned dotted name or the declared variable.
pub fn declared_name(stmt: &NodeData) -> Option<String> {
  match &stmt.stx {
    Syntax::ExpressionStmt { expression } => match &expression.stx {
      Syntax::BinaryExpr {
        operator: OperatorName::Assignment,
        left,
        ..
      } => member_path(left)
        .filter(|p| !p.is_this_rooted())
        .map(|p| p.dotted),
      _ => None,
    },
    Syntax::VarStmt { declaration } => match &declaration.stx {
      Syntax::VarDecl { declarators, .. } => match &declarators.first()?.pattern.stx {
        Syntax::IdentifierPattern { name } => Some(name.as_str().to_string()),
        _ => None,
      },
      _ => None,
    },
    _ => None,
  }
}

struct NamespaceFinder<'t> {
  text: &'t str,
  found: Vec<String>,
}

impl<'t> NamespaceFinder<'t> {
  fn add(&mut self, name: String) {
    if !name.is_empty() && !self.found.contains(&name) {
      self.found.push(name);
    };
  }
}

impl<'t, 'a> Visitor<'a> for NamespaceFinder<'t> {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, _ctl: &mut JourneyControls) {
    if !matches!(node.stx, Syntax::ExpressionStmt { .. } | Syntax::VarStmt { .. }) {
      return;
    };
    let range = balanced(self.text, node.loc.start(), node.loc.end());
    let start = skip_trivia(self.text, range.start);
    let Some(comment) = leading_doc_comment(self.text, start) else {
      return;
    };
    match namespace_tag(&self.text[comment]) {
      Some(explicit) if !explicit.is_empty() => self.add(explicit),
      Some(_) => {
        if let Some(name) = declared_name(node) {
          self.add(name);
        };
      }
      None => {}
    };
  }
}

/// Every namespace a script declares with an `@namespace` doc tag, in order of appearance. Tags naming their namespace count even when they are not attached to a statement, or the script does not parse.
pub fn declared_namespaces(text: &str) -> Vec<String> {
  let mut found = with_parsed(text, |top| {
    let mut finder = NamespaceFinder {
      text,
      found: Vec::new(),
    };
    finder.visit(top);
    finder.found
  })
  .unwrap_or_default();
  for comment in doc_comments_in(text, 0..text.len()) {
    if let Some(name) = namespace_tag(&text[comment]).filter(|n| !n.is_empty()) {
      if !found.contains(&name) {
        found.push(name);
      };
    };
  }
  found
}
