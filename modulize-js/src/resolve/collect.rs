use crate::exports::ExportTarget;
use crate::exports::GlobalExportTable;
use crate::js::mutability::is_compound_assignment;
use crate::js::mutability::is_update;
use crate::js::path::last_segment;
use crate::js::path::member_path;
use crate::js::path::parent_path;
use crate::js::path::MemberPath;
use crate::js::trivia::balanced;
use crate::js::trivia::find_token;
use crate::js::trivia::skip_trivia;
use crate::urls::ConvertedUrl;
use ahash::HashSet;
use parse_js::ast::NodeData;
use parse_js::ast::Syntax;
use parse_js::operator::OperatorName;
use parse_js::symbol::Scope;
use parse_js::visit::JourneyControls;
use parse_js::visit::Visitor;
use std::ops::Range;
use tracing::warn;

pub enum ReferenceKind {
  /// The whole expression is replaced by the alias.
  Read(Range<usize>),
  /// `NS.foo = value` becomes `alias(value)`: `head` covers `NS.foo = `, and `)` goes in at `value_end`.
  SetterCall { head: Range<usize>, value_end: usize },
}

pub struct Reference {
  pub legacy_name: String,
  pub target: ExportTarget,
  pub kind: ReferenceKind,
}

enum Lookup {
  Foreign(ExportTarget),
  /// Known, but must stay as written.
  Keep,
  Miss,
}

/// `NS.foo` has the setter `NS.setFoo`.
pub fn setter_name(dotted: &str) -> Option<String> {
  let parent = parent_path(dotted)?;
  let mut chars = last_segment(dotted).chars();
  let first = chars.next()?;
  Some(format!(
    "{parent}.set{}{}",
    first.to_uppercase(),
    chars.as_str()
  ))
}

/// Finds every reference in a document to a name another module exports.
pub struct ReferenceCollector<'r> {
  text: &'r str,
  table: &'r GlobalExportTable,
  own_url: &'r ConvertedUrl,
  excludes: &'r HashSet<String>,
  pub references: Vec<Reference>,
  // Assignment targets already dealt with at the assignment.
  left_alone: HashSet<(usize, usize)>,
}

impl<'r> ReferenceCollector<'r> {
  pub fn new(
    text: &'r str,
    table: &'r GlobalExportTable,
    own_url: &'r ConvertedUrl,
    excludes: &'r HashSet<String>,
  ) -> ReferenceCollector<'r> {
    ReferenceCollector {
      text,
      table,
      own_url,
      excludes,
      references: Vec::new(),
      left_alone: HashSet::default(),
    }
  }

  fn lookup<'a>(&self, path: &MemberPath<'a>, scope: Scope<'a>) -> Lookup {
    let Some(root) = path.root else {
      return Lookup::Miss;
    };
    let Some(target) = self.table.get(&path.dotted) else {
      return Lookup::Miss;
    };
    if self.excludes.contains(&path.dotted)
      || target.url == *self.own_url
      || scope.find_symbol(root).is_some()
    {
      return Lookup::Keep;
    };
    Lookup::Foreign(target.clone())
  }

  fn foreign_target<'a>(&self, node: &NodeData<'a>) -> Option<(MemberPath<'a>, ExportTarget)> {
    if !matches!(node.stx, Syntax::MemberExpr { .. }) {
      return None;
    };
    let path = member_path(node)?;
    match self.lookup(&path, node.scope) {
      Lookup::Foreign(target) => Some((path, target)),
      _ => None,
    }
  }

  fn leave_alone(&mut self, node: &NodeData) {
    self.left_alone.insert((node.loc.start(), node.loc.end()));
  }

  fn assignment(&mut self, left: &NodeData, right: &NodeData) {
    let Some((path, target)) = self.foreign_target(left) else {
      return;
    };
    self.leave_alone(left);
    let left_range = balanced(self.text, left.loc.start(), left.loc.end());
    let setter = setter_name(&path.dotted).and_then(|name| {
      let setter = self.table.get(&name)?;
      (setter.url == target.url).then(|| (name, setter.clone()))
    });
    let (Some((name, setter)), Some(eq)) = (setter, find_token(self.text, left_range.end, b'='))
    else {
      warn!(
        legacy_name = %path.dotted,
        module = %target.url,
        "assignment to another module's export has no setter to call, leaving it unconverted"
      );
      return;
    };
    self.references.push(Reference {
      legacy_name: name,
      target: setter,
      kind: ReferenceKind::SetterCall {
        head: left_range.start..skip_trivia(self.text, eq + 1),
        value_end: balanced(self.text, right.loc.start(), right.loc.end()).end,
      },
    });
  }

  fn in_place_update(&mut self, target: &NodeData) {
    if let Some((path, module)) = self.foreign_target(target) {
      warn!(
        legacy_name = %path.dotted,
        module = %module.url,
        "in-place update of another module's export cannot be converted"
      );
      self.leave_alone(target);
    };
  }

  fn read(&mut self, node: &NodeData, ctl: &mut JourneyControls) {
    let Some(path) = member_path(node) else {
      return;
    };
    match self.lookup(&path, node.scope) {
      Lookup::Foreign(target) => {
        self.references.push(Reference {
          legacy_name: path.dotted,
          target,
          kind: ReferenceKind::Read(balanced(self.text, node.loc.start(), node.loc.end())),
        });
        ctl.skip();
      }
      Lookup::Keep => ctl.skip(),
      Lookup::Miss => {}
    };
  }
}

impl<'r, 'a> Visitor<'a> for ReferenceCollector<'r> {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, ctl: &mut JourneyControls) {
    match &node.stx {
      Syntax::BinaryExpr {
        operator: OperatorName::Assignment,
        left,
        right,
        ..
      } => self.assignment(left, right),
      Syntax::BinaryExpr { operator, left, .. } if is_compound_assignment(*operator) => {
        self.in_place_update(left)
      }
      Syntax::UnaryExpr {
        operator, argument, ..
      }
      | Syntax::UnaryPostfixExpr {
        operator, argument, ..
      } if is_update(*operator) => self.in_place_update(argument),
      Syntax::MemberExpr { .. } => {
        if self
          .left_alone
          .contains(&(node.loc.start(), node.loc.end()))
        {
          ctl.skip();
        } else {
          self.read(node, ctl);
        };
      }
      Syntax::IdentifierExpr { .. } => self.read(node, ctl),
      _ => {}
    };
  }
}
