use crate::js::trivia::statement_range;
use ahash::HashSet;
use parse_js::ast::ClassOrObjectMemberValue;
use parse_js::ast::Node;
use parse_js::ast::NodeData;
use parse_js::ast::ObjectMemberType;
use parse_js::ast::Syntax;
use parse_js::symbol::Scope;
use parse_js::visit::JourneyControls;
use parse_js::visit::Visitor;
use std::ops::Range;

/// Function bodies (by start offset) that return directly, not through a nested function.
#[derive(Default)]
pub struct DirectReturns {
  stack: Vec<Option<usize>>,
  bodies: HashSet<usize>,
}

impl DirectReturns {
  pub fn collect<'a>(top: &mut NodeData<'a>) -> HashSet<usize> {
    let mut finder = DirectReturns::default();
    finder.visit(top);
    finder.bodies
  }

  fn frame(node: &NodeData) -> Option<Option<usize>> {
    match &node.stx {
      Syntax::FunctionExpr { body, .. } | Syntax::ArrowFunctionExpr { body, .. } => {
        Some(Some(body.loc.start()))
      }
      Syntax::FunctionDecl { .. } | Syntax::ClassDecl { .. } | Syntax::ClassExpr { .. } => Some(None),
      Syntax::ObjectMember {
        typ:
          ObjectMemberType::Valued {
            value:
              ClassOrObjectMemberValue::Method { .. }
              | ClassOrObjectMemberValue::Getter { .. }
              | ClassOrObjectMemberValue::Setter { .. },
            ..
          },
      } => Some(None),
      _ => None,
    }
  }
}

impl<'a> Visitor<'a> for DirectReturns {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, _ctl: &mut JourneyControls) {
    if let Some(frame) = Self::frame(node) {
      self.stack.push(frame);
    };
    if let Syntax::ReturnStmt { .. } = node.stx {
      if let Some(Some(body)) = self.stack.last() {
        self.bodies.insert(*body);
      };
    };
  }

  fn on_syntax_up(&mut self, node: &mut NodeData<'a>) {
    if Self::frame(node).is_some() {
      self.stack.pop();
    };
  }
}

/// A top-level immediately invoked function whose body can be hoisted into module scope.
pub struct Wrapper<'n, 'a> {
  pub body: &'n [Node<'a>],
  pub scope: Scope<'a>,
  /// From the start of the statement through the body's `{`.
  pub open: Range<usize>,
  /// From the body's `}` through the end of the statement.
  pub close: Range<usize>,
}

impl<'n, 'a> Wrapper<'n, 'a> {
  pub fn declared_names(&self) -> Vec<String> {
    self
      .scope
      .symbol_names()
      .iter()
      .map(|n| n.as_str().to_string())
      .collect()
  }
}

fn is_this_argument(arguments: &[Node]) -> bool {
  match arguments {
    [arg] => matches!(
      &arg.stx,
      Syntax::CallArg { spread: false, value } if matches!(value.stx, Syntax::ThisExpr {})
    ),
    _ => false,
  }
}

/// Matches `(function() { … })();`, `(function() { … }());`, `(function() { … }).call(this);` and `(() => { … })();`, taking no parameters and never returning.
pub fn unwrap_candidate<'n, 'a>(
  text: &str,
  stmt: &'n NodeData<'a>,
  returns: &HashSet<usize>,
) -> Option<Wrapper<'n, 'a>> {
  let Syntax::ExpressionStmt { expression } = &stmt.stx else {
    return None;
  };
  let Syntax::CallExpr {
    callee,
    arguments,
    optional_chaining: false,
    ..
  } = &expression.stx
  else {
    return None;
  };
  let function = match &callee.stx {
    Syntax::MemberExpr {
      left,
      right,
      optional_chaining: false,
      ..
    } if *right == "call" && is_this_argument(arguments) => &**left,
    _ if arguments.is_empty() => &**callee,
    _ => return None,
  };
  let (signature, body) = match &function.stx {
    Syntax::FunctionExpr {
      is_async: false,
      generator: false,
      name: None,
      signature,
      body,
      ..
    }
    | Syntax::ArrowFunctionExpr {
      is_async: false,
      signature,
      body,
      ..
    } => (signature, body),
    _ => return None,
  };
  let Syntax::FunctionSignature { parameters } = &signature.stx else {
    return None;
  };
  let Syntax::BlockStmt { body: statements } = &body.stx else {
    return None;
  };
  if !parameters.is_empty() || returns.contains(&body.loc.start()) {
    return None;
  };
  let range = statement_range(text, stmt.loc.start(), stmt.loc.end());
  Some(Wrapper {
    body: &statements[..],
    scope: signature.scope,
    open: range.start..body.loc.start() + 1,
    close: body.loc.end() - 1..range.end,
  })
}

pub fn is_use_strict(stmt: &NodeData) -> bool {
  match &stmt.stx {
    Syntax::ExpressionStmt { expression } => matches!(
      &expression.stx,
      Syntax::LiteralStringExpr { value } if value.as_str() == "use strict"
    ),
    _ => false,
  }
}
