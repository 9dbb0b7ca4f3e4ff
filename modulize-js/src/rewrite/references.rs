use crate::js::edit::EditBatch;
use crate::js::path::is_shadowed;
use crate::js::path::member_path;
use crate::js::trivia::balanced;
use ahash::HashMap;
use parse_js::ast::ClassOrObjectMemberValue;
use parse_js::ast::NodeData;
use parse_js::ast::ObjectMemberType;
use parse_js::ast::Syntax;
use parse_js::symbol::Scope;
use parse_js::visit::JourneyControls;
use parse_js::visit::Visitor;

/// Where `this` means the namespace object: bodies of its exploded methods (keyed by member start) and function-valued properties (keyed by function start).
#[derive(Default)]
pub struct ThisScopes {
  pub methods: HashMap<usize, usize>,
  pub functions: HashMap<usize, usize>,
  /// Property to local binding, per exploded namespace.
  pub namespaces: Vec<HashMap<String, String>>,
}

/// Rewrites `this.p` to the binding `p` was exported as, inside exploded methods but not inside anything that rebinds `this`.
pub struct ThisRewriter<'p> {
  pub text: &'p str,
  pub scopes: &'p ThisScopes,
  pub edits: &'p mut EditBatch,
  stack: Vec<Option<usize>>,
}

impl<'p> ThisRewriter<'p> {
  pub fn new(text: &'p str, scopes: &'p ThisScopes, edits: &'p mut EditBatch) -> ThisRewriter<'p> {
    ThisRewriter {
      text,
      scopes,
      edits,
      stack: Vec::new(),
    }
  }

  fn frame(&self, node: &NodeData) -> Option<Option<usize>> {
    match &node.stx {
      Syntax::ObjectMember {
        typ:
          ObjectMemberType::Valued {
            value: ClassOrObjectMemberValue::Method { .. },
            ..
          },
      } => Some(self.scopes.methods.get(&node.loc.start()).copied()),
      Syntax::ObjectMember {
        typ:
          ObjectMemberType::Valued {
            value: ClassOrObjectMemberValue::Getter { .. } | ClassOrObjectMemberValue::Setter { .. },
            ..
          },
      } => Some(None),
      Syntax::FunctionExpr { .. } => Some(self.scopes.functions.get(&node.loc.start()).copied()),
      Syntax::FunctionDecl { .. } | Syntax::ClassDecl { .. } | Syntax::ClassExpr { .. } => Some(None),
      _ => None,
    }
  }
}

impl<'p, 'a> Visitor<'a> for ThisRewriter<'p> {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, ctl: &mut JourneyControls) {
    if let Some(frame) = self.frame(node) {
      self.stack.push(frame);
      return;
    };
    let Syntax::MemberExpr {
      left,
      right,
      optional_chaining: false,
      ..
    } = &node.stx
    else {
      return;
    };
    if !matches!(left.stx, Syntax::ThisExpr {}) {
      return;
    };
    let Some(Some(namespace)) = self.stack.last() else {
      return;
    };
    if let Some(binding) = self.scopes.namespaces[*namespace].get(right.as_str()) {
      let range = balanced(self.text, node.loc.start(), node.loc.end());
      self.edits.replace(range, binding.clone());
      ctl.skip();
    };
  }

  fn on_syntax_up(&mut self, node: &mut NodeData<'a>) {
    if self.frame(node).is_some() {
      self.stack.pop();
    };
  }
}

/// Rewrites remaining references to names this document now exports into the local bindings.
pub struct LocalReferenceRewriter<'p, 'a> {
  pub text: &'p str,
  pub bindings: &'p HashMap<String, String>,
  pub top_scopes: &'p [Scope<'a>],
  pub edits: &'p mut EditBatch,
}

impl<'p, 'a> Visitor<'a> for LocalReferenceRewriter<'p, 'a> {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, ctl: &mut JourneyControls) {
    if !matches!(
      node.stx,
      Syntax::MemberExpr { .. } | Syntax::IdentifierExpr { .. } | Syntax::IdentifierPattern { .. }
    ) {
      return;
    };
    let Some(path) = member_path(node) else {
      return;
    };
    let Some(root) = path.root else {
      return;
    };
    let Some(binding) = self.bindings.get(&path.dotted) else {
      return;
    };
    ctl.skip();
    let range = balanced(self.text, node.loc.start(), node.loc.end());
    if *binding == path.dotted
      || self.edits.overlaps(&range)
      || is_shadowed(node.scope, root, self.top_scopes)
    {
      return;
    };
    self.edits.replace(range, binding.clone());
  }
}
