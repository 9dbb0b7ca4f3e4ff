use crate::err::ConversionResult;
use crate::exports::ExportMigrationRecord;
use crate::exports::ExportName;
use crate::js::edit::EditBatch;
use crate::js::idents::is_binding_name;
use crate::js::mutability::MutableNameSet;
use crate::js::namespaces::declared_namespaces;
use crate::js::path::last_segment;
use crate::js::path::member_path;
use crate::js::path::parent_path;
use crate::js::trivia::balanced;
use crate::js::trivia::doc_comments_in;
use crate::js::trivia::find_token;
use crate::js::trivia::leading_doc_comment;
use crate::js::trivia::only_namespace_tags;
use crate::js::trivia::skip_trivia;
use crate::js::trivia::statement_range;
use crate::js::trivia::strip_namespace_tags;
use crate::js::trivia::swallow_line_break;
use crate::js::with_parsed;
use ahash::HashMap;
use ahash::HashSet;
use object::explodable_members;
use object::export_function_head;
use object::export_list;
use object::MemberForm;
use parse_js::ast::Node;
use parse_js::ast::NodeData;
use parse_js::ast::Syntax;
use parse_js::operator::OperatorName;
use parse_js::symbol::Scope;
use parse_js::visit::Visitor;
use references::LocalReferenceRewriter;
use references::ThisRewriter;
use references::ThisScopes;
use std::ops::Range;
use tracing::debug;
use wrappers::is_use_strict;
use wrappers::unwrap_candidate;
use wrappers::DirectReturns;

mod object;
mod references;
mod wrappers;

/// Dotted roots whose assignments become exports.
#[derive(Clone, Debug, Default)]
pub struct TrackedNamespaces {
  names: HashSet<String>,
}

impl TrackedNamespaces {
  pub fn new() -> TrackedNamespaces {
    TrackedNamespaces::default()
  }

  pub fn insert(&mut self, name: impl Into<String>) -> bool {
    self.names.insert(name.into())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names.contains(name)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn sorted(&self) -> Vec<String> {
    let mut names: Vec<String> = self.names.iter().cloned().collect();
    names.sort();
    names
  }
}

impl<S: Into<String>> FromIterator<S> for TrackedNamespaces {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    TrackedNamespaces {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

impl<S: Into<String>> Extend<S> for TrackedNamespaces {
  fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
    self.names.extend(iter.into_iter().map(Into::into));
  }
}

#[derive(Clone, Debug, Default)]
pub struct RewriteOutput {
  pub text: String,
  /// In the order the exports appear in the document.
  pub records: Vec<ExportMigrationRecord>,
  /// Namespace roots this document declares.
  pub namespace_names: Vec<String>,
}

/// Turns assignments into tracked namespaces into export declarations.
pub struct NamespaceRewriter<'s> {
  namespaces: &'s TrackedNamespaces,
  renames: &'s HashMap<String, String>,
}

impl<'s> NamespaceRewriter<'s> {
  pub fn new(
    namespaces: &'s TrackedNamespaces,
    renames: &'s HashMap<String, String>,
  ) -> NamespaceRewriter<'s> {
    NamespaceRewriter {
      namespaces,
      renames,
    }
  }

  pub fn rewrite(&self, text: &str) -> ConversionResult<RewriteOutput> {
    let declared = declared_namespaces(text);
    let mut tracked = self.namespaces.clone();
    tracked.extend(declared.iter().cloned());
    let plan = with_parsed(text, |top| {
      let mut planner = Planner::new(text, &tracked, self.renames, top.scope);
      planner.plan(top);
      planner.finish()
    })?;
    let mut namespace_names = plan.namespace_names;
    for name in declared {
      if !namespace_names.contains(&name) {
        namespace_names.push(name);
      };
    }
    Ok(RewriteOutput {
      text: plan.edits.apply(text)?,
      records: plan.records,
      namespace_names,
    })
  }
}

struct Plan {
  edits: EditBatch,
  records: Vec<ExportMigrationRecord>,
  namespace_names: Vec<String>,
}

/// An assignment statement, or a declaration of a tracked root.
struct Assignment<'n, 'a> {
  target: String,
  lhs_end: usize,
  rhs: &'n NodeData<'a>,
  declares_target: bool,
}

impl<'n, 'a> Assignment<'n, 'a> {
  fn of(stmt: &'n NodeData<'a>, tracked: &TrackedNamespaces) -> Option<Assignment<'n, 'a>> {
    match &stmt.stx {
      Syntax::ExpressionStmt { expression } => {
        let Syntax::BinaryExpr {
          operator: OperatorName::Assignment,
          left,
          right,
          ..
        } = &expression.stx
        else {
          return None;
        };
        let path = member_path(left).filter(|p| !p.is_this_rooted())?;
        Some(Assignment {
          target: path.dotted,
          lhs_end: left.loc.end(),
          rhs: &**right,
          declares_target: false,
        })
      }
      Syntax::VarStmt { declaration } => {
        let Syntax::VarDecl { declarators, .. } = &declaration.stx else {
          return None;
        };
        let [declarator] = &declarators[..] else {
          return None;
        };
        let Syntax::IdentifierPattern { name } = &declarator.pattern.stx else {
          return None;
        };
        let rhs = declarator.initializer.as_ref()?;
        tracked.contains(name.as_str()).then(|| Assignment {
          target: name.as_str().to_string(),
          lhs_end: declarator.pattern.loc.end(),
          rhs: &**rhs,
          declares_target: true,
        })
      }
      _ => None,
    }
  }
}

/// An untracked `const x = { … }` that may be re-exported as a namespace later.
struct LocalObject<'n, 'a> {
  range: Range<usize>,
  object: &'n NodeData<'a>,
}

#[derive(Clone)]
struct ExplodedMember {
  property: String,
  name: String,
  binding: String,
}

/// Start of the indentation before `pos` when only whitespace precedes it on its line.
fn line_indent_start(text: &str, pos: usize) -> usize {
  let indent = text[..pos]
    .bytes()
    .rev()
    .take_while(|b| matches!(b, b' ' | b'\t'))
    .count();
  let start = pos - indent;
  if start == 0 || text.as_bytes()[start - 1] == b'\n' {
    start
  } else {
    pos
  }
}

/// `NS = NS || {}`, `NS.sub = {}` and friends.
fn is_noop(node: &NodeData, target: &str) -> bool {
  match &node.stx {
    Syntax::LiteralObjectExpr { members } => members.is_empty(),
    Syntax::BinaryExpr {
      operator: OperatorName::LogicalOr,
      left,
      right,
      ..
    } => is_noop(left, target) && is_noop(right, target),
    _ => member_path(node).is_some_and(|p| p.dotted == target),
  }
}

struct Planner<'t, 'a> {
  text: &'t str,
  tracked: &'t TrackedNamespaces,
  renames: &'t HashMap<String, String>,
  mutable: MutableNameSet,
  edits: EditBatch,
  records: Vec<ExportMigrationRecord>,
  namespace_names: Vec<String>,
  /// Legacy name to the local binding that now holds it.
  local_exports: HashMap<String, String>,
  /// Names bound at module scope, including hoisted wrapper bodies and new exports.
  bindings: HashSet<String>,
  exported: HashSet<String>,
  top_scopes: Vec<Scope<'a>>,
  this_scopes: ThisScopes,
  exploded: HashMap<String, Vec<ExplodedMember>>,
  stripped: HashSet<usize>,
}

impl<'t, 'a> Planner<'t, 'a> {
  fn new(
    text: &'t str,
    tracked: &'t TrackedNamespaces,
    renames: &'t HashMap<String, String>,
    module_scope: Scope<'a>,
  ) -> Planner<'t, 'a> {
    let bindings = module_scope
      .symbol_names()
      .iter()
      .map(|n| n.as_str().to_string())
      .collect();
    Planner {
      text,
      tracked,
      renames,
      mutable: MutableNameSet::default(),
      edits: EditBatch::new(),
      records: Vec::new(),
      namespace_names: Vec::new(),
      local_exports: HashMap::default(),
      bindings,
      exported: HashSet::default(),
      top_scopes: vec![module_scope],
      this_scopes: ThisScopes::default(),
      exploded: HashMap::default(),
      stripped: HashSet::default(),
    }
  }

  fn plan(&mut self, top: &mut NodeData<'a>) {
    self.mutable = MutableNameSet::collect(top);
    let returns = DirectReturns::collect(top);
    {
      let top: &NodeData<'a> = top;
      let Syntax::TopLevel { body } = &top.stx else {
        return;
      };
      let statements = self.collect_statements(&body[..], &returns);
      self.plan_statements(&statements);
    }
    let mut this_rewriter = ThisRewriter::new(self.text, &self.this_scopes, &mut self.edits);
    this_rewriter.visit(top);
    let mut local_rewriter = LocalReferenceRewriter {
      text: self.text,
      bindings: &self.local_exports,
      top_scopes: &self.top_scopes,
      edits: &mut self.edits,
    };
    local_rewriter.visit(top);
  }

  fn finish(self) -> Plan {
    Plan {
      edits: self.edits,
      records: self.records,
      namespace_names: self.namespace_names,
    }
  }

  /// Top-level statements, with the bodies of unwrappable wrappers hoisted in place.
  fn collect_statements<'n>(
    &mut self,
    body: &'n [Node<'a>],
    returns: &HashSet<usize>,
  ) -> Vec<&'n NodeData<'a>> {
    let mut statements = Vec::new();
    for stmt in body {
      let stmt: &'n NodeData<'a> = stmt;
      if let Some(wrapper) = unwrap_candidate(self.text, stmt, returns) {
        let names = wrapper.declared_names();
        if names.iter().all(|n| !self.bindings.contains(n)) {
          self.bindings.extend(names);
          self.top_scopes.push(wrapper.scope);
          self.edits.delete(wrapper.open);
          self.edits.delete(wrapper.close);
          statements.extend(self.collect_statements(wrapper.body, returns));
          continue;
        };
        debug!("keeping function wrapper whose locals collide with module scope");
      };
      statements.push(stmt);
    }
    statements
  }

  fn plan_statements<'n>(&mut self, statements: &[&'n NodeData<'a>]) {
    let mut locals = self.local_objects(statements);
    for &stmt in statements {
      if is_use_strict(stmt) {
        let range = self.statement_range(stmt);
        self.delete_statement(range);
        continue;
      };
      if let Some(assignment) = Assignment::of(stmt, self.tracked) {
        self.plan_assignment(stmt, assignment, &mut locals);
      };
    }
  }

  fn local_objects<'n>(
    &self,
    statements: &[&'n NodeData<'a>],
  ) -> HashMap<String, LocalObject<'n, 'a>> {
    let mut locals = HashMap::default();
    for &stmt in statements {
      let Syntax::VarStmt { declaration } = &stmt.stx else {
        continue;
      };
      let Syntax::VarDecl { declarators, .. } = &declaration.stx else {
        continue;
      };
      let [declarator] = &declarators[..] else {
        continue;
      };
      let (Syntax::IdentifierPattern { name }, Some(init)) =
        (&declarator.pattern.stx, declarator.initializer.as_ref())
      else {
        continue;
      };
      if !matches!(init.stx, Syntax::LiteralObjectExpr { .. }) || self.tracked.contains(name.as_str())
      {
        continue;
      };
      locals.insert(name.as_str().to_string(), LocalObject {
        range: self.statement_range(stmt),
        object: &**init,
      });
    }
    locals
  }

  fn statement_range(&self, stmt: &NodeData) -> Range<usize> {
    statement_range(self.text, stmt.loc.start(), stmt.loc.end())
  }

  fn export_name(&self, legacy_name: &str) -> String {
    self
      .renames
      .get(legacy_name)
      .cloned()
      .unwrap_or_else(|| last_segment(legacy_name).to_string())
  }

  fn binding_kind(&self, legacy_names: &[String]) -> &'static str {
    if legacy_names.iter().any(|n| self.mutable.is_mutable(n)) {
      "let"
    } else {
      "const"
    }
  }

  fn strip_comment(&mut self, comment: Range<usize>) {
    if self.stripped.insert(comment.start) {
      strip_namespace_tags(self.text, comment, &mut self.edits);
    };
  }

  fn strip_leading_comment(&mut self, start: usize) {
    if let Some(comment) = leading_doc_comment(self.text, start) {
      self.strip_comment(comment);
    };
  }

  /// Deletes the doc comment above `start` when it only held namespace tags, otherwise strips the tags.
  fn drop_leading_comment(&mut self, start: usize) {
    match leading_doc_comment(self.text, start) {
      Some(comment)
        if only_namespace_tags(&self.text[comment.clone()]) && !self.stripped.contains(&comment.start) =>
      {
        self.stripped.insert(comment.start);
        self
          .edits
          .delete(line_indent_start(self.text, comment.start)..line_indent_start(self.text, start));
      }
      Some(comment) => self.strip_comment(comment),
      None => {}
    };
  }

  /// Removes a statement along with its line, and its doc comment when the comment only held namespace tags.
  fn delete_statement(&mut self, range: Range<usize>) {
    let end = swallow_line_break(self.text, range.end);
    let range = if end > range.end {
      line_indent_start(self.text, range.start)..range.end
    } else {
      range
    };
    let start = match leading_doc_comment(self.text, range.start) {
      Some(comment)
        if only_namespace_tags(&self.text[comment.clone()]) && !self.stripped.contains(&comment.start) =>
      {
        self.stripped.insert(comment.start);
        line_indent_start(self.text, comment.start)
      }
      Some(comment) => {
        self.strip_comment(comment);
        range.start
      }
      None => range.start,
    };
    self.edits.delete(start..end);
  }

  fn add_namespace_name(&mut self, name: &str) {
    if !self.namespace_names.iter().any(|n| n == name) {
      self.namespace_names.push(name.to_string());
    };
  }

  /// Start of the value in `lhs = value`, or of `fallback` in `lhs = lhs || fallback`, which drops the redundant default.
  fn value_start<'n>(&self, assignment: &Assignment<'n, 'a>) -> (usize, &'n NodeData<'a>) {
    let rhs = assignment.rhs;
    let fallback = (balanced(self.text, rhs.loc.start(), rhs.loc.end()).start, rhs);
    let start = find_token(self.text, assignment.lhs_end, b'=')
      .map(|eq| skip_trivia(self.text, eq + 1))
      .unwrap_or(fallback.0);
    if let Syntax::BinaryExpr {
      operator: OperatorName::LogicalOr,
      left,
      right,
      ..
    } = &rhs.stx
    {
      if member_path(left).is_some_and(|p| p.dotted == assignment.target) {
        let left_end = balanced(self.text, left.loc.start(), left.loc.end()).end;
        if let Some(bar) = find_token(self.text, left_end, b'|') {
          if self.text.as_bytes().get(bar + 1) == Some(&b'|') {
            return (skip_trivia(self.text, bar + 2), &**right);
          };
        };
      };
    };
    (start, fallback.1)
  }

  fn plan_assignment<'n>(
    &mut self,
    stmt: &'n NodeData<'a>,
    assignment: Assignment<'n, 'a>,
    locals: &mut HashMap<String, LocalObject<'n, 'a>>,
  ) {
    let target = assignment.target.clone();
    let is_root = self.tracked.contains(&target);
    let is_member = parent_path(&target).is_some_and(|p| self.tracked.contains(p));
    if !is_root && !is_member {
      return;
    };
    let range = self.statement_range(stmt);
    if is_noop(assignment.rhs, &target) {
      self.delete_statement(range);
      return;
    };
    if self.local_exports.contains_key(&target) || self.exploded.contains_key(&target) {
      // Reassignment of something already exported here; local references take care of it.
      return;
    };
    let (value_start, value) = self.value_start(&assignment);

    match &value.stx {
      Syntax::LiteralObjectExpr { .. } if is_root => {
        if self.explode(&[target.clone()], range.clone(), value) {
          self.drop_leading_comment(range.start);
          return;
        };
      }
      Syntax::IdentifierExpr { name } => {
        let ident = name.as_str();
        if let Some(members) = self.exploded.get(ident).cloned() {
          self.alias_namespace(&target, members);
          self.delete_statement(range);
          return;
        };
        if let Some(local) = locals.remove(ident) {
          if self.explode(&[ident.to_string(), target.clone()], local.range.clone(), local.object) {
            self.bindings.remove(ident);
            self.drop_leading_comment(local.range.start);
            self.delete_statement(range);
            return;
          };
        };
        if self.bindings.contains(ident) {
          let name = self.export_name(&target);
          if is_binding_name(&name) && !self.exported.contains(&name) {
            self.edits.replace(range.clone(), export_list(ident, &name));
            self.strip_leading_comment(range.start);
            self.exported.insert(name.clone());
            self.local_exports.insert(target.clone(), ident.to_string());
            self
              .records
              .push(ExportMigrationRecord::new(target, ExportName::Named(name)));
            return;
          };
        };
      }
      _ => {}
    };

    let name = self.export_name(&target);
    let redeclares = self.bindings.contains(&name) && !(assignment.declares_target && name == target);
    if !is_binding_name(&name) || self.exported.contains(&name) || redeclares {
      debug!(legacy_name = %target, export = %name, "export name is taken, leaving assignment in place");
      return;
    };
    let kind = self.binding_kind(&[target.clone()]);
    self
      .edits
      .replace(range.start..value_start, format!("export {kind} {name} = "));
    if !self.text[..range.end].ends_with(';') {
      self.edits.insert(range.end, ";");
    };
    self.strip_leading_comment(range.start);
    self.bindings.insert(name.clone());
    self.exported.insert(name.clone());
    self.local_exports.insert(target.clone(), name.clone());
    self
      .records
      .push(ExportMigrationRecord::new(target, ExportName::Named(name)));
  }

  /// Records another dotted name for a namespace this document already split into exports.
  fn alias_namespace(&mut self, alias: &str, members: Vec<ExplodedMember>) {
    for member in &members {
      let legacy_name = format!("{alias}.{}", member.property);
      self.local_exports.insert(legacy_name.clone(), member.binding.clone());
      self.records.push(ExportMigrationRecord::new(
        legacy_name,
        ExportName::Named(member.name.clone()),
      ));
    }
    self
      .records
      .push(ExportMigrationRecord::new(alias, ExportName::Namespace));
    self.add_namespace_name(alias);
    self.exploded.insert(alias.to_string(), members);
  }

  /// `key: value,` becomes `export const key = value;`.
  fn export_member_value(
    &mut self,
    legacy_names: &[String],
    name: &str,
    head: Range<usize>,
    gap: Range<usize>,
  ) {
    let kind = self.binding_kind(legacy_names);
    self.edits.replace(head, format!("export {kind} {name} = "));
    self.edits.replace(gap, ";");
  }

  /// Splits the object literal of the statement at `range` into one export per member. `roots` are every dotted name the object is known by.
  fn explode(&mut self, roots: &[String], range: Range<usize>, object: &NodeData<'a>) -> bool {
    let Some(members) = explodable_members(self.text, object) else {
      return false;
    };
    let mut resolved = Vec::new();
    let mut names_here = HashSet::default();
    for member in &members {
      let name = roots
        .iter()
        .find_map(|r| self.renames.get(&format!("{r}.{}", member.property)))
        .cloned()
        .unwrap_or_else(|| member.property.clone());
      if !is_binding_name(&name) || self.exported.contains(&name) || !names_here.insert(name.clone())
      {
        return false;
      };
      let binding = match &member.form {
        MemberForm::Alias { ident, .. } if self.bindings.contains(ident) => ident.clone(),
        MemberForm::Alias {
          value_start: None, ..
        } => return false,
        _ if self.bindings.contains(&name) => return false,
        _ => name.clone(),
      };
      resolved.push((name, binding));
    }

    let namespace = self.this_scopes.namespaces.len();
    let mut this_bindings = HashMap::default();
    let mut exploded = Vec::new();
    let open_end = object.loc.start() + 1;
    let inline = self.text[open_end..]
      .bytes()
      .take_while(|b| matches!(b, b' ' | b'\t'))
      .count();
    // `NS = {` on a line of its own goes with its line break.
    let line_start = line_indent_start(self.text, range.start);
    let own_line = line_start == 0 || self.text.as_bytes()[line_start - 1] == b'\n';
    let swallowed = swallow_line_break(self.text, open_end);
    if own_line && swallowed > open_end {
      self.edits.delete(line_start..swallowed);
    } else {
      self.edits.delete(range.start..open_end + inline);
    };
    for (i, (member, (name, binding))) in members.iter().zip(resolved).enumerate() {
      for comment in doc_comments_in(self.text, member.segment_start..member.content.start) {
        self.strip_comment(comment);
      }
      let gap = member.content.end..members.get(i + 1).map_or(range.end, |m| m.segment_start);
      let legacy_names: Vec<String> = roots
        .iter()
        .map(|r| format!("{r}.{}", member.property))
        .collect();
      match &member.form {
        MemberForm::Method {
          key_end,
          is_async,
          generator,
        } => {
          self.edits.replace(
            member.content.start..*key_end,
            export_function_head(&name, *is_async, *generator),
          );
          self.edits.delete(gap);
          self.this_scopes.methods.insert(member.segment_start, namespace);
        }
        MemberForm::Alias {
          ident,
          value_start: Some(value_start),
        } if *ident != binding => {
          self.export_member_value(&legacy_names, &name, member.content.start..*value_start, gap);
        }
        MemberForm::Alias { ident, .. } => {
          self
            .edits
            .replace(member.content.clone(), export_list(ident, &name));
          self.edits.delete(gap);
        }
        MemberForm::Value {
          value_start,
          function_start,
        } => {
          self.export_member_value(&legacy_names, &name, member.content.start..*value_start, gap);
          if let Some(function_start) = function_start {
            self.this_scopes.functions.insert(*function_start, namespace);
          };
        }
      };
      if binding == name {
        self.bindings.insert(name.clone());
      };
      self.exported.insert(name.clone());
      this_bindings.insert(member.property.clone(), binding.clone());
      for legacy_name in legacy_names {
        self.local_exports.insert(legacy_name.clone(), binding.clone());
        self
          .records
          .push(ExportMigrationRecord::new(legacy_name, ExportName::Named(name.clone())));
      }
      exploded.push(ExplodedMember {
        property: member.property.clone(),
        name,
        binding,
      });
    }
    self.this_scopes.namespaces.push(this_bindings);
    for root in roots {
      self
        .records
        .push(ExportMigrationRecord::new(root.clone(), ExportName::Namespace));
      self.add_namespace_name(root);
      self.exploded.insert(root.clone(), exploded.clone());
    }
    true
  }
}
