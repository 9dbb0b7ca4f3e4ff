use super::path::direct_key_name;
use super::path::last_segment;
use super::path::member_path;
use ahash::HashMap;
use ahash::HashSet;
use parse_js::ast::NodeData;
use parse_js::ast::ObjectMemberType;
use parse_js::ast::Syntax;
use parse_js::operator::OperatorName;
use parse_js::visit::JourneyControls;
use parse_js::visit::Visitor;

/// Dotted names that cannot become `const` bindings: assigned more than once, updated in place, or written through `this`.
#[derive(Debug, Default)]
pub struct MutableNameSet {
  names: HashSet<String>,
}

#[derive(Default)]
struct AssignmentCounter {
  counts: HashMap<String, usize>,
  mutated: HashSet<String>,
}

impl AssignmentCounter {
  fn assigned(&mut self, dotted: String) {
    if dotted.starts_with("this.") {
      self.mutated.insert(dotted);
    } else {
      *self.counts.entry(dotted).or_default() += 1;
    }
  }

  // An object literal assigned to `base` defines each of its keys as `base.key`.
  fn assigned_members(&mut self, base: &str, value: &NodeData) {
    let Syntax::LiteralObjectExpr { members } = &value.stx else {
      return;
    };
    for member in members.iter() {
      let key = match &member.stx {
        Syntax::ObjectMember {
          typ: ObjectMemberType::Valued { key, .. },
        } => direct_key_name(key),
        Syntax::ObjectMember {
          typ: ObjectMemberType::Shorthand { name },
        } => Some(name.as_str().to_string()),
        _ => None,
      };
      if let Some(key) = key {
        self.assigned(format!("{base}.{key}"));
      };
    }
  }
}

pub fn is_compound_assignment(op: OperatorName) -> bool {
  matches!(
    op,
    OperatorName::AssignmentAddition
      | OperatorName::AssignmentBitwiseAnd
      | OperatorName::AssignmentBitwiseLeftShift
      | OperatorName::AssignmentBitwiseOr
      | OperatorName::AssignmentBitwiseRightShift
      | OperatorName::AssignmentBitwiseUnsignedRightShift
      | OperatorName::AssignmentBitwiseXor
      | OperatorName::AssignmentDivision
      | OperatorName::AssignmentExponentiation
      | OperatorName::AssignmentLogicalAnd
      | OperatorName::AssignmentLogicalOr
      | OperatorName::AssignmentMultiplication
      | OperatorName::AssignmentNullishCoalescing
      | OperatorName::AssignmentRemainder
      | OperatorName::AssignmentSubtraction
  )
}

pub fn is_update(op: OperatorName) -> bool {
  matches!(
    op,
    OperatorName::PrefixIncrement
      | OperatorName::PrefixDecrement
      | OperatorName::PostfixIncrement
      | OperatorName::PostfixDecrement
  )
}

impl<'a> Visitor<'a> for AssignmentCounter {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, _ctl: &mut JourneyControls) {
    match &node.stx {
      Syntax::BinaryExpr {
        operator: OperatorName::Assignment,
        left,
        right,
        ..
      } => {
        if let Some(path) = member_path(left) {
          self.assigned_members(&path.dotted, right);
          self.assigned(path.dotted);
        };
      }
      Syntax::BinaryExpr {
        operator,
        left,
        ..
      } if is_compound_assignment(*operator) => {
        if let Some(path) = member_path(left) {
          self.mutated.insert(path.dotted);
        };
      }
      Syntax::UnaryExpr {
        operator, argument, ..
      }
      | Syntax::UnaryPostfixExpr {
        operator, argument, ..
      } if is_update(*operator) => {
        if let Some(path) = member_path(argument) {
          self.mutated.insert(path.dotted);
        };
      }
      Syntax::VarDecl { declarators, .. } => {
        for decl in declarators.iter() {
          let (Syntax::IdentifierPattern { name }, Some(init)) =
            (&decl.pattern.stx, decl.initializer.as_ref())
          else {
            continue;
          };
          self.assigned_members(name.as_str(), init);
          self.assigned(name.as_str().to_string());
        }
      }
      _ => {}
    };
  }
}

impl MutableNameSet {
  pub fn collect<'a>(top: &mut NodeData<'a>) -> MutableNameSet {
    let mut counter = AssignmentCounter::default();
    counter.visit(top);
    let mut names = counter.mutated;
    names.extend(
      counter
        .counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name),
    );
    MutableNameSet { names }
  }

  pub fn contains(&self, dotted: &str) -> bool {
    self.names.contains(dotted)
  }

  /// Checks `dotted` itself and its `this.<last segment>` form, which is how methods of the namespace object write it.
  pub fn is_mutable(&self, dotted: &str) -> bool {
    self.contains(dotted) || self.contains(&format!("this.{}", last_segment(dotted)))
  }
}

#[cfg(test)]
mod tests {
  use super::MutableNameSet;
  use crate::js::with_parsed;

  fn collect(src: &str) -> MutableNameSet {
    with_parsed(src, MutableNameSet::collect).unwrap()
  }

  #[test]
  fn single_assignment_is_immutable() {
    let set = collect("NS.a = 1; NS.b = 2; NS.b = 3;");
    assert!(!set.is_mutable("NS.a"));
    assert!(set.is_mutable("NS.b"));
  }

  #[test]
  fn updates_make_names_mutable() {
    let set = collect("NS.counter = 0; NS.increment = function() { NS.counter++; }; NS.total += 1;");
    assert!(set.is_mutable("NS.counter"));
    assert!(set.is_mutable("NS.total"));
    assert!(!set.is_mutable("NS.increment"));
  }

  #[test]
  fn writes_through_this_count_for_every_namespace() {
    let set = collect("NS = { size: 1, grow() { this.size = 2; } };");
    assert!(set.contains("this.size"));
    assert!(set.is_mutable("NS.size"));
    assert!(!set.is_mutable("NS.grow"));
  }

  #[test]
  fn object_literal_members_count_as_assignments() {
    let set = collect("window.NS = { a: 1 }; NS.a = 2;");
    assert!(set.is_mutable("NS.a"));
    let set = collect("var x = 1; x = 2; let y = 1;");
    assert!(set.is_mutable("x"));
    assert!(!set.is_mutable("y"));
  }
}
