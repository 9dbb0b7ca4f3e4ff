use crate::js::idents::is_binding_name;
use crate::js::path::direct_key_name;
use crate::js::trivia::balanced;
use crate::js::trivia::find_token;
use crate::js::trivia::skip_trivia;
use ahash::HashSet;
use parse_js::ast::ClassOrObjectMemberKey;
use parse_js::ast::ClassOrObjectMemberValue;
use parse_js::ast::NodeData;
use parse_js::ast::ObjectMemberType;
use parse_js::ast::Syntax;
use std::ops::Range;

pub enum MemberForm {
  /// `key: value`. Function expression values also record where the function starts.
  Value {
    value_start: usize,
    function_start: Option<usize>,
  },
  /// `key(…) { … }`, possibly async or a generator.
  Method {
    key_end: usize,
    is_async: bool,
    generator: bool,
  },
  /// `key: ident` or the shorthand `ident`. Shorthands have no separate value.
  Alias {
    ident: String,
    value_start: Option<usize>,
  },
}

pub struct PlannedMember {
  pub property: String,
  /// Where the member's node starts: right after the preceding `{` or `,`, so any leading comments are included.
  pub segment_start: usize,
  pub content: Range<usize>,
  pub form: MemberForm,
}

/// Members of an object literal that can each become a top-level export. None when any member is a getter, setter, spread, computed or non-identifier key, or a duplicate.
pub fn explodable_members(text: &str, object: &NodeData) -> Option<Vec<PlannedMember>> {
  let Syntax::LiteralObjectExpr { members } = &object.stx else {
    return None;
  };
  let mut seen = HashSet::default();
  let mut planned = Vec::new();
  for member in members.iter() {
    let Syntax::ObjectMember { typ } = &member.stx else {
      return None;
    };
    let segment_start = member.loc.start();
    let content = skip_trivia(text, segment_start)
      ..balanced(text, member.loc.start(), member.loc.end()).end;
    let (property, form) = match typ {
      ObjectMemberType::Shorthand { name } => (name.as_str().to_string(), MemberForm::Alias {
        ident: name.as_str().to_string(),
        value_start: None,
      }),
      ObjectMemberType::Valued { key, value } => {
        let ClassOrObjectMemberKey::Direct(key_range) = key else {
          return None;
        };
        let property = direct_key_name(key)?;
        let form = match value {
          ClassOrObjectMemberValue::Property {
            initializer: Some(init),
          } => {
            let colon = find_token(text, key_range.end(), b':')?;
            let value_start = skip_trivia(text, colon + 1);
            match &init.stx {
              Syntax::IdentifierExpr { name } => MemberForm::Alias {
                ident: name.as_str().to_string(),
                value_start: Some(value_start),
              },
              Syntax::FunctionExpr { .. } => MemberForm::Value {
                value_start,
                function_start: Some(init.loc.start()),
              },
              _ => MemberForm::Value {
                value_start,
                function_start: None,
              },
            }
          }
          // The parser reports `get a() {}` and `set a(v) {}` as plain methods.
          ClassOrObjectMemberValue::Method { .. }
            if is_accessor(&text[content.start..key_range.start()]) =>
          {
            return None;
          }
          ClassOrObjectMemberValue::Method {
            is_async,
            generator,
            ..
          } => MemberForm::Method {
            key_end: key_range.end(),
            is_async: *is_async,
            generator: *generator,
          },
          _ => return None,
        };
        (property, form)
      }
      _ => return None,
    };
    if !is_binding_name(&property) || !seen.insert(property.clone()) {
      return None;
    };
    planned.push(PlannedMember {
      property,
      segment_start,
      content,
      form,
    });
  }
  Some(planned)
}

/// Whether the text before a member's key starts with a `get` or `set` modifier.
fn is_accessor(prefix: &str) -> bool {
  let word: String = prefix
    .trim_start()
    .chars()
    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
    .collect();
  word == "get" || word == "set"
}

/// `export { ident as name };`, collapsed when both are the same.
pub fn export_list(ident: &str, name: &str) -> String {
  if ident == name {
    format!("export {{ {ident} }};")
  } else {
    format!("export {{ {ident} as {name} }};")
  }
}

pub fn export_function_head(name: &str, is_async: bool, generator: bool) -> String {
  format!(
    "export {}function{} {name}",
    if is_async { "async " } else { "" },
    if generator { "*" } else { "" }
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::js::with_parsed;
  use parse_js::visit::JourneyControls;
  use parse_js::visit::Visitor;

  struct FirstObject<'t> {
    text: &'t str,
    found: Option<Option<Vec<PlannedMember>>>,
  }

  impl<'t, 'a> Visitor<'a> for FirstObject<'t> {
    fn on_syntax_down(&mut self, node: &mut NodeData<'a>, ctl: &mut JourneyControls) {
      if self.found.is_none() {
        if let Syntax::LiteralObjectExpr { .. } = node.stx {
          self.found = Some(explodable_members(self.text, node));
          ctl.skip();
        };
      };
    }
  }

  fn members(src: &str) -> Option<Vec<PlannedMember>> {
    with_parsed(src, |top| {
      let mut finder = FirstObject {
        text: src,
        found: None,
      };
      finder.visit(top);
      finder.found.flatten()
    })
    .unwrap()
  }

  fn kinds(src: &str) -> Option<Vec<(String, &'static str)>> {
    members(src).map(|members| {
      members
        .into_iter()
        .map(|m| {
          let kind = match m.form {
            MemberForm::Value { .. } => "value",
            MemberForm::Method { .. } => "method",
            MemberForm::Alias { .. } => "alias",
          };
          (m.property, kind)
        })
        .collect()
    })
  }

  #[test]
  fn classifies_members() {
    let found = kinds("NS = { a: 1, 'b': x, c, d() {}, async *e() {}, f: function() {} };").unwrap();
    assert_eq!(found, vec![
      ("a".to_string(), "value"),
      ("b".to_string(), "alias"),
      ("c".to_string(), "alias"),
      ("d".to_string(), "method"),
      ("e".to_string(), "method"),
      ("f".to_string(), "value"),
    ]);
  }

  #[test]
  fn get_and_set_can_still_be_member_names() {
    let found = kinds("NS = { get() {}, set: 1, async get2() {} };").unwrap();
    assert_eq!(found, vec![
      ("get".to_string(), "method"),
      ("set".to_string(), "value"),
      ("get2".to_string(), "method"),
    ]);
  }

  #[test]
  fn rejects_objects_that_cannot_be_split() {
    assert!(kinds("NS = { get a() { return 1; } };").is_none());
    assert!(kinds("NS = { b: 2, set mode(v) { this._m = v; } };").is_none());
    assert!(kinds("NS = { [k]: 1 };").is_none());
    assert!(kinds("NS = { a: 1, a: 2 };").is_none());
    assert!(kinds("NS = { ...o };").is_none());
    assert!(kinds("NS = { default: 1 };").is_none());
  }

  #[test]
  fn content_excludes_leading_comments() {
    let src = "NS = {\n  /** Doc. */\n  a: (1),\n  b() {}\n};";
    let found = members(src).unwrap();
    assert_eq!(&src[found[0].content.clone()], "a: (1)");
    assert_eq!(&src[found[1].content.clone()], "b() {}");
    assert_eq!(found[0].segment_start, 6);
    match found[0].form {
      MemberForm::Value { value_start, .. } => assert_eq!(&src[value_start..value_start + 3], "(1)"),
      _ => panic!("expected a value"),
    };
  }

  #[test]
  fn export_text() {
    assert_eq!(export_list("a", "a"), "export { a };");
    assert_eq!(export_list("impl", "a"), "export { impl as a };");
    assert_eq!(export_function_head("run", true, true), "export async function* run");
  }
}
