use ahash::HashSet;
use once_cell::sync::Lazy;
use parse_js::ast::ClassOrObjectMemberKey;
use parse_js::ast::NodeData;
use parse_js::ast::ObjectMemberType;
use parse_js::ast::Syntax;
use parse_js::visit::JourneyControls;
use parse_js::visit::Visitor;

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  [
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
  ]
  .into_iter()
  .collect()
});

pub fn is_reserved(name: &str) -> bool {
  RESERVED.contains(name)
}

/// Whether `name` can be a binding name.
pub fn is_binding_name(name: &str) -> bool {
  let mut chars = name.chars();
  let Some(first) = chars.next() else {
    return false;
  };
  (first.is_alphabetic() || first == '_' || first == '$')
    && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    && !is_reserved(name)
}

/// `iron-a11y-keys` becomes `ironA11yKeys`.
pub fn camel_case(name: &str) -> String {
  let mut out = String::new();
  let mut upper_next = false;
  for c in name.chars() {
    if c.is_alphanumeric() || c == '_' || c == '$' {
      if upper_next && !out.is_empty() {
        out.extend(c.to_uppercase());
      } else {
        out.push(c);
      };
      upper_next = false;
    } else {
      upper_next = true;
    };
  }
  if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
    out.insert(0, '_');
  };
  if is_reserved(&out) {
    out.insert(0, '_');
  };
  out
}

#[derive(Default)]
struct IdentifierCollector {
  names: HashSet<String>,
}

impl<'a> Visitor<'a> for IdentifierCollector {
  fn on_syntax_down(&mut self, node: &mut NodeData<'a>, _ctl: &mut JourneyControls) {
    match &node.stx {
      Syntax::IdentifierExpr { name }
      | Syntax::IdentifierPattern { name }
      | Syntax::ClassOrFunctionName { name } => {
        self.names.insert(name.as_str().to_string());
      }
      Syntax::ObjectMember {
        typ: ObjectMemberType::Shorthand { name },
      } => {
        self.names.insert(name.as_str().to_string());
      }
      Syntax::ObjectPatternProperty {
        key: ClassOrObjectMemberKey::Direct(key),
        target: None,
        ..
      } => {
        self.names.insert(key.as_str().to_string());
      }
      _ => {}
    };
  }
}

/// Every identifier name bound or referenced anywhere in the tree.
pub fn collect_identifiers<'a>(top: &mut NodeData<'a>) -> HashSet<String> {
  let mut collector = IdentifierCollector::default();
  collector.visit(top);
  collector.names
}
