use crate::err::ParseError;
use parse_js::ast::NodeData;
use parse_js::parse;
use parse_js::parse::toplevel::TopLevelMode;
use parse_js::session::Session;

pub mod edit;
pub mod idents;
pub mod mutability;
pub mod namespaces;
pub mod path;
pub mod trivia;

/// Parses `source` as a module and hands the tree to `f`. The tree lives in an arena that is dropped when `f` returns, so anything kept must be owned.
pub fn with_parsed<R>(
  source: &str,
  f: impl for<'a> FnOnce(&mut NodeData<'a>) -> R,
) -> Result<R, ParseError> {
  let session = Session::new();
  let top = parse(&session, source.as_bytes(), TopLevelMode::Module).map_err(ParseError::from)?;
  Ok(f(top))
}
