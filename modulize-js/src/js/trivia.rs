use super::edit::EditBatch;
use std::ops::Range;

// The parser drops grouping parentheses from node locations, and nodes built from checkpoints start right after the previous token. Everything here recovers real token extents from the text.

fn byte(text: &str, i: usize) -> u8 {
  text.as_bytes().get(i).copied().unwrap_or(0)
}

/// Skips whitespace and comments forward from `pos`.
pub fn skip_trivia(text: &str, mut pos: usize) -> usize {
  let bytes = text.as_bytes();
  loop {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
      pos += 1;
    }
    if text[pos..].starts_with("//") {
      pos = text[pos..].find('\n').map(|i| pos + i + 1).unwrap_or(bytes.len());
    } else if text[pos..].starts_with("/*") {
      pos = text[pos + 2..]
        .find("*/")
        .map(|i| pos + 2 + i + 2)
        .unwrap_or(bytes.len());
    } else {
      return pos;
    };
  }
}

/// Skips whitespace backward from `pos`, returning the offset just after the previous non-whitespace byte.
pub fn skip_whitespace_back(text: &str, mut pos: usize) -> usize {
  while pos > 0 && byte(text, pos - 1).is_ascii_whitespace() {
    pos -= 1;
  }
  pos
}

fn skip_whitespace(text: &str, mut pos: usize) -> usize {
  while pos < text.len() && byte(text, pos).is_ascii_whitespace() {
    pos += 1;
  }
  pos
}

fn skip_inline_whitespace(text: &str, mut pos: usize) -> usize {
  while matches!(byte(text, pos), b' ' | b'\t') {
    pos += 1;
  }
  pos
}

/// Counts parentheses in `range` outside strings, templates and comments. Returns (unmatched closing, unmatched opening).
fn paren_imbalance(text: &str, range: Range<usize>) -> (usize, usize) {
  let bytes = &text.as_bytes()[range];
  let mut depth = 0usize;
  let mut unmatched_close = 0usize;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      q @ (b'\'' | b'"' | b'`') => {
        i += 1;
        while i < bytes.len() && bytes[i] != q {
          if bytes[i] == b'\\' {
            i += 1;
          };
          i += 1;
        }
      }
      b'/' if bytes.get(i + 1) == Some(&b'/') => {
        while i < bytes.len() && bytes[i] != b'\n' {
          i += 1;
        }
      }
      b'/' if bytes.get(i + 1) == Some(&b'*') => {
        i += 2;
        while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
          i += 1;
        }
        i += 1;
      }
      b'(' => depth += 1,
      b')' => {
        if depth == 0 {
          unmatched_close += 1;
        } else {
          depth -= 1;
        }
      }
      _ => {}
    };
    i += 1;
  }
  (unmatched_close, depth)
}

/// Widens a node location so that its parentheses balance again.
pub fn balanced(text: &str, start: usize, end: usize) -> Range<usize> {
  let (close, open) = paren_imbalance(text, start..end);
  let mut start = start;
  for _ in 0..close {
    let p = skip_whitespace_back(text, start);
    if p == 0 || byte(text, p - 1) != b'(' {
      break;
    };
    start = p - 1;
  }
  let mut end = end;
  for _ in 0..open {
    let p = skip_whitespace(text, end);
    if byte(text, p) != b')' {
      break;
    };
    end = p + 1;
  }
  start..end
}

/// Full extent of a statement given its node location: balanced, any wrapping parentheses, and the terminating semicolon.
pub fn statement_range(text: &str, start: usize, end: usize) -> Range<usize> {
  let Range { mut start, mut end } = balanced(text, start, end);
  loop {
    let before = skip_whitespace_back(text, start);
    let after = skip_whitespace(text, end);
    if before > 0 && byte(text, before - 1) == b'(' && byte(text, after) == b')' {
      start = before - 1;
      end = after + 1;
    } else {
      break;
    };
  }
  let after = skip_inline_whitespace(text, end);
  if byte(text, after) == b';' {
    end = after + 1;
  };
  start..end
}

/// Like `statement_range` but excluding the semicolon.
pub fn statement_content_end(text: &str, range: &Range<usize>) -> usize {
  if range.end > range.start && byte(text, range.end - 1) == b';' {
    skip_whitespace_back(text, range.end - 1)
  } else {
    range.end
  }
}

/// Position of the first occurrence of `ch` at or after `pos`, skipping trivia in between.
pub fn find_token(text: &str, pos: usize, ch: u8) -> Option<usize> {
  let p = skip_trivia(text, pos);
  (byte(text, p) == ch).then_some(p)
}

/// The `/** ... */` block directly preceding `pos`, separated by whitespace only.
pub fn leading_doc_comment(text: &str, pos: usize) -> Option<Range<usize>> {
  let end = skip_whitespace_back(text, pos);
  if !text[..end].ends_with("*/") {
    return None;
  };
  let start = text[..end - 2].rfind("/*")?;
  text[start..].starts_with("/**").then_some(start..end)
}

/// Every `/** ... */` block inside `range`.
pub fn doc_comments_in(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
  let mut found = Vec::new();
  let mut pos = range.start;
  while pos < range.end {
    let Some(rel) = text[pos..range.end].find("/**") else {
      break;
    };
    let start = pos + rel;
    let Some(close) = text[start + 3..].find("*/") else {
      break;
    };
    let end = start + 3 + close + 2;
    found.push(start..end);
    pos = end;
  }
  found
}

const NAMESPACE_TAGS: &[&str] = &["@memberof", "@namespace"];

/// Removes namespace membership tags from a doc comment, keeping everything else about it.
pub fn strip_namespace_tags(text: &str, comment: Range<usize>, edits: &mut EditBatch) {
  let mut line_start = comment.start;
  for line in text[comment.clone()].split_inclusive('\n') {
    let line_end = line_start + line.len();
    if let Some(tag_at) = NAMESPACE_TAGS.iter().filter_map(|t| line.find(t)).min() {
      let opens = line_start == comment.start;
      let closes = line.contains("*/");
      if !opens && !closes {
        edits.delete(line_start..line_end);
      } else {
        let tag_start = skip_whitespace_back(text, line_start + tag_at).max(if opens {
          comment.start + 3
        } else {
          line_start
        });
        let tag_end = match line.find("*/") {
          Some(close) => skip_whitespace_back(text, line_start + close).max(line_start + tag_at),
          None => line_start + line.trim_end_matches(|c| c == '\r' || c == '\n').len(),
        };
        edits.delete(tag_start..tag_end);
      };
    };
    line_start = line_end;
  }
}

/// Extends the end of a removed statement over the rest of its line when nothing else is on it.
pub fn swallow_line_break(text: &str, end: usize) -> usize {
  let after = skip_inline_whitespace(text, end);
  match byte(text, after) {
    b'\n' => after + 1,
    b'\r' if byte(text, after + 1) == b'\n' => after + 2,
    _ => end,
  }
}

/// Whether a doc comment says nothing besides namespace membership tags.
pub fn only_namespace_tags(comment: &str) -> bool {
  comment.lines().all(|line| {
    let line = line
      .trim()
      .trim_start_matches("/**")
      .trim_end_matches("*/")
      .trim_start_matches('*')
      .trim();
    line.is_empty() || NAMESPACE_TAGS.iter().any(|t| line.starts_with(t))
  })
}

/// Names declared by `@namespace` tags in the doc comment, or None when it carries no such tag. An empty name means the tag names whatever follows the comment.
pub fn namespace_tag(comment: &str) -> Option<String> {
  let at = comment.find("@namespace")?;
  let rest = &comment[at + "@namespace".len()..];
  let name: String = rest
    .trim_start_matches(|c| c == ' ' || c == '\t')
    .chars()
    .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'))
    .collect();
  Some(name)
}

/// Where synthesized imports go: after a leading `@license` comment if the document opens with one.
pub fn import_insertion_point(text: &str) -> usize {
  let start = skip_whitespace(text, 0);
  if text[start..].starts_with("/*") {
    if let Some(close) = text[start..].find("*/") {
      let end = start + close + 2;
      if text[start..end].contains("@license") {
        return end;
      };
    };
  };
  0
}
