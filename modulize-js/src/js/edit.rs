use crate::err::ConversionError;
use std::ops::Range;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
  pub range: Range<usize>,
  pub replacement: String,
}

/// Source-range replacements against one text. Edits must not overlap, but any number of insertions may share an offset; they keep the order they were added in.
#[derive(Debug, Default)]
pub struct EditBatch {
  edits: Vec<Edit>,
}

impl EditBatch {
  pub fn new() -> EditBatch {
    EditBatch::default()
  }

  pub fn replace(&mut self, range: Range<usize>, replacement: impl Into<String>) {
    self.edits.push(Edit {
      range,
      replacement: replacement.into(),
    });
  }

  pub fn insert(&mut self, at: usize, text: impl Into<String>) {
    self.replace(at..at, text);
  }

  pub fn delete(&mut self, range: Range<usize>) {
    self.replace(range, "");
  }

  pub fn is_empty(&self) -> bool {
    self.edits.is_empty()
  }

  pub fn len(&self) -> usize {
    self.edits.len()
  }

  /// Whether `range` intersects a non-empty replaced range. Insertions never count.
  pub fn overlaps(&self, range: &Range<usize>) -> bool {
    self
      .edits
      .iter()
      .any(|e| !e.range.is_empty() && e.range.start < range.end && range.start < e.range.end)
  }

  /// Applies every edit, highest offset first, so earlier offsets stay valid.
  pub fn apply(mut self, source: &str) -> Result<String, ConversionError> {
    // Stable, so insertions at one offset keep their order.
    self
      .edits
      .sort_by(|a, b| (a.range.start, a.range.end).cmp(&(b.range.start, b.range.end)));
    for pair in self.edits.windows(2) {
      if pair[1].range.start < pair[0].range.end {
        return Err(ConversionError::OverlappingEdits {
          first: pair[0].range.clone(),
          second: pair[1].range.clone(),
        });
      };
    }
    let mut out = source.to_string();
    for edit in self.edits.into_iter().rev() {
      out.replace_range(edit.range, &edit.replacement);
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn applies_in_any_order() {
    let mut edits = EditBatch::new();
    edits.replace(8..11, "baz");
    edits.replace(0..3, "let");
    edits.insert(11, ";");
    assert_eq!(edits.apply("var x = foo").unwrap(), "let x = baz;");
  }

  #[test]
  fn insertions_at_one_offset_keep_their_order() {
    let mut edits = EditBatch::new();
    edits.insert(0, "a");
    edits.insert(0, "b");
    edits.replace(0..1, "Z");
    assert_eq!(edits.apply("xy").unwrap(), "abZy");
  }

  #[test]
  fn overlap_queries_ignore_insertions() {
    let mut edits = EditBatch::new();
    edits.insert(4, "x");
    edits.delete(10..12);
    assert!(!edits.overlaps(&(0..8)));
    assert!(edits.overlaps(&(11..20)));
    assert!(!edits.overlaps(&(12..20)));
  }

  #[test]
  fn rejects_overlaps() {
    let mut edits = EditBatch::new();
    edits.replace(0..5, "");
    edits.replace(3..7, "");
    assert!(matches!(
      edits.apply("0123456789"),
      Err(ConversionError::OverlappingEdits { .. })
    ));
  }
}
