use crate::urls::ConvertedUrl;
use crate::urls::OriginUrl;
use aho_corasick::BuildError;
use parse_js::error::SyntaxError;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io;
use std::ops::Range;

/// A syntax error, detached from the parser's arena so it can outlive the parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
  pub message: String,
  pub offset: usize,
  pub excerpt: String,
}

impl<'a> From<SyntaxError<'a>> for ParseError {
  fn from(err: SyntaxError<'a>) -> Self {
    ParseError {
      message: err.to_string(),
      offset: err.source.start(),
      excerpt: err.source.as_str().chars().take(40).collect(),
    }
  }
}

impl Display for ParseError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} at offset {} around `{}`",
      self.message, self.offset, self.excerpt
    )
  }
}

impl Error for ParseError {}

#[derive(Debug)]
pub enum HostError {
  NotFound(OriginUrl),
  Io { url: OriginUrl, source: io::Error },
  InvalidUtf8(OriginUrl),
  TagMatcher(BuildError),
}

impl Display for HostError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      HostError::NotFound(url) => write!(f, "document {url} does not exist"),
      HostError::Io { url, source } => write!(f, "failed to read {url}: {source}"),
      HostError::InvalidUtf8(url) => write!(f, "document {url} is not valid UTF-8"),
      HostError::TagMatcher(err) => write!(f, "failed to build the HTML tag matcher: {err}"),
    }
  }
}

impl Error for HostError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      HostError::Io { source, .. } => Some(source),
      HostError::TagMatcher(err) => Some(err),
      _ => None,
    }
  }
}

/// Why a published manifest could not be used. Always recoverable: the scanner falls back to source.
#[derive(Debug)]
pub enum RegistryError {
  NotFound { package: String },
  Io(io::Error),
  Malformed(serde_json::Error),
}

impl Display for RegistryError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      RegistryError::NotFound { package } => write!(f, "no manifest published for {package}"),
      RegistryError::Io(err) => write!(f, "failed to read manifest: {err}"),
      RegistryError::Malformed(err) => write!(f, "malformed manifest: {err}"),
    }
  }
}

impl Error for RegistryError {}

impl From<io::Error> for RegistryError {
  fn from(err: io::Error) -> Self {
    RegistryError::Io(err)
  }
}

impl From<serde_json::Error> for RegistryError {
  fn from(err: serde_json::Error) -> Self {
    RegistryError::Malformed(err)
  }
}

/// Aborts conversion of the current document.
#[derive(Debug)]
pub enum ConversionError {
  Parse(ParseError),
  Host(HostError),
  OverlappingEdits {
    first: Range<usize>,
    second: Range<usize>,
  },
  MultipleNamespaceImports {
    url: ConvertedUrl,
  },
  // Collection and rewriting disagreed about a reference.
  MissingAlias {
    legacy_name: String,
  },
}

impl Display for ConversionError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      ConversionError::Parse(err) => write!(f, "syntax error: {err}"),
      ConversionError::Host(err) => write!(f, "{err}"),
      ConversionError::OverlappingEdits { first, second } => write!(
        f,
        "internal error: edits {}..{} and {}..{} overlap",
        first.start, first.end, second.start, second.end
      ),
      ConversionError::MultipleNamespaceImports { url } => {
        write!(f, "more than one namespace import requested for {url}")
      }
      ConversionError::MissingAlias { legacy_name } => write!(
        f,
        "internal error: no local alias was allocated for {legacy_name}"
      ),
    }
  }
}

impl Error for ConversionError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      ConversionError::Parse(err) => Some(err),
      ConversionError::Host(err) => Some(err),
      _ => None,
    }
  }
}

impl From<ParseError> for ConversionError {
  fn from(err: ParseError) -> Self {
    ConversionError::Parse(err)
  }
}

impl From<HostError> for ConversionError {
  fn from(err: HostError) -> Self {
    ConversionError::Host(err)
  }
}

pub type ConversionResult<T> = Result<T, ConversionError>;
