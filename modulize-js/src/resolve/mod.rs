use crate::err::ConversionError;
use crate::err::ConversionResult;
use crate::exports::ExportName;
use crate::exports::GlobalExportTable;
use crate::js::edit::EditBatch;
use crate::js::idents::collect_identifiers;
use crate::js::trivia::import_insertion_point;
use crate::js::with_parsed;
use crate::settings::ImportStyle;
use crate::urls::ConvertedUrl;
use crate::urls::UrlHandler;
use ahash::HashMap;
use ahash::HashSet;
use aliases::AliasAllocator;
use collect::Reference;
use collect::ReferenceCollector;
use collect::ReferenceKind;
use itertools::Itertools;
use parse_js::visit::Visitor;
use tracing::debug;

mod aliases;
mod collect;

pub use collect::setter_name;

/// Bindings one document imports from one module.
#[derive(Debug, Default)]
struct ImportSpec {
  namespace: Option<String>,
  /// (export name, local alias), in allocation order.
  named: Vec<(String, String)>,
}

impl ImportSpec {
  fn statements(&self, specifier: &str) -> Vec<String> {
    let mut statements = Vec::new();
    if let Some(alias) = &self.namespace {
      statements.push(format!("import * as {alias} from '{specifier}';"));
    };
    if !self.named.is_empty() {
      let names = self
        .named
        .iter()
        .map(|(name, alias)| {
          if name == alias {
            name.clone()
          } else {
            format!("{name} as {alias}")
          }
        })
        .join(", ");
      statements.push(format!("import {{ {names} }} from '{specifier}';"));
    };
    if statements.is_empty() {
      statements.push(format!("import '{specifier}';"));
    };
    statements
  }
}

#[derive(Debug, Default)]
struct ImportPlan {
  order: Vec<ConvertedUrl>,
  specs: HashMap<ConvertedUrl, ImportSpec>,
}

impl ImportPlan {
  fn spec(&mut self, url: &ConvertedUrl) -> &mut ImportSpec {
    if !self.specs.contains_key(url) {
      self.order.push(url.clone());
    };
    self.specs.entry(url.clone()).or_default()
  }

  fn add(&mut self, url: &ConvertedUrl, name: &ExportName, alias: String) -> ConversionResult<()> {
    let spec = self.spec(url);
    match name {
      ExportName::Named(name) => spec.named.push((name.clone(), alias)),
      ExportName::Namespace => {
        if spec.namespace.is_some() {
          return Err(ConversionError::MultipleNamespaceImports { url: url.clone() });
        };
        spec.namespace = Some(alias);
      }
    };
    Ok(())
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveOutput {
  pub text: String,
  pub imports_added: bool,
}

/// Points references to other modules' exports at imported local aliases, and writes the imports.
pub struct ReferenceResolver<'r> {
  table: &'r GlobalExportTable,
  urls: &'r dyn UrlHandler,
  import_style: ImportStyle,
  excludes: HashSet<String>,
}

impl<'r> ReferenceResolver<'r> {
  pub fn new(
    table: &'r GlobalExportTable,
    urls: &'r dyn UrlHandler,
    import_style: ImportStyle,
  ) -> ReferenceResolver<'r> {
    ReferenceResolver {
      table,
      urls,
      import_style,
      excludes: HashSet::default(),
    }
  }

  /// Legacy names that are never resolved, wherever they appear.
  pub fn with_reference_excludes(mut self, names: impl IntoIterator<Item = String>) -> Self {
    self.excludes.extend(names);
    self
  }

  /// Resolves the script `text` of the module at `url`. `explicit` lists the modules the document already included, in order; each gets an import even when nothing is bound from it.
  pub fn resolve(
    &self,
    url: &ConvertedUrl,
    text: &str,
    explicit: &[ConvertedUrl],
  ) -> ConversionResult<ResolveOutput> {
    let (existing, references) = with_parsed(text, |top| {
      let existing = collect_identifiers(top);
      let mut collector = ReferenceCollector::new(text, self.table, url, &self.excludes);
      collector.visit(top);
      (existing, collector.references)
    })?;
    debug!(module = %url, references = references.len(), "resolved references");

    let mut aliases = AliasAllocator::new(existing);
    let mut plan = ImportPlan::default();
    for import in explicit.iter().filter(|u| *u != url) {
      plan.spec(import);
    }
    for Reference {
      legacy_name, target, ..
    } in &references
    {
      let (alias, fresh) = aliases.allocate(legacy_name, target);
      if fresh {
        plan.add(&target.url, &target.name, alias)?;
      };
    }

    let mut edits = EditBatch::new();
    for reference in &references {
      let alias = aliases
        .get(&reference.legacy_name, &reference.target)
        .ok_or_else(|| ConversionError::MissingAlias {
          legacy_name: reference.legacy_name.clone(),
        })?;
      match &reference.kind {
        ReferenceKind::Read(range) => edits.replace(range.clone(), alias),
        ReferenceKind::SetterCall { head, value_end } => {
          edits.replace(head.clone(), format!("{alias}("));
          edits.insert(*value_end, ")");
        }
      };
    }

    let statements: Vec<String> = plan
      .order
      .iter()
      .flat_map(|target| {
        let specifier = self
          .urls
          .relative_import_specifier(url, target, self.import_style);
        plan.specs[target].statements(&specifier)
      })
      .collect();
    let imports_added = !statements.is_empty();
    if imports_added {
      let at = import_insertion_point(text);
      let block = statements.join("\n");
      edits.insert(at, if at == 0 {
        format!("{block}\n")
      } else {
        format!("\n{block}")
      });
    };
    Ok(ResolveOutput {
      text: edits.apply(text)?,
      imports_added,
    })
  }
}
