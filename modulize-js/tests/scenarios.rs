use common::assert_file;
use common::host;
use common::modules;
use common::workspace;
use modulize_js::context::RunContext;
use modulize_js::convert_project;
use modulize_js::exports::ExportName;
use modulize_js::scan::Entrypoint;
use modulize_js::scan::ProjectScanner;
use modulize_js::url_handler;
use modulize_js::urls::names::DependencyMap;
use modulize_js::urls::OriginUrl;
use std::sync::Arc;

mod common;

#[test]
fn reads_become_imports_of_the_defining_module() {
  let host = host(&[
    ("app/a.js", "NS.foo = 10;\n"),
    ("app/b.js", "console.log(NS.foo);\n"),
  ]);
  let report = convert_project(&host, &workspace(&["NS"]), &modules(&["app/a.js", "app/b.js"]), None);
  assert!(report.is_success());
  assert_file(&report, "app/a.js", "export const foo = 10;\n");
  assert_file(
    &report,
    "app/b.js",
    "import { foo } from './a.js';\nconsole.log(foo);\n",
  );
}

#[test]
fn mutable_counters_and_their_functions() {
  let host = host(&[
    (
      "app/counter.js",
      "NS.counter = 0;\nNS.increment = function() { NS.counter++; };\n",
    ),
    ("app/main.js", "NS.increment();\nconsole.log(NS.counter);\n"),
  ]);
  let report = convert_project(
    &host,
    &workspace(&["NS"]),
    &modules(&["app/counter.js", "app/main.js"]),
    None,
  );
  assert_file(
    &report,
    "app/counter.js",
    "export let counter = 0;\nexport const increment = function() { counter++; };\n",
  );
  assert_file(
    &report,
    "app/main.js",
    "import { increment, counter } from './counter.js';\nincrement();\nconsole.log(counter);\n",
  );
}

#[test]
fn mutually_including_documents_import_each_other() {
  let host = host(&[
    (
      "app/a.html",
      "<link rel=\"import\" href=\"b.html\">\n<script>\nNS.a = 1;\nconsole.log(NS.b);\n</script>\n",
    ),
    (
      "app/b.html",
      "<link rel=\"import\" href=\"a.html\">\n<script>\nNS.b = 2;\nconsole.log(NS.a);\n</script>\n",
    ),
  ]);
  let report = convert_project(&host, &workspace(&["NS"]), &modules(&["app/a.html"]), None);
  assert!(report.is_success(), "{:?}", report.failures);
  assert_file(
    &report,
    "app/a.js",
    "import { b } from './b.js';\nexport const a = 1;\nconsole.log(b);\n",
  );
  assert_file(
    &report,
    "app/b.js",
    "import { a } from './a.js';\nexport const b = 2;\nconsole.log(a);\n",
  );
}

#[test]
fn imports_never_shadow_existing_bindings() {
  let host = host(&[
    ("app/a.js", "NS.foo = 10;\n"),
    ("app/b.js", "const foo = 1;\nconsole.log(NS.foo, foo);\n"),
  ]);
  let report = convert_project(&host, &workspace(&["NS"]), &modules(&["app/a.js", "app/b.js"]), None);
  assert_file(
    &report,
    "app/b.js",
    "import { foo as foo$0 } from './a.js';\nconst foo = 1;\nconsole.log(foo$0, foo);\n",
  );
}

#[test]
fn wrapped_scripts_are_unwrapped() {
  let host = host(&[("app/a.js", "(function() {\n  NS.a = 1;\n})();\n")]);
  let report = convert_project(&host, &workspace(&["NS"]), &modules(&["app/a.js"]), None);
  let text = report.contents("app/a.js").unwrap();
  assert!(text.contains("export const a = 1;"), "{text}");
  assert!(!text.contains("function"), "{text}");
}

#[test]
fn cross_module_writes_use_setters() {
  let host = host(&[
    (
      "app/a.js",
      "NS.foo = 1;\nNS.setFoo = function(v) { NS.foo = v; };\n",
    ),
    ("app/b.js", "function reset() { NS.foo = 5; }\nreset();\n"),
    ("app/c.js", "function bump() { NS.bar = 2; }\n"),
    ("app/d.js", "NS.bar = 1;\n"),
  ]);
  let report = convert_project(
    &host,
    &workspace(&["NS"]),
    &modules(&["app/a.js", "app/b.js", "app/c.js", "app/d.js"]),
    None,
  );
  assert_file(
    &report,
    "app/b.js",
    "import { setFoo } from './a.js';\nfunction reset() { setFoo(5); }\nreset();\n",
  );
  // No setter to go through.
  assert_file(&report, "app/c.js", "function bump() { NS.bar = 2; }\n");
}

#[test]
fn excluded_documents_are_deleted_and_unimported() {
  let host = host(&[
    (
      "app/a.html",
      "<link rel=\"import\" href=\"old.html\">\n<script>NS.a = 1;</script>\n",
    ),
    ("app/old.html", "<script>NS.old = 1;</script>\n"),
  ]);
  let settings = workspace(&["NS"]).with_exclude("app/old.html");
  let report = convert_project(&host, &settings, &modules(&["app/a.html"]), None);
  assert_file(&report, "app/a.js", "export const a = 1;\n");
  assert_eq!(
    report.deleted().collect::<Vec<_>>(),
    vec![&OriginUrl::new("app/old.html")]
  );
}

#[test]
fn pages_stay_html_with_module_scripts() {
  let host = host(&[
    (
      "app/index.html",
      "<link rel=\"import\" href=\"el.html\">\n<script src=\"vendor.js\"></script>\n<script>\n  NS.el();\n</script>\n",
    ),
    ("app/el.html", "<script>NS.el = function() {};</script>\n"),
  ]);
  let report = convert_project(
    &host,
    &workspace(&["NS"]),
    &[Entrypoint::Page(OriginUrl::new("app/index.html"))],
    None,
  );
  assert!(report.is_success(), "{:?}", report.failures);
  assert_file(&report, "app/el.js", "export const el = function() {};\n");
  assert_file(
    &report,
    "app/index.html",
    concat!(
      "<script type=\"module\" src=\"./el.js\"></script>\n",
      "<script src=\"vendor.js\"></script>\n",
      "<script type=\"module\">\nimport { el } from './el.js';\n\n  el();\n</script>\n",
    ),
  );
}

#[test]
fn leftover_markup_is_injected_by_the_module() {
  let host = host(&[(
    "app/el.html",
    "<dom-module id=\"x-el\"><template>hi</template></dom-module>\n<script>NS.el = 1;</script>\n",
  )]);
  let report = convert_project(&host, &workspace(&["NS"]), &modules(&["app/el.html"]), None);
  let text = report.contents("app/el.js").unwrap();
  assert!(
    text.starts_with("const $_documentContainer = document.createElement('template');\n"),
    "{text}"
  );
  assert!(text.contains("`<dom-module id=\"x-el\"><template>hi</template></dom-module>`"));
  assert!(text.ends_with("document.head.appendChild($_documentContainer.content);\nexport const el = 1;\n"));
}

#[test]
fn broken_documents_do_not_stop_the_run() {
  let host = host(&[
    ("app/a.js", "NS.foo = 10;\n"),
    ("app/bad.js", "NS.bar = ;\n"),
  ]);
  let report = convert_project(&host, &workspace(&["NS"]), &modules(&["app/a.js", "app/bad.js"]), None);
  assert!(!report.is_success());
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].url, OriginUrl::new("app/bad.js"));
  assert_file(&report, "app/a.js", "export const foo = 10;\n");
  assert_eq!(report.contents("app/bad.js"), None);
}

#[test]
fn conflicting_claims_keep_the_first_writer() {
  let host = host(&[
    ("app/a.js", "NS.x = 1;\n"),
    ("app/b.js", "NS.x = 2;\n"),
  ]);
  let settings = workspace(&["NS"]).with_export_conflict_detection(true);
  let urls = url_handler(&settings, Arc::new(RunContext::new(DependencyMap::default())));
  let scan = ProjectScanner::new(&host, urls.as_ref(), &settings)
    .scan(&modules(&["app/a.js", "app/b.js"]));
  let kept = scan.exports.get("NS.x").unwrap();
  assert_eq!(kept.url.as_str(), "./app/a.js");
  assert_eq!(kept.name, ExportName::Named("x".into()));
  assert_eq!(scan.exports.conflicts().len(), 1);
  assert_eq!(scan.exports.conflicts()[0].dropped.url.as_str(), "./app/b.js");
}
