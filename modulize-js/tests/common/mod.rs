use modulize_js::convert::ConversionReport;
use modulize_js::host::MemoryHost;
use modulize_js::scan::Entrypoint;
use modulize_js::settings::ConversionSettings;
use modulize_js::settings::Layout;
use modulize_js::urls::OriginUrl;
use similar::ChangeTag;
use similar::TextDiff;

pub fn workspace(namespaces: &[&str]) -> ConversionSettings {
  namespaces
    .iter()
    .fold(ConversionSettings::new(Layout::Workspace), |s, ns| s.with_namespace(*ns))
}

pub fn modules(paths: &[&str]) -> Vec<Entrypoint> {
  paths
    .iter()
    .map(|p| Entrypoint::Module(OriginUrl::new(p)))
    .collect()
}

pub fn host(files: &[(&str, &str)]) -> MemoryHost {
  files
    .iter()
    .fold(MemoryHost::new(), |host, (path, text)| host.with_document(path, *text))
}

pub fn assert_text(actual: &str, expected: &str) {
  if actual == expected {
    return;
  };
  let mut msg = String::from("output differs:\n");
  for change in TextDiff::from_lines(expected, actual).iter_all_changes() {
    let sign = match change.tag() {
      ChangeTag::Delete => "-",
      ChangeTag::Insert => "+",
      ChangeTag::Equal => " ",
    };
    msg.push_str(sign);
    msg.push_str(change.as_str().unwrap_or_default());
    if change.missing_newline() {
      msg.push('\n');
    };
  }
  panic!("{msg}");
}

pub fn assert_file(report: &ConversionReport, path: &str, expected: &str) {
  match report.contents(path) {
    Some(actual) => assert_text(actual, expected),
    None => panic!("{path} was not written; failures: {:?}", report.failures),
  }
}
