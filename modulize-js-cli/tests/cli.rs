use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
  let dir = tempfile::tempdir().unwrap();
  for (path, text) in files {
    let dest = dir.path().join(path);
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    fs::write(dest, text).unwrap();
  }
  dir
}

fn cli(root: &Path) -> Command {
  let mut cmd = Command::cargo_bin("modulize-js").unwrap();
  cmd.arg(root.as_os_str());
  cmd
}

#[test]
fn converts_a_workspace_in_place() {
  let dir = project(&[
    ("app/a.js", "NS.foo = 10;\n"),
    ("app/b.js", "console.log(NS.foo);\n"),
  ]);
  cli(dir.path())
    .args(["--layout", "workspace", "-n", "NS", "-e", "app/a.js", "-e", "app/b.js"])
    .assert()
    .success();
  assert_eq!(
    fs::read_to_string(dir.path().join("app/a.js")).unwrap(),
    "export const foo = 10;\n"
  );
  assert_eq!(
    fs::read_to_string(dir.path().join("app/b.js")).unwrap(),
    "import { foo } from './a.js';\nconsole.log(foo);\n"
  );
}

#[test]
fn writes_to_a_separate_output_root() {
  let dir = project(&[("app/a.js", "NS.foo = 10;\n")]);
  let out = tempfile::tempdir().unwrap();
  cli(dir.path())
    .args(["--layout", "workspace", "-n", "NS", "-e", "app/a.js", "--out"])
    .arg(out.path().as_os_str())
    .assert()
    .success();
  assert!(out.path().join("app/a.js").is_file());
  assert_eq!(
    fs::read_to_string(dir.path().join("app/a.js")).unwrap(),
    "NS.foo = 10;\n"
  );
}

#[test]
fn dry_run_prints_and_emits_manifest() {
  let dir = project(&[("app/a.js", "NS.foo = 10;\n")]);
  let manifest = dir.path().join("manifest.json");
  let output = cli(dir.path())
    .args(["--layout", "workspace", "-n", "NS", "-e", "app/a.js", "--dry-run", "--emit-manifest"])
    .arg(manifest.as_os_str())
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();
  let stdout = String::from_utf8(output).unwrap();
  assert!(stdout.contains("==> app/a.js\nexport const foo = 10;\n"), "{stdout:?}");
  assert_eq!(
    fs::read_to_string(dir.path().join("app/a.js")).unwrap(),
    "NS.foo = 10;\n"
  );
  let json: Value = serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
  assert_eq!(json["files"]["a.js"]["convertedUrl"], "a.js");
  assert_eq!(json["files"]["a.js"]["exports"]["NS.foo"], "foo");
}

#[test]
fn failed_documents_exit_non_zero() {
  let dir = project(&[
    ("app/a.js", "NS.foo = 10;\n"),
    ("app/bad.js", "NS.bar = ;\n"),
  ]);
  cli(dir.path())
    .args(["--layout", "workspace", "-n", "NS", "-e", "app/a.js", "-e", "app/bad.js"])
    .assert()
    .code(1);
  // The rest of the run still lands.
  assert_eq!(
    fs::read_to_string(dir.path().join("app/a.js")).unwrap(),
    "export const foo = 10;\n"
  );
}

#[test]
fn entrypoints_are_required() {
  let dir = project(&[("app/a.js", "")]);
  cli(dir.path()).assert().code(2);
}

#[test]
fn config_file_supplies_settings() {
  let dir = project(&[
    ("app/a.js", "NS.foo = 10;\n"),
    ("app/old.js", "NS.old = 1;\n"),
    (
      "settings.json",
      r#"{ "layout": "workspace", "namespaces": ["NS"], "excludes": ["app/old.js"] }"#,
    ),
  ]);
  cli(dir.path())
    .args(["-c"])
    .arg(dir.path().join("settings.json").as_os_str())
    .args(["-e", "app/a.js", "-e", "app/old.js"])
    .assert()
    .success();
  assert!(!dir.path().join("app/old.js").exists());
  assert_eq!(
    fs::read_to_string(dir.path().join("app/a.js")).unwrap(),
    "export const foo = 10;\n"
  );
}
