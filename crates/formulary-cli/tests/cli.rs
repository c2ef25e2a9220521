//! End-to-end tests driving the built `formulary` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test context with an isolated formulary home and working directory
struct TestContext {
    temp_dir: TempDir,
    home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join(".formulary");
        std::fs::create_dir_all(&home).expect("failed to create formulary home");
        Self { temp_dir, home }
    }

    fn cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_formulary");
        let mut cmd = Command::new(bin_path);
        cmd.current_dir(self.temp_dir.path());
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("FORMULARY_HOME", &self.home);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("FORMULARY_FORMULA_DIR");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().expect("failed to run formulary")
    }

    fn run_with_formulae(&self, args: &[&str]) -> Output {
        self.cmd()
            .env("FORMULARY_FORMULA_DIR", shipped_formula_dir())
            .args(args)
            .output()
            .expect("failed to run formulary")
    }

    fn write_formula(&self, file: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(file);
        std::fs::write(&path, content).expect("failed to write formula");
        path
    }
}

fn shipped_formula_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../Formula")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const MISMATCHED: &str = r#"
name = "ecsfgrun"
desc = "AWS assume role credential wrapper"
homepage = "https://github.com/masahide/ecsfgrun"
url = "https://github.com/masahide/ecsfgrun/releases/download/v0.3.0/ecsfgrun_Darwin_x86_64.tar.gz"
version = "0.4.0"
sha256 = "1ff7ad71d900e90e29c4cadd4930d253a09392702af53731d71ecca6a2e50318"
test = ["{bin}/ecsfgrun -v"]

[[install]]
source = "ecsfgrun"
destination = "bin"
"#;

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_check_shipped_formula() {
    let ctx = TestContext::new();
    let path = shipped_formula_dir().join("ecsfgrun.toml");
    let output = ctx.run(&["check", path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ecsfgrun 0.1.0 is valid"));
}

#[test]
fn test_check_formula_dir() {
    let ctx = TestContext::new();
    let output = ctx.run_with_formulae(&["check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ecsfgrun"));
}

#[test]
fn test_check_rejects_version_missing_from_url() {
    let ctx = TestContext::new();
    let path = ctx.write_formula("bad.toml", MISMATCHED);
    let output = ctx.run(&["check", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("does not appear as a release tag"));
    assert!(stderr(&output).contains("invalid"));
}

#[test]
fn test_check_unparseable_manifest() {
    let ctx = TestContext::new();
    let path = ctx.write_formula("broken.toml", "name = ");
    let output = ctx.run(&["check", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to parse"));
}

#[test]
fn test_list_empty() {
    let ctx = TestContext::new();
    let output = ctx.run(&["list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No packages installed."));
}

#[test]
fn test_list_available() {
    let ctx = TestContext::new();
    let output = ctx.run_with_formulae(&["list", "--available"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("ecsfgrun"));
}

#[test]
fn test_info() {
    let ctx = TestContext::new();
    let output = ctx.run_with_formulae(&["info", "ecsfgrun"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("1ff7ad71d900e90e29c4cadd4930d253a09392702af53731d71ecca6a2e50318"));
    assert!(out.contains("{bin}/ecsfgrun -v"));
}

#[test]
fn test_install_dry_run_touches_nothing() {
    let ctx = TestContext::new();
    let output = ctx.run_with_formulae(&["--dry-run", "install", "ecsfgrun"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Would install"));
    assert!(out.contains("ecsfgrun_Darwin_x86_64.tar.gz"));
    assert!(!ctx.home.join("bin").exists());
    assert!(!ctx.home.join("receipts").exists());
}

#[test]
fn test_install_unknown_package() {
    let ctx = TestContext::new();
    let output = ctx.run_with_formulae(&["install", "nope"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No formula named 'nope'"));
}

#[test]
fn test_install_rejects_malformed_manifest() {
    let ctx = TestContext::new();
    let dir = ctx.temp_dir.path().join("formulae");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ecsfgrun.toml"), MISMATCHED).unwrap();

    let output = ctx
        .cmd()
        .args(["--formula-dir", dir.to_str().unwrap(), "install", "ecsfgrun"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("malformed manifest"));
    assert!(!ctx.home.join("receipts").exists());
}

#[test]
fn test_uninstall_not_installed() {
    let ctx = TestContext::new();
    let output = ctx.run(&["uninstall", "ecsfgrun"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not installed"));
}

#[test]
fn test_uninstall_rejects_path_like_name() {
    let ctx = TestContext::new();
    let receipt = r#"{"name":"x","version":"0.1.0","sha256":"1ff7ad71d900e90e29c4cadd4930d253a09392702af53731d71ecca6a2e50318","url":"https://example.com/v0.1.0/x.tar.gz","installed_at":0,"files":[]}"#;
    ctx.write_formula("x.json", receipt);

    let output = ctx.run(&["uninstall", "../../x"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid package name"));
    assert!(ctx.temp_dir.path().join("x.json").exists());
}

#[test]
fn test_test_not_installed() {
    let ctx = TestContext::new();
    let output = ctx.run_with_formulae(&["test", "ecsfgrun"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not installed"));
}

#[test]
fn test_hash_command() {
    let ctx = TestContext::new();
    let path = ctx.write_formula("hello.txt", "hello world");
    let output = ctx.run(&["hash", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(
        stdout(&output)
            .starts_with("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
    );
}

#[test]
fn test_bump_rejects_older_version() {
    let ctx = TestContext::new();
    let path = ctx.write_formula(
        "ecsfgrun.toml",
        &std::fs::read_to_string(shipped_formula_dir().join("ecsfgrun.toml")).unwrap(),
    );
    let output = ctx.run(&[
        "bump",
        path.to_str().unwrap(),
        "--version",
        "0.0.9",
        "--url",
        "https://github.com/masahide/ecsfgrun/releases/download/v0.0.9/ecsfgrun_Darwin_x86_64.tar.gz",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("versions must increase"));
}

#[test]
fn test_bump_dry_run_checks_url() {
    let ctx = TestContext::new();
    let path = ctx.write_formula(
        "ecsfgrun.toml",
        &std::fs::read_to_string(shipped_formula_dir().join("ecsfgrun.toml")).unwrap(),
    );
    let output = ctx.run(&[
        "--dry-run",
        "bump",
        path.to_str().unwrap(),
        "--version",
        "0.4.0",
        "--url",
        "https://github.com/masahide/ecsfgrun/releases/download/v0.3.0/ecsfgrun_Darwin_x86_64.tar.gz",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("would be invalid"));
}
