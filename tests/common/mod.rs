#![allow(dead_code)]

use assert_cmd::cargo_bin;
use std::path::Path;
use std::process::Command;

pub fn cli(state: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("atelier-orders"));
    cmd.arg("--state").arg(state);
    cmd
}

/// Runs a command that is expected to succeed and returns its stdout.
pub fn run(state: &Path, args: &[&str]) -> String {
    let output = cli(state).args(args).output().expect("command failed to spawn");
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout was not utf-8")
}

/// Pulls `key=value` out of a line like `created order 1 token=abc…`.
pub fn extract<'a>(stdout: &'a str, key: &str) -> &'a str {
    let marker = format!("{key}=");
    let start = stdout
        .find(&marker)
        .unwrap_or_else(|| panic!("no `{key}=` in {stdout:?}"))
        + marker.len();
    let rest = &stdout[start..];
    rest.split_whitespace().next().unwrap()
}

/// Second word of a line starting with the given prefix, e.g. the session id
/// out of `session DP-1-1719999999`.
pub fn word_after<'a>(stdout: &'a str, prefix: &str) -> &'a str {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(prefix))
        .unwrap_or_else(|| panic!("no line starting with `{prefix}` in {stdout:?}"))
        .trim()
        .split_whitespace()
        .next()
        .unwrap()
}
