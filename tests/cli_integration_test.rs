mod common;

use std::process::{Command, Output};

use common::*;

fn run(args: &[&str], cwd: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_artifact-deriver"))
        .args(args)
        .current_dir(cwd)
        .env_remove("ARTIFACT_DERIVER_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute artifact-deriver")
}

#[test]
fn test_cli_help_output() {
    let dir = document_dir(&[]);
    let output = run(&["--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for flag in [
        "--extensions",
        "--type",
        "--alias",
        "--threads",
        "--timeout",
        "--no-link",
        "--fail-fast",
        "--format",
        "--config",
        "--verbose",
        "--quiet",
    ] {
        assert!(stdout.contains(flag), "help is missing {}", flag);
    }
}

#[test]
fn test_cli_version_output() {
    let dir = document_dir(&[]);
    let output = run(&["--version"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&format!("artifact-deriver {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_cli_missing_path() {
    let dir = document_dir(&[]);
    let output = run(&["/nonexistent/directory/path"], dir.path());

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Path does not exist"));
}

#[test]
fn test_cli_human_report() {
    let dir = document_dir(&[("shared.xsd", SHARED_XSD), ("client.wsdl", SHARED_CLIENT_WSDL)]);
    let output = run(&["."], dir.path());

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("client.wsdl"));
    assert!(stdout.contains("1 resolved, 1 dropped"));
    assert!(stdout.contains("Derivation Summary:"));
    assert!(stdout.contains("Success rate: 100.0%"));
}

#[test]
fn test_cli_json_report() {
    let dir = document_dir(&[("shared.xsd", SHARED_XSD), ("client.wsdl", SHARED_CLIENT_WSDL)]);
    let output = run(&[".", "--format", "json", "--no-link"], dir.path());

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_documents"], 2);
    assert_eq!(report["derived_documents"], 2);
    assert_eq!(report["total_unresolved"], 2);
    assert!(report["generated_at"].is_string());
}

#[test]
fn test_cli_failure_exit_code() {
    let dir = document_dir(&[("broken.wsdl", MALFORMED_XML), ("shared.xsd", SHARED_XSD)]);
    let output = run(&[".", "--quiet"], dir.path());

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("broken.wsdl"));
    assert!(!stdout.contains("shared.xsd"));
}

#[test]
fn test_cli_config_file_and_alias() {
    let dir = document_dir(&[
        ("orders.svc", ORDER_WSDL),
        (
            "artifact-deriver.toml",
            concat!(
                "[files]\nextensions = [\"svc\"]\n\n",
                "[files.type_mappings]\nsvc = \"ServiceDescription\"\n",
            ),
        ),
    ]);
    let output = run(
        &[".", "--alias", "ServiceDescription=WsdlDocument", "--format", "summary"],
        dir.path(),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Documents: 1"));
    assert!(stdout.contains("Artifacts derived: 19"));
}
