//! Integration tests for the `vfs` CLI binary.

use std::process::Output;

fn vfs(args: &[&str]) -> Output {
    std::process::Command::new("cargo")
        .args(["run", "--package", "vfs-cli", "--bin", "vfs", "--quiet", "--"])
        .args(args)
        .output()
        .expect("failed to execute vfs")
}

#[test]
fn parse_prints_classified_fields_for_an_accession() {
    let output = vfs(&["parse", "SRR001656"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("path_type:   Accession"));
    assert!(stdout.contains("scheme_type: None"));
}

#[test]
fn parse_reports_oid_for_ncbi_obj_uri() {
    let output = vfs(&["parse", "ncbi-obj:42"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("obj_id:      42"));
}

#[test]
fn parse_fails_on_empty_input() {
    let output = vfs(&["parse", ""]);
    assert!(!output.status.success());
}

#[test]
fn cat_reads_a_local_file_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("hello.txt");
    std::fs::write(&file_path, b"hello from the vfs core").unwrap();

    let output = vfs(&["cat", file_path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, b"hello from the vfs core");
}

#[test]
fn ls_without_archive_readers_is_a_clear_error() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("run.sra");
    std::fs::write(&file_path, b"not actually an archive").unwrap();

    let output = vfs(&["ls", file_path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("archive reader"));
}
