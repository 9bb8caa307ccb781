//! End-to-end tests of the `docqa` binary with providers disabled.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use docqa_core::answer::EMBEDDING_FAILED_ANSWER;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.txt"),
        "Alpha notes about Rust programming.\n\nCargo builds crates and runs tests.",
    )
    .unwrap();
    fs::write(files_dir.join("image.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/docqa.sqlite"

[chunking]
max_chars = 40

[server]
bind = "127.0.0.1:7342"
"#,
        root.display()
    );

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("docqa.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_docqa"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run docqa binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

/// Pull the document id out of `Uploaded <name> (<id>)`.
fn uploaded_id(stdout: &str) -> String {
    let line = stdout
        .lines()
        .find(|l| l.starts_with("Uploaded "))
        .expect("no upload line");
    let start = line.rfind('(').unwrap() + 1;
    line[start..line.len() - 1].to_string()
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config) = setup_test_env();
    for _ in 0..2 {
        let (stdout, stderr, ok) = run_docqa(&config, &["init"]);
        assert!(ok, "init failed: {}", stderr);
        assert!(stdout.contains("Database initialized successfully."));
    }
}

#[test]
fn test_upload_list_passages_ask_delete() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files/alpha.txt");

    let (stdout, stderr, ok) = run_docqa(&config, &["upload", file.to_str().unwrap()]);
    assert!(ok, "upload failed: {}", stderr);
    // Disabled embedder: passages are stored but none are embedded.
    assert!(stdout.contains("passages: 2  embedded: 0  failed: 2"), "{}", stdout);
    let id = uploaded_id(&stdout);

    let (stdout, _, ok) = run_docqa(&config, &["list"]);
    assert!(ok);
    assert!(stdout.contains("alpha.txt"));
    assert!(stdout.contains(&id));

    let (stdout, _, ok) = run_docqa(&config, &["passages", &id]);
    assert!(ok);
    assert!(stdout.contains("[passage 0] (not embedded)"));
    assert!(stdout.contains("Alpha notes about Rust programming."));

    let (stdout, _, ok) = run_docqa(&config, &["ask", &id, "What builds crates?"]);
    assert!(ok);
    assert_eq!(stdout.trim(), EMBEDDING_FAILED_ANSWER);

    let (stdout, _, ok) = run_docqa(&config, &["delete", &id]);
    assert!(ok);
    assert!(stdout.contains("Deleted"));

    let (_, _, ok) = run_docqa(&config, &["delete", &id]);
    assert!(!ok);

    let (stdout, _, _) = run_docqa(&config, &["list"]);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_upload_with_custom_name_and_reset() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files/alpha.txt");

    let (stdout, _, ok) = run_docqa(
        &config,
        &["upload", file.to_str().unwrap(), "--name", "Team notes"],
    );
    assert!(ok);
    assert!(stdout.starts_with("Uploaded Team notes"));

    let (_, stderr, ok) = run_docqa(&config, &["reset"]);
    assert!(!ok);
    assert!(stderr.contains("--yes"));

    let (stdout, _, ok) = run_docqa(&config, &["reset", "--yes"]);
    assert!(ok);
    assert!(stdout.contains("All documents deleted."));

    let (stdout, _, _) = run_docqa(&config, &["list"]);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_rejects_unsupported_file() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("files/image.png");

    let (_, stderr, ok) = run_docqa(&config, &["upload", file.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("Unsupported file type"));
}

#[test]
fn test_ask_unknown_document_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, ok) = run_docqa(&config, &["ask", "missing-id", "anything?"]);
    assert!(!ok);
    assert!(stderr.contains("document not found"));
}

#[test]
fn test_invalid_config_is_reported() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[db]\npath = \"x.sqlite\"\n[chunking]\nmax_chars = 0\n").unwrap();

    let (_, stderr, ok) = run_docqa(&bad, &["list"]);
    assert!(!ok);
    assert!(stderr.contains("chunking.max_chars must be > 0"));
}
