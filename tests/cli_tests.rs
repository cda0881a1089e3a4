//! Integration tests for the fmvars CLI

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

const NOTE: &str = "---
firstname: Oscar
lastname: Wilde
year: 1975
friends: [Alice, Bob]
parents: [\"[[William]]\", \"[[Jane]]\"]
---
# {{ firstname }} {{ lastname }}

Born {{ year }}. Friends: {{ friends... }}. Code: `{{ year }}`
";

fn fmvars(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fmvars"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute fmvars")
}

/// Helper to create a test file in a fresh directory
fn create_temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_eval_against_markdown() {
    let (_dir, note) = create_temp_file("note.md", NOTE);
    let output = fmvars(&[
        "eval",
        "upper(firstname) + lastname",
        "-f",
        note.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "fmvars eval should succeed");
    assert_eq!(stdout(&output), "OSCARWilde\n");
}

#[test]
fn test_eval_json_output() {
    let (_dir, fields) = create_temp_file("fields.json", r#"{"scores": [10, 20, 15]}"#);
    let output = fmvars(&[
        "eval",
        "highest(scores)",
        "--file",
        fields.to_str().unwrap(),
        "--json",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "[20,15,10]\n");
}

#[test]
fn test_eval_html_with_prefix() {
    let (_dir, note) = create_temp_file("note.md", NOTE);
    let output = fmvars(&["eval", "parents", "-f", note.to_str().unwrap(), "--prefix"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "<b>Parents: </b><br />\
         <a class=\"internal-link\" data-href=\"William\" href=\"William\">William</a><br />\
         <a class=\"internal-link\" data-href=\"Jane\" href=\"Jane\">Jane</a>\n"
    );
}

#[test]
fn test_eval_without_fields_echoes() {
    let output = fmvars(&["eval", "title"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "title\n");
}

#[test]
fn test_render_document() {
    let (_dir, note) = create_temp_file("note.md", NOTE);
    let output = fmvars(&["render", note.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "# Oscar Wilde\n\nBorn 1975. Friends: Alice, Bob. Code: `{{ year }}`\n"
    );
}

#[test]
fn test_render_tree() {
    let (_dir, note) = create_temp_file("note.md", "---\nyear: 1975\n---\n{{ year }}\n");
    let output = fmvars(&["render", "--tree", note.to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json[0]["expression"], "year");
    assert_eq!(json[0]["fragment"]["nodes"][0]["type"], "text");
    assert_eq!(json[0]["fragment"]["nodes"][0]["text"], "1975");
}

#[test]
fn test_render_glob_pattern() {
    let (dir, _) = create_temp_file("a.md", "---\nn: 1\n---\nA{{ n }}\n");
    std::fs::write(dir.path().join("b.md"), "---\nn: 2\n---\nB{{ n }}\n").unwrap();
    let pattern = format!("{}/*.md", dir.path().display());
    let output = fmvars(&["render", &pattern]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("a.md <=="));
    assert!(text.contains("A1\n"));
    assert!(text.contains("B2\n"));
}

#[test]
fn test_render_missing_file_fails() {
    let output = fmvars(&["render", "/nonexistent/note.md"]);
    assert!(!output.status.success());
}

#[test]
fn test_render_uses_config() {
    let (dir, note) = create_temp_file("note.md", NOTE);
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[render]\nspread_separator = \" / \"\n").unwrap();
    let output = fmvars(&[
        "--config",
        config.to_str().unwrap(),
        "render",
        note.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Friends: Alice / Bob."));
}

#[test]
fn test_functions_listing() {
    let output = fmvars(&["functions"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "first\nhighest\njoin\nlast\nlower\nlowest\nsize\nupper\n"
    );
}

#[test]
fn test_parse_prints_ast() {
    let output = fmvars(&["parse", "upper(firstname) + x"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(json.get("Chain").is_some());
}

#[test]
fn test_render_check_links_marks_missing_documents() {
    let (dir, note) = create_temp_file("note.md", NOTE);
    std::fs::write(dir.path().join("William.md"), "# William\n").unwrap();
    std::fs::write(&note, "---\nparents: [\"[[William]]\", \"[[Jane]]\"]\n---\n{{ parents... }}\n")
        .unwrap();

    let output = fmvars(&["render", "--check-links", note.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "<a class=\"internal-link\" data-href=\"William\" href=\"William\">William</a>, \
         <span class=\"broken-link\">Jane</span>\n"
    );

    let unchecked = fmvars(&["render", note.to_str().unwrap()]);
    assert!(!stdout(&unchecked).contains("broken-link"));
}

#[test]
fn test_render_warns_without_frontmatter() {
    let (_dir, note) = create_temp_file("plain.md", "Hello {{ name }}\n");
    let output = fmvars(&["render", note.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Hello name\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("has no frontmatter"));
}
