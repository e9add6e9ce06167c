use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(parts: &[&str]) -> PathBuf {
    let path = parts.iter().fold(repo_root().join("fixtures"), |p, part| p.join(part));
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("mermend-cli"));
    cmd.current_dir(repo_root()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn normalize_prefixes_single_letter_ids() {
    let out = cli()
        .args(["normalize", fixture(&["flowchart", "login.mmd"]).to_string_lossy().as_ref()])
        .output()
        .expect("run cli");
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "flowchart TD\nNODE_A[Login Page] --> NODE_B[Auth Service]\nNODE_B --> NODE_C[Database]\n"
    );
}

#[test]
fn normalize_json_lists_candidates() {
    let out = cli()
        .args(["normalize", "--json"])
        .write_stdin("flowchart TD\nA --> B\n")
        .output()
        .expect("run cli");
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(value["outcome"], "normalized");
    assert!(value["candidates"].as_array().is_some_and(|c| !c.is_empty()));
}

#[test]
fn render_prints_svg_for_a_clean_diagram() {
    let out = cli()
        .args(["render", fixture(&["flowchart", "login.mmd"]).to_string_lossy().as_ref()])
        .output()
        .expect("run cli");
    assert!(out.status.success());
    let svg = String::from_utf8_lossy(&out.stdout);
    assert!(svg.starts_with(r#"<svg id="login-"#), "{svg}");
    assert!(svg.contains("Auth Service"));
}

#[test]
fn render_survives_llm_output() {
    let out = cli()
        .args([
            "render",
            "--format",
            "json",
            fixture(&["flowchart", "llm_reserved.mmd"]).to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run cli");
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(value["diagram_id"], "llm_reserved");
    assert!(value["mode"].is_string());
    assert!(value["attempts"].as_array().is_some_and(|a| !a.is_empty()));
}

#[test]
fn render_writes_png() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("login.png");
    cli()
        .args([
            "render",
            "--format",
            "png",
            "--scale",
            "2",
            "--background",
            "white",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture(&["flowchart", "login.mmd"]).to_string_lossy().as_ref(),
        ])
        .assert()
        .success();
    let bytes = fs::read(&out).expect("read png");
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"), "output is not a PNG");
}

#[test]
fn extract_prints_mermaid_fences_only() {
    let out = cli()
        .args([
            "extract",
            "--json",
            fixture(&["markdown", "analysis.md"]).to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run cli");
    assert!(out.status.success());
    let blocks: Vec<String> = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].starts_with("flowchart TD"));
    assert!(blocks[1].starts_with("graph LR"));
}

#[test]
fn empty_input_exits_with_no_diagram() {
    cli()
        .args(["render", "-"])
        .write_stdin("  \n")
        .assert()
        .code(3);
    cli().arg("extract").write_stdin("no fences here").assert().code(3);
}

#[test]
fn unknown_flag_is_a_usage_error() {
    cli().args(["render", "--bogus"]).assert().code(2);
    cli().args(["render", "--format", "gif"]).assert().code(2);
}
