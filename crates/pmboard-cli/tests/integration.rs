#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn pmboard(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pmboard").unwrap();
    cmd.current_dir(dir.path())
        .env("PMBOARD_ROOT", dir.path())
        .env("BUGMGMT_REPO_OWNER", "Repo Owner")
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

const PLAN: &str = "\
# Project Plan

## Projects
- **bugmgmt (active)**
  - Summary: `AI_first/projects/bugmgmt/project_summary_bugmgmt.md`
  - Phases overview:
    - Phase 01 — Intake (complete): see `AI_first/projects/bugmgmt/phases/phase01/`.
    - Phase 02 — Exports: see `AI_first/projects/bugmgmt/phases/phase02/`.

## Project-wide references and actions
- none
";

const PM_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<div data-count="projects">0</div>
<div data-count="active-phases">0</div>
<div data-count="open-bugs">0</div>
<span id="pm-last-updated">TBD</span>
<table><tbody>
<!-- PROJECT_ROWS_START -->
<!-- PROJECT_ROWS_END -->
</tbody></table>
<footer>hand-written</footer>
</body></html>
"#;

const DETAIL_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<div class="summary-card"><div class="muted small">Phases</div><div class="h6">0</div></div>
<div class="summary-card"><div class="muted small">Open Bugs</div><div class="h6">0</div></div>
<div class="summary-card"><div class="muted small">Active Phase</div><div class="h6">TBD</div></div>
<ul class="muted small">
  <li><strong>Current Goal:</strong> old</li>
  <li><strong>Owner:</strong> old</li>
</ul>
<tbody>
<!-- PHASE_ROWS_START -->
<!-- PHASE_ROWS_END -->
</tbody>
<!-- PHASE_TEMPLATES_START -->
<!-- PHASE_TEMPLATES_END -->
</body></html>
"#;

const ISSUES: &str = r#"{"id":"BMG-2024-01-002","project":"bugmgmt","status":"closed","severity":"critical","owner":"tbd"}
{"id":"BMG-2024-01-001","project":"bugmgmt","status":"open","severity":"major","owner":"Ann"}
this line is not json
"#;

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "AI_first/docs/projectplan.md", PLAN);
    write(
        root,
        "AI_first/projects/bugmgmt/project_summary_bugmgmt.md",
        "# Project Summary (bugmgmt)\n\n- **Purpose:** Track issues locally.\n\
         - **Current Goal:** Phase 02 — wire up exports; polish UI.\n- **Owner:** Ann\n",
    );
    write(
        root,
        "AI_first/projects/bugmgmt/phases/phase01/phase_definition.md",
        "# Phase 01\n\n- **Status:** Complete\n- **Completed:** 2024-02-10\n",
    );
    write(
        root,
        "AI_first/projects/bugmgmt/phases/phase02/action_plan_phase02.md",
        "# Plan\n\n- see `AI_first/projects/bugmgmt/phases/phase02/actions/bugmgmt_exports_action.md`\n",
    );
    write(
        root,
        "AI_first/projects/bugmgmt/phases/phase02/actions/bugmgmt_exports_action.md",
        "# Stage\n\n- **Objective:** Ship **JSON** export.\n",
    );
    write(root, "AI_first/ui/PM.html", PM_PAGE);
    write(root, "AI_first/ui/project_bugmgmt.html", DETAIL_PAGE);
    write(root, "AI_first/bugmgmt/issues/issues.jsonl", ISSUES);
    dir
}

// ---------------------------------------------------------------------------
// pmboard render
// ---------------------------------------------------------------------------

#[test]
fn render_patches_pm_and_detail_pages() {
    let dir = fixture();
    pmboard(&dir)
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated:"))
        .stdout(predicate::str::contains("AI_first/ui/PM.html"));

    let pm = read(&dir, "AI_first/ui/PM.html");
    assert!(pm.contains(r#"data-count="projects">1</div>"#));
    assert!(pm.contains(r#"data-count="active-phases">1</div>"#));
    assert!(pm.contains(r#"data-count="open-bugs">1</div>"#));
    assert!(pm.contains("<td>Phase 02 — Exports</td>"));
    assert!(pm.contains("<div>Wire up exports.</div>"));
    assert!(pm.contains("<div>Polish UI.</div>"));
    assert!(pm.contains("<td>2024-02-10</td>"));
    assert!(pm.contains("<footer>hand-written</footer>"));

    let detail = read(&dir, "AI_first/ui/project_bugmgmt.html");
    assert!(detail.contains(r#"<div class="muted small">Phases</div><div class="h6">2</div>"#));
    assert!(detail.contains(r#"<div class="muted small">Open Bugs</div><div class="h6">1</div>"#));
    assert!(detail.contains(r#"<div class="h6">Phase 02</div>"#));
    assert!(detail.contains("<li><strong>Owner:</strong> Ann</li>"));
    assert!(detail.contains("<strong>Objective:</strong> Ship <strong>JSON</strong> export."));
    assert!(detail.contains(r#"<span class="badge status-in_progress">Active</span>"#));
}

#[test]
fn render_twice_is_stable() {
    let dir = fixture();
    pmboard(&dir).arg("render").assert().success();
    let first = read(&dir, "AI_first/ui/PM.html");
    pmboard(&dir)
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains("No updates needed."));
    assert_eq!(read(&dir, "AI_first/ui/PM.html"), first);
}

#[test]
fn render_missing_marker_fails_without_writing() {
    let dir = fixture();
    let broken = PM_PAGE.replace("<!-- PROJECT_ROWS_END -->\n", "");
    write(dir.path(), "AI_first/ui/PM.html", &broken);

    pmboard(&dir)
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing marker block"))
        .stderr(predicate::str::contains("PROJECT_ROWS_END"));
    assert_eq!(read(&dir, "AI_first/ui/PM.html"), broken);
    assert_eq!(read(&dir, "AI_first/ui/project_bugmgmt.html"), DETAIL_PAGE);
}

#[test]
fn render_dry_run_leaves_files() {
    let dir = fixture();
    pmboard(&dir)
        .args(["render", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run] update AI_first/ui/PM.html"));
    assert_eq!(read(&dir, "AI_first/ui/PM.html"), PM_PAGE);
}

#[test]
fn render_skips_missing_detail_page() {
    let dir = fixture();
    std::fs::remove_file(dir.path().join("AI_first/ui/project_bugmgmt.html")).unwrap();
    pmboard(&dir)
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[skip] missing AI_first/ui/project_bugmgmt.html",
        ));
}

#[test]
fn render_json_report() {
    let dir = fixture();
    let out = pmboard(&dir)
        .args(["render", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["projects"], 1);
    assert_eq!(report["updated"].as_array().unwrap().len(), 2);
    assert_eq!(report["dry_run"], false);
}

#[test]
fn render_missing_summary_path_is_fatal() {
    let dir = fixture();
    write(
        dir.path(),
        "AI_first/docs/projectplan.md",
        "## Projects\n- **orphan (active)**\n",
    );
    pmboard(&dir)
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing summary path for project orphan"));
}

// ---------------------------------------------------------------------------
// pmboard issues list
// ---------------------------------------------------------------------------

#[test]
fn issues_list_writes_sorted_json() {
    let dir = fixture();
    pmboard(&dir)
        .args(["issues", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 issues"));

    let json = read(&dir, "AI_first/bugmgmt/exports/json/bugmgmt_issues.json");
    let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(rows[0]["id"], "BMG-2024-01-001");
    assert_eq!(rows[1]["id"], "BMG-2024-01-002");
    assert_eq!(rows[1]["owner"], "Repo Owner");
}

#[test]
fn issues_list_html_to_custom_output() {
    let dir = fixture();
    pmboard(&dir)
        .args(["issues", "list", "--format", "html", "--output", "out/issues.html"])
        .assert()
        .success();
    let html = read(&dir, "out/issues.html");
    assert!(html.contains(r#"jsonPath: "../AI_first/bugmgmt/exports/json/bugmgmt_issues.json""#));
    assert!(html.contains("window.BUGMGMT_FALLBACK = [{"));
}

#[test]
fn issues_list_reports_every_bad_id() {
    let dir = fixture();
    write(
        dir.path(),
        "AI_first/bugmgmt/issues/issues.jsonl",
        "{\"id\":\"PMG-2024-01-001\",\"project\":\"bugmgmt\"}\n{\"id\":\"bad\",\"project\":\"bugmgmt\"}\n",
    );
    pmboard(&dir)
        .args(["issues", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("issue ID validation failed"))
        .stderr(predicate::str::contains("#1"))
        .stderr(predicate::str::contains("#2"));
    assert!(!dir
        .path()
        .join("AI_first/bugmgmt/exports/json/bugmgmt_issues.json")
        .exists());
}

#[test]
fn issues_prefixes_come_from_config() {
    let dir = fixture();
    write(
        dir.path(),
        "AI_first/bugmgmt/issues/issues.jsonl",
        "{\"id\":\"OPS-2024-01-001\",\"project\":\"ops\"}\n",
    );
    write(dir.path(), ".pmboard/config.yaml", "issues:\n  prefixes:\n    ops: OPS\n");
    pmboard(&dir).args(["issues", "list"]).assert().success();
}

// ---------------------------------------------------------------------------
// pmboard docs
// ---------------------------------------------------------------------------

#[test]
fn docs_renders_support_and_project_trees() {
    let dir = fixture();
    pmboard(&dir)
        .arg("docs")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 5 pages:"));

    let plan = read(&dir, "AI_first/ui/docs/projectplan.html");
    assert!(plan.contains("<title>Project Plan</title>"));
    assert!(plan.contains("<h2>Projects</h2>"));
    assert!(plan.contains(r#"href="../PM.html""#));
    assert!(dir
        .path()
        .join("AI_first/ui/docs/projects/bugmgmt/phases/phase01/phase_definition.html")
        .exists());
}

// ---------------------------------------------------------------------------
// pmboard project init
// ---------------------------------------------------------------------------

#[test]
fn project_init_then_render() {
    let dir = fixture();
    pmboard(&dir)
        .args([
            "project",
            "init",
            "--project",
            "data_import",
            "--owner",
            "Grace",
            "--prefix",
            "DIM",
            "--purpose",
            "Import data.",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project initialized:"));

    assert!(dir
        .path()
        .join("AI_first/projects/data_import/project_summary_data_import.md")
        .exists());
    assert!(read(&dir, "AI_first/docs/projectplan.md").contains("- **data_import (planning)**"));
    assert!(read(&dir, ".pmboard/config.yaml").contains("data_import: DIM"));
    assert!(dir.path().join("AI_first/ui/project_data_import.html").exists());

    pmboard(&dir).arg("render").assert().success();
    let pm = read(&dir, "AI_first/ui/PM.html");
    assert!(pm.contains(r#"data-count="projects">2</div>"#));
    assert!(pm.contains(r#"href="project_data_import.html""#));
}

#[test]
fn project_init_rejects_duplicates_and_bad_slugs() {
    let dir = fixture();
    pmboard(&dir)
        .args(["project", "init", "--project", "bugmgmt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    pmboard(&dir)
        .args(["project", "init", "--project", "Bad-Name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lowercase snake_case"));
}

#[test]
fn project_init_dry_run() {
    let dir = fixture();
    pmboard(&dir)
        .args(["project", "init", "--project", "ghost", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run] write"));
    assert!(!dir.path().join("AI_first/projects/ghost").exists());
    assert_eq!(read(&dir, "AI_first/docs/projectplan.md"), PLAN);
}

// ---------------------------------------------------------------------------
// pmboard config / watch
// ---------------------------------------------------------------------------

#[test]
fn config_validate_flags_bad_prefix() {
    let dir = fixture();
    write(
        dir.path(),
        ".pmboard/config.yaml",
        "issues:\n  prefixes:\n    ops: ops\n    web: BMG\n    bugmgmt: BMG\n",
    );
    pmboard(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] prefix 'ops'"))
        .stdout(predicate::str::contains("[warning] prefix 'BMG' is shared"));
}

#[test]
fn config_show_defaults_as_json() {
    let dir = fixture();
    let out = pmboard(&dir)
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let cfg: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(cfg["layout"]["pm_page"], "AI_first/ui/PM.html");
    assert_eq!(cfg["issues"]["prefixes"]["bugmgmt"], "BMG");
}

#[test]
fn watch_rejects_non_positive_interval() {
    let dir = fixture();
    pmboard(&dir)
        .args(["watch", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--interval must be a positive"));
}
