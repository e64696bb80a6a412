mod common;

use assert_cmd::Command;
use common::TestProject;

#[test]
fn analyze_on_never_committed_file_reports_zero_risk() {
    let project = TestProject::new();
    // Two committed siblings give src/util/ a real sibling pool, so the
    // never-committed target below should still surface siblings guidance.
    project.write_file("src/util/a.ts", "export const a = 1;\n");
    project.write_file("src/util/b.ts", "export const b = 1;\n");
    project.git_commit("initial commit with sibling files");

    // Written after the last commit and never added: genuinely untracked.
    project.write_file("src/util/new.ts", "export const id = 1;\n");

    let output = Command::new(TestProject::memoria_bin())
        .args(["analyze", "--repo"])
        .arg(project.path())
        .arg("src/util/new.ts")
        .output()
        .expect("failed to run memoria analyze");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["risk"]["score"].as_u64().unwrap(), 0);
    assert!(report["coupled"].as_array().unwrap().is_empty());
    assert!(report["drift"].as_array().unwrap().is_empty());
    assert!(!report["siblings"].is_null(), "expected siblings guidance with 2 same-extension siblings present");
}

#[test]
fn analyze_on_frequently_fixed_file_shows_elevated_volatility() {
    let project = TestProject::new();
    project.write_file("src/hot.ts", "export const a = 1;\n");
    project.git_commit("initial");
    for i in 0..4 {
        project.write_file("src/hot.ts", &format!("export const a = {i};\n"));
        project.git_commit(&format!("fix: patch regression #{i}"));
    }

    let output = Command::new(TestProject::memoria_bin())
        .args(["analyze", "--repo"])
        .arg(project.path())
        .arg("src/hot.ts")
        .output()
        .expect("failed to run memoria analyze");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["volatility"]["panicScore"].as_u64().unwrap() > 0);
}
