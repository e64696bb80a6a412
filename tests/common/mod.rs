use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary git repository with sample source files, for exercising
/// the CLI end-to-end via `assert_cmd`.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::process::Command::new("git")
            .args(["init", "--initial-branch=main"])
            .current_dir(dir.path())
            .output()
            .expect("failed to git init");
        std::process::Command::new("git")
            .args(["config", "user.email", "test@memoria.dev"])
            .current_dir(dir.path())
            .output()
            .expect("failed to configure git email");
        std::process::Command::new("git")
            .args(["config", "user.name", "Memoria Test"])
            .current_dir(dir.path())
            .output()
            .expect("failed to configure git user");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, relative_path: &str, content: &str) {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write file");
    }

    pub fn git_commit(&self, message: &str) {
        std::process::Command::new("git")
            .args(["add", "-A"])
            .current_dir(self.dir.path())
            .output()
            .expect("failed to git add");
        std::process::Command::new("git")
            .args(["commit", "-m", message, "--allow-empty"])
            .current_dir(self.dir.path())
            .output()
            .expect("failed to git commit");
    }

    pub fn memoria_bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_memoria"))
    }
}
