pub mod api;
pub mod content;
pub mod test;
pub mod transitive;
pub mod r#type;

use walkdir::WalkDir;

use crate::context::AnalysisContext;

const MAX_EDGES: usize = 5;
const MAX_SCANNED_FILES: usize = 5_000;

/// Repo-relative paths of every tracked, non-ignored file, used as the
/// search space for couplers operating over current file contents rather
/// than history (§4.10). Bounded so a huge repository cannot make a single
/// `analyze_file` call scan unboundedly.
fn candidate_files(ctx: &AnalysisContext, exclude: &str) -> Vec<String> {
    WalkDir::new(&ctx.repo_root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(&ctx.repo_root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .filter(|rel| rel != exclude && !ctx.ignore.matches(rel))
        .take(MAX_SCANNED_FILES)
        .collect()
}

fn read_text(ctx: &AnalysisContext, rel_path: &str) -> Option<String> {
    std::fs::read_to_string(ctx.repo_root.join(rel_path)).ok()
}
