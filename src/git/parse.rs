use chrono::{DateTime, Utc};

use crate::types::{ChangeType, Commit};

const RECORD_SEP: char = '\u{1e}';
const FIELD_SEP: char = '\u{1f}';

/// Format string for `git log`: one record-separated entry per commit,
/// field-separated `sha|epoch|authorName|authorEmail|subject`, followed by
/// `--name-only`'s one-path-per-line output up to the next record.
pub const LOG_FORMAT: &str = "%x1eCOMMIT%x1f%H%x1f%ct%x1f%an%x1f%ae%x1f%s";

/// Parse the combined `--format=LOG_FORMAT --name-only` output into commits.
/// `changed_files` are NOT yet filtered through IgnoreFilter; callers do
/// that once per commit at window-build time.
pub fn parse_log_window(raw: &str) -> Vec<Commit> {
    let mut commits = Vec::new();
    for record in raw.split(RECORD_SEP) {
        let record = record.trim();
        if record.is_empty() {
            continue;
        }
        let mut lines = record.lines();
        let header = match lines.next() {
            Some(h) => h,
            None => continue,
        };
        let header = header.strip_prefix("COMMIT").unwrap_or(header);
        let mut fields = header.split(FIELD_SEP);
        let sha = fields.next().unwrap_or_default().to_string();
        if sha.is_empty() {
            continue;
        }
        let epoch: i64 = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let author_name = fields.next().unwrap_or_default().to_string();
        let author_email = fields.next().unwrap_or_default().to_string();
        let message = fields.collect::<Vec<_>>().join(FIELD_SEP.to_string().as_str());
        let committed_at = DateTime::<Utc>::from_timestamp(epoch, 0).unwrap_or_else(Utc::now);

        let changed_files: Vec<String> = lines
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .collect();

        commits.push(Commit {
            sha,
            author_name,
            author_email,
            committed_at,
            message,
            changed_files,
        });
    }
    commits
}

/// Parsed unified diff body: additions/removals are raw line content
/// without the leading `+`/`-`.
#[derive(Debug, Default)]
pub struct ParsedDiff {
    pub additions: Vec<String>,
    pub removals: Vec<String>,
    pub hunks: u32,
}

pub fn parse_unified_diff(raw: &str) -> ParsedDiff {
    let mut diff = ParsedDiff::default();
    for line in raw.lines() {
        if line.starts_with("@@") {
            diff.hunks += 1;
        } else if let Some(rest) = line.strip_prefix('+') {
            if !rest.starts_with('+') && !line.starts_with("+++") {
                diff.additions.push(rest.to_string());
            }
        } else if let Some(rest) = line.strip_prefix('-') {
            if !rest.starts_with('-') && !line.starts_with("---") {
                diff.removals.push(rest.to_string());
            }
        }
    }
    diff
}

const BREAKING_MARKERS: &[&str] = &["BREAKING"];

/// §4.1: a removed line containing an explicit `BREAKING` marker, or the
/// removal of an exported symbol / changed function signature / required
/// field, flags `hasBreakingChange`. The exported-symbol/signature/field
/// heuristics below are this implementation's canonical minimum per the
/// spec's open question on breaking-change detection.
pub fn has_breaking_change(removals: &[String]) -> bool {
    let export_re = regex::Regex::new(r"^\s*export\s+(default\s+)?(function|class|const|interface|type)\s+\w+").unwrap();
    let signature_re = regex::Regex::new(r"^\s*(export\s+)?(async\s+)?function\s+\w+\s*\(").unwrap();
    let required_field_re = regex::Regex::new(r"^\s*\w+\s*:\s*\w+[^?]\s*;?\s*$").unwrap();

    removals.iter().any(|line| {
        BREAKING_MARKERS.iter().any(|m| line.contains(m))
            || export_re.is_match(line)
            || signature_re.is_match(line)
            || (required_field_re.is_match(line) && !line.contains('?'))
    })
}

/// §4.1 changeType inference from filename + content patterns.
pub fn infer_change_type(file: &str, additions: &[String], removals: &[String]) -> ChangeType {
    let lower_file = file.to_lowercase();
    let all_lines = additions.iter().chain(removals.iter());

    if lower_file.ends_with(".d.ts")
        || all_lines
            .clone()
            .any(|l| l.contains("interface ") || l.contains("type "))
    {
        return ChangeType::Types;
    }
    if lower_file.contains("schema")
        || lower_file.contains("migration")
        || all_lines
            .clone()
            .any(|l| l.to_uppercase().contains("CREATE TABLE") || l.to_uppercase().contains("ALTER TABLE"))
    {
        return ChangeType::Schema;
    }
    if all_lines.clone().any(|l| {
        l.contains("app.get")
            || l.contains("app.post")
            || l.contains("@Get")
            || l.contains("@Post")
            || l.contains("export async function GET")
            || l.contains("export async function POST")
    }) {
        return ChangeType::Api;
    }
    if additions.is_empty() && removals.is_empty() {
        return ChangeType::Unknown;
    }
    ChangeType::Logic
}

/// One path per line, as produced by `git grep -l` or `git diff --name-only`.
pub fn parse_path_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
