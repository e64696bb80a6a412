use serde::{Deserialize, Serialize};

/// A single commit in a `CommitWindow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub committed_at: chrono::DateTime<chrono::Utc>,
    pub message: String,
    /// Repo-relative paths, already filtered through IgnoreFilter.
    pub changed_files: Vec<String>,
}

/// Newest-first window of commits on the current branch.
#[derive(Debug, Clone, Default)]
pub struct CommitWindow {
    pub commits: Vec<Commit>,
}

impl CommitWindow {
    /// The subsequence of commits touching `path`, in the same (newest-first) order.
    pub fn file_history<'a>(&'a self, path: &str) -> Vec<&'a Commit> {
        self.commits
            .iter()
            .filter(|c| c.changed_files.iter().any(|f| f == path))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Schema,
    Api,
    Types,
    Logic,
    Unknown,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Schema => "schema",
            Self::Api => "api",
            Self::Types => "types",
            Self::Logic => "logic",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub additions: Vec<String>,
    pub removals: Vec<String>,
    pub hunks: u32,
    pub net_change: i32,
    pub has_breaking_change: bool,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingSource {
    Git,
    Type,
    Content,
    Api,
    Test,
    Transitive,
}

impl std::fmt::Display for CouplingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Git => "git",
            Self::Type => "type",
            Self::Content => "content",
            Self::Api => "api",
            Self::Test => "test",
            Self::Transitive => "transitive",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingEdge {
    pub file: String,
    pub score: u32,
    pub reason: String,
    pub source: CouplingSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<DiffSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorShare {
    pub name: String,
    pub email: String,
    pub commits: u32,
    pub percentage: f64,
    pub first_commit: chrono::DateTime<chrono::Utc>,
    pub last_commit: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanicCommit {
    pub sha: String,
    pub message: String,
    pub weight: f64,
    pub committed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecencyDecay {
    pub oldest_commit_days: u32,
    pub newest_commit_days: u32,
    pub decay_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityResult {
    pub panic_score: u32,
    pub commit_count: u32,
    pub author_details: Vec<AuthorShare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_author: Option<AuthorShare>,
    pub recency_decay: RecencyDecay,
    pub panic_commits: Vec<PanicCommit>,
}

impl Default for VolatilityResult {
    fn default() -> Self {
        Self {
            panic_score: 0,
            commit_count: 0,
            author_details: Vec::new(),
            top_author: None,
            recency_decay: RecencyDecay {
                oldest_commit_days: 0,
                newest_commit_days: 0,
                decay_factor: 0.0,
            },
            panic_commits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftItem {
    pub file: String,
    pub days_old: u32,
}

pub type Importer = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score < 25 {
            Self::Low
        } else if score < 50 {
            Self::Medium
        } else if score < 75 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingPattern {
    pub description: String,
    pub confidence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingGuidance {
    pub sampled: Vec<String>,
    pub average_panic_score: u32,
    pub has_matching_tests: bool,
    pub common_import_sources: Vec<String>,
    pub patterns: Vec<SiblingPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub file_path: String,
    pub risk: RiskAssessment,
    pub volatility: VolatilityResult,
    pub coupled: Vec<CouplingEdge>,
    pub drift: Vec<DriftItem>,
    pub importers: Vec<Importer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siblings: Option<SiblingGuidance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub degraded: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    Message,
    Diff,
    Both,
}

impl Default for HistoryMode {
    fn default() -> Self {
        Self::Message
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMatch {
    pub sha: String,
    pub message: String,
    pub match_type: HistoryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySearchOutput {
    pub results: Vec<HistoryMatch>,
    pub total_found: u32,
}
