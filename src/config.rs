use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Raw `.memoria.json` shape. Deliberately all-optional and
/// `deny_unknown_fields`: an unrecognized top-level key rejects the whole
/// file rather than silently ignoring it (per §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    thresholds: Option<RawThresholds>,
    #[serde(default)]
    ignore: Option<Vec<String>>,
    #[serde(default)]
    panic_keywords: Option<HashMap<String, f64>>,
    #[serde(default)]
    risk_weights: Option<RawRiskWeights>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawThresholds {
    coupling_percent: Option<u32>,
    drift_days: Option<u32>,
    analysis_window: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRiskWeights {
    volatility: Option<f64>,
    coupling: Option<f64>,
    drift: Option<f64>,
    importers: Option<f64>,
}

/// Resolved thresholds, merged over whatever the adaptive model (or the
/// fixed defaults below) produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub coupling_percent: u32,
    pub drift_days: u32,
    pub analysis_window: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            coupling_percent: 15,
            drift_days: 7,
            analysis_window: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskWeights {
    pub volatility: f64,
    pub coupling: f64,
    pub drift: f64,
    pub importers: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            volatility: 0.35,
            coupling: 0.30,
            drift: 0.20,
            importers: 0.15,
        }
    }
}

/// Validated `.memoria.json` content. A `Config` is only ever produced by
/// `Config::load` after every field has passed its range check, so callers
/// never need to re-validate.
#[derive(Debug, Clone, Default)]
pub struct Config {
    thresholds: RawThresholds,
    pub ignore: Vec<String>,
    pub panic_keywords: HashMap<String, f64>,
    risk_weights: RawRiskWeights,
}

/// Default panic keyword weights (§6), case-insensitive.
pub fn default_panic_keywords() -> HashMap<String, f64> {
    [
        ("security", 3.0),
        ("vulnerability", 3.0),
        ("crash", 3.0),
        ("data loss", 3.0),
        ("revert", 2.0),
        ("hotfix", 2.0),
        ("breaking", 2.0),
        ("critical", 2.0),
        ("fix", 1.0),
        ("bug", 1.0),
        ("patch", 1.0),
        ("error", 1.0),
        ("refactor", 0.5),
        ("cleanup", 0.5),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Universal ignore set (§6), gitignore syntax.
pub const UNIVERSAL_IGNORE: &[&str] = &[
    "node_modules/",
    "dist/",
    "build/",
    ".next/",
    ".nuxt/",
    ".cache/",
    "coverage/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "__pycache__/",
    "*.pyc",
    "venv/",
    ".venv/",
    "target/",
    "*.class",
    ".gradle/",
    "vendor/",
    "Cargo.lock",
    "Gemfile.lock",
    ".bundle/",
    "bin/",
    "obj/",
    ".git/",
    ".svn/",
    "*.log",
    "logs/",
    ".idea/",
    ".vscode/",
    ".DS_Store",
    "Thumbs.db",
];

impl Config {
    /// Load `<repoRoot>/.memoria.json`, validating keys, types, and ranges.
    ///
    /// Any failure — missing file, malformed JSON, unknown key, out-of-range
    /// value — yields `None`; this never propagates an error into the
    /// pipeline (§7 ConfigError policy).
    pub fn load(repo_root: &Path) -> Option<Self> {
        let path = repo_root.join(".memoria.json");
        let content = std::fs::read_to_string(&path).ok()?;
        let raw: RawConfig = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring malformed .memoria.json");
                return None;
            }
        };
        let validated = Self::validate(raw);
        if validated.is_none() {
            warn!(path = %path.display(), "ignoring .memoria.json with out-of-range values");
        }
        validated
    }

    fn validate(raw: RawConfig) -> Option<Self> {
        if let Some(t) = &raw.thresholds {
            if let Some(v) = t.coupling_percent {
                if v > 100 {
                    return None;
                }
            }
            if let Some(v) = t.drift_days {
                if v > 365 {
                    return None;
                }
            }
            if let Some(v) = t.analysis_window {
                if !(1..=200).contains(&v) {
                    return None;
                }
            }
        }
        if let Some(kw) = &raw.panic_keywords {
            if kw.values().any(|w| !(0.0..=3.0).contains(w)) {
                return None;
            }
        }
        if let Some(w) = &raw.risk_weights {
            for v in [w.volatility, w.coupling, w.drift, w.importers]
                .into_iter()
                .flatten()
            {
                if v < 0.0 {
                    return None;
                }
            }
        }

        Some(Self {
            thresholds: raw.thresholds.unwrap_or_default(),
            ignore: raw.ignore.unwrap_or_default(),
            panic_keywords: raw.panic_keywords.unwrap_or_default(),
            risk_weights: raw.risk_weights.unwrap_or_default(),
        })
    }

    /// Thresholds as explicitly overridden by config; a `None` field means
    /// "let the adaptive model decide" (see `adaptive_thresholds`).
    fn threshold_overrides(&self) -> RawThresholds {
        self.thresholds.clone()
    }

    /// Explicit `thresholds.analysisWindow` override, if any.
    pub fn configured_window(&self) -> Option<u32> {
        self.thresholds.analysis_window
    }

    pub fn effective_risk_weights(&self) -> RiskWeights {
        let defaults = RiskWeights::default();
        RiskWeights {
            volatility: self.risk_weights.volatility.unwrap_or(defaults.volatility),
            coupling: self.risk_weights.coupling.unwrap_or(defaults.coupling),
            drift: self.risk_weights.drift.unwrap_or(defaults.drift),
            importers: self.risk_weights.importers.unwrap_or(defaults.importers),
        }
    }

    /// Base panic keyword set merged with the user map; user keys win on
    /// collision (case-insensitive keys are normalized to lowercase).
    pub fn effective_panic_keywords(&self) -> HashMap<String, f64> {
        let mut merged = default_panic_keywords();
        for (k, v) in &self.panic_keywords {
            merged.insert(k.to_lowercase(), *v);
        }
        merged
    }

    /// Velocity-derived defaults, overridden field-by-field by explicit
    /// config (§4.3).
    pub fn adaptive_thresholds(&self, commits_per_week: f64, total_commits: u32) -> Thresholds {
        let adaptive_coupling = if commits_per_week >= 25.0 {
            10
        } else if commits_per_week <= 2.0 {
            25
        } else {
            15
        };
        let adaptive_drift = if commits_per_week >= 25.0 {
            3
        } else if commits_per_week <= 2.0 {
            14
        } else {
            7
        };
        let adaptive_window = total_commits.clamp(1, 200);

        let overrides = self.threshold_overrides();
        Thresholds {
            coupling_percent: overrides.coupling_percent.unwrap_or(adaptive_coupling),
            drift_days: overrides.drift_days.unwrap_or(adaptive_drift),
            analysis_window: overrides.analysis_window.unwrap_or(adaptive_window),
        }
    }
}

/// `MEMORIA_MAX_WINDOW` env override (§6): caps the analysis window
/// regardless of config or the adaptive model.
pub fn max_window_env_cap() -> Option<u32> {
    std::env::var("MEMORIA_MAX_WINDOW")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| (1..=200).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) {
        std::fs::write(dir.path().join(".memoria.json"), content).unwrap();
    }

    #[test]
    fn missing_config_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path()).is_none());
    }

    #[test]
    fn malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "{ not json");
        assert!(Config::load(dir.path()).is_none());
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "bogus": true }"#);
        assert!(Config::load(dir.path()).is_none());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "thresholds": { "couplingPercent": 150 } }"#);
        assert!(Config::load(dir.path()).is_none());
    }

    #[test]
    fn valid_config_parses() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"{ "thresholds": { "couplingPercent": 20 }, "ignore": ["*.tmp"] }"#,
        );
        let cfg = Config::load(dir.path()).expect("should parse");
        assert_eq!(cfg.threshold_overrides().coupling_percent, Some(20));
        assert_eq!(cfg.ignore, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn risk_weights_default_on_missing_fields() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "riskWeights": { "volatility": 0.5 } }"#);
        let cfg = Config::load(dir.path()).unwrap();
        let weights = cfg.effective_risk_weights();
        assert_eq!(weights.volatility, 0.5);
        assert_eq!(weights.coupling, 0.30);
    }

    #[test]
    fn panic_keywords_merge_user_wins() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "panicKeywords": { "fix": 2.5 } }"#);
        let cfg = Config::load(dir.path()).unwrap();
        let merged = cfg.effective_panic_keywords();
        assert_eq!(merged.get("fix"), Some(&2.5));
        assert_eq!(merged.get("security"), Some(&3.0));
    }

    #[test]
    fn adaptive_thresholds_high_velocity() {
        let cfg = Config::default();
        let t = cfg.adaptive_thresholds(30.0, 100);
        assert_eq!(t.coupling_percent, 10);
        assert_eq!(t.drift_days, 3);
    }

    #[test]
    fn adaptive_thresholds_low_velocity() {
        let cfg = Config::default();
        let t = cfg.adaptive_thresholds(1.0, 5);
        assert_eq!(t.coupling_percent, 25);
        assert_eq!(t.drift_days, 14);
    }

    #[test]
    fn explicit_override_wins_over_adaptive() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, r#"{ "thresholds": { "couplingPercent": 50 } }"#);
        let cfg = Config::load(dir.path()).unwrap();
        let t = cfg.adaptive_thresholds(30.0, 100);
        assert_eq!(t.coupling_percent, 50);
        assert_eq!(t.drift_days, 3);
    }
}
