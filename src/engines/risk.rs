use crate::config::RiskWeights;
use crate::types::{CouplingEdge, DriftItem, Importer, RiskAssessment, RiskLevel, VolatilityResult};

const COUPLING_VISIBILITY_THRESHOLD: u32 = 30;
const PANIC_VISIBILITY_THRESHOLD: u32 = 25;
const IMPORTER_VISIBILITY_THRESHOLD: usize = 5;
const TOP_COUPLED_FOR_MEAN: usize = 3;

/// Weighted combination of every signal into a single 0-100 score with a
/// named `RiskLevel` and a short list of contributing factors (§4.12).
pub fn assess(
    volatility: &VolatilityResult,
    coupled: &[CouplingEdge],
    drift: &[DriftItem],
    importers: &[Importer],
    weights: &RiskWeights,
) -> RiskAssessment {
    let vol_component = volatility.panic_score as f64;

    let coupling_component = if coupled.is_empty() {
        0.0
    } else {
        let mut scores: Vec<u32> = coupled.iter().map(|e| e.score).collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        let top = &scores[..scores.len().min(TOP_COUPLED_FOR_MEAN)];
        let mean = top.iter().copied().sum::<u32>() as f64 / top.len() as f64;
        (mean * 1.5).min(100.0)
    };

    let drift_component = (drift.len() as f64 * 20.0).min(100.0);
    let importer_component = (importers.len() as f64 * 10.0).min(100.0);

    let score = (vol_component * weights.volatility
        + coupling_component * weights.coupling
        + drift_component * weights.drift
        + importer_component * weights.importers)
        .round()
        .clamp(0.0, 100.0) as u32;

    let level = RiskLevel::from_score(score);

    let mut factors = Vec::new();
    if volatility.panic_score >= PANIC_VISIBILITY_THRESHOLD {
        factors.push(format!("High volatility ({}%)", volatility.panic_score));
    }
    if coupling_component >= f64::from(COUPLING_VISIBILITY_THRESHOLD) {
        factors.push(format!("Tightly coupled ({} files)", coupled.len()));
    }
    if !drift.is_empty() {
        factors.push("Stale coupled files".to_string());
    }
    if importers.len() >= IMPORTER_VISIBILITY_THRESHOLD {
        factors.push(format!("Heavily imported ({} dependents)", importers.len()));
    }

    RiskAssessment { score, level, factors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CouplingSource, RecencyDecay};

    fn empty_volatility(panic_score: u32) -> VolatilityResult {
        VolatilityResult {
            panic_score,
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

    fn edge(score: u32) -> CouplingEdge {
        CouplingEdge {
            file: "f.ts".to_string(),
            score,
            reason: String::new(),
            source: CouplingSource::Git,
            evidence: None,
        }
    }

    #[test]
    fn all_zero_signals_yield_zero_score_and_no_factors() {
        let weights = RiskWeights::default();
        let assessment = assess(&empty_volatility(0), &[], &[], &[], &weights);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn high_volatility_and_coupling_raise_score_and_factors() {
        let weights = RiskWeights::default();
        let coupled = vec![edge(90), edge(80), edge(70)];
        let assessment = assess(&empty_volatility(80), &coupled, &[], &[], &weights);
        assert!(assessment.score > 50);
        assert!(assessment.factors.iter().any(|f| f.starts_with("High volatility")));
        assert!(assessment.factors.iter().any(|f| f.starts_with("Tightly coupled")));
    }

    #[test]
    fn coupling_component_caps_at_100() {
        let weights = RiskWeights::default();
        let coupled = vec![edge(100), edge(100), edge(100)];
        let assessment = assess(&empty_volatility(0), &coupled, &[], &[], &weights);
        // mean(100,100,100) * 1.5 = 150, capped to 100 before weighting.
        assert!(assessment.score <= 100);
    }
}
