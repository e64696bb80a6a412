use std::path::Path;
use std::time::Duration;

use crate::cache::{
    api_coupling_key, content_coupling_key, coupling_key, drift_key, importers_key, report_key, siblings_key,
    test_coupling_key, transitive_coupling_key, type_coupling_key, volatility_key, CacheStore,
};
use crate::context::AnalysisContext;
use crate::engines::{coupling, drift, risk, secondary, siblings, static_import, volatility};
use crate::error::{EngineError, EngineResult};
use crate::types::{AnalysisReport, CouplingEdge, DriftItem, Importer, SiblingGuidance, VolatilityResult};

/// Bumped whenever an engine's output shape or algorithm changes in a way
/// that should invalidate previously cached `siblings` results.
const SIBLINGS_CACHE_VERSION: &str = "v1";

const OVERALL_DEADLINE: Duration = Duration::from_secs(2);
const PER_ENGINE_SOFT_DEADLINE: Duration = Duration::from_secs(1);

/// `analyze_file` (§4.13): cache check, context build, the engine fan-out,
/// and the final RiskCalculator fold. A 2-second overall deadline bounds
/// the whole call; engines that are still running when it expires are
/// dropped and the report comes back with `partial: true`.
pub async fn analyze_file(repo_root: &Path, rel_path: &str, cache: &CacheStore) -> EngineResult<AnalysisReport> {
    let abs_path = repo_root.join(rel_path);
    let key = report_key(&abs_path);
    let repo_root = repo_root.to_path_buf();
    let target = rel_path.to_string();

    cache
        .report
        .get_or_compute(key, || async move {
            let ctx = AnalysisContext::shared(cache, &repo_root).await?;
            match tokio::time::timeout(OVERALL_DEADLINE, run_engines(&target, &ctx, cache)).await {
                Ok(report) => report,
                Err(_) => Ok(deadline_exceeded_report(&target)),
            }
        })
        .await
}

async fn run_engines(target: &str, ctx: &AnalysisContext, cache: &CacheStore) -> EngineResult<AnalysisReport> {
    let mut degraded = Vec::new();
    let abs_path = ctx.repo_root.join(target);

    // SiblingGuidance only runs when the target has no history of its own (§4.13).
    let history_is_empty = ctx.commit_window().await?.file_history(target).is_empty();

    let (vol, coupled, importers, type_edges, content_edges, api_edges, test_edges, transitive_edges, sib) = tokio::join!(
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "volatility",
            VolatilityResult::default(),
            cache.volatility.get_or_compute(volatility_key(&abs_path), || volatility::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "coupling",
            Vec::<CouplingEdge>::new(),
            cache.coupling.get_or_compute(coupling_key(&abs_path), || coupling::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "importers",
            Vec::<Importer>::new(),
            cache.importers.get_or_compute(importers_key(&abs_path), || static_import::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "type-coupling",
            Vec::<CouplingEdge>::new(),
            cache
                .type_coupling
                .get_or_compute(type_coupling_key(&abs_path), || secondary::r#type::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "content-coupling",
            Vec::<CouplingEdge>::new(),
            cache
                .content_coupling
                .get_or_compute(content_coupling_key(&abs_path), || secondary::content::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "api-coupling",
            Vec::<CouplingEdge>::new(),
            cache.api_coupling.get_or_compute(api_coupling_key(&abs_path), || secondary::api::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "test-coupling",
            Vec::<CouplingEdge>::new(),
            cache.test_coupling.get_or_compute(test_coupling_key(&abs_path), || secondary::test::analyze(target, ctx)),
        ),
        soft(
            PER_ENGINE_SOFT_DEADLINE,
            "transitive-coupling",
            Vec::<CouplingEdge>::new(),
            cache
                .transitive_coupling
                .get_or_compute(transitive_coupling_key(&abs_path), || secondary::transitive::analyze(target, ctx)),
        ),
        sibling_guidance(history_is_empty, target, ctx, cache, &abs_path),
    );

    let (vol, vol_degraded) = vol;
    let (coupled, coupled_degraded) = coupled;
    let (importers, importers_degraded) = importers;
    let (type_edges, type_degraded) = type_edges;
    let (content_edges, content_degraded) = content_edges;
    let (api_edges, api_degraded) = api_edges;
    let (test_edges, test_degraded) = test_edges;
    let (transitive_edges, transitive_degraded) = transitive_edges;
    degraded.extend(
        [vol_degraded, coupled_degraded, importers_degraded, type_degraded, content_degraded, api_degraded, test_degraded, transitive_degraded]
            .into_iter()
            .flatten(),
    );

    let (drift_items, drift_degraded) = soft(
        PER_ENGINE_SOFT_DEADLINE,
        "drift",
        Vec::<DriftItem>::new(),
        cache.drift.get_or_compute(drift_key(&abs_path), || drift::analyze(target, &coupled, ctx)),
    )
    .await;
    degraded.extend(drift_degraded);

    let mut all_coupled = coupled;
    all_coupled.extend(type_edges);
    all_coupled.extend(content_edges);
    all_coupled.extend(api_edges);
    all_coupled.extend(test_edges);
    all_coupled.extend(transitive_edges);

    let weights = ctx.config.effective_risk_weights();
    let risk = risk::assess(&vol, &all_coupled, &drift_items, &importers, &weights);

    Ok(AnalysisReport {
        file_path: target.to_string(),
        risk,
        volatility: vol,
        coupled: all_coupled,
        drift: drift_items,
        importers,
        siblings: sib,
        partial: None,
        degraded,
    })
}

async fn sibling_guidance(
    history_is_empty: bool,
    target: &str,
    ctx: &AnalysisContext,
    cache: &CacheStore,
    abs_path: &Path,
) -> Option<SiblingGuidance> {
    if !history_is_empty {
        return None;
    }
    let key = siblings_key(abs_path, SIBLINGS_CACHE_VERSION);
    let fut = cache.siblings.get_or_compute(key, || siblings::analyze(target, ctx, cache));
    match tokio::time::timeout(PER_ENGINE_SOFT_DEADLINE, fut).await {
        Ok(Ok(guidance)) => guidance,
        _ => None,
    }
}

/// Runs one engine with its own soft deadline. A timeout or a non-fatal
/// engine error degrades to `default` plus a note rather than failing the
/// whole report; `EngineError::Environment` still propagates since it
/// means the repository itself is unusable.
async fn soft<T, Fut>(deadline: Duration, label: &str, default: T, fut: Fut) -> (T, Option<String>)
where
    Fut: std::future::Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => (value, None),
        Ok(Err(EngineError::Environment { root })) => {
            // Surfacing via degraded rather than propagating keeps the other
            // already-finished engines' results in the report.
            (default, Some(format!("{label}: environment error ({})", root.display())))
        }
        Ok(Err(err)) => (default, Some(format!("{label}: {err}"))),
        Err(_) => (default, Some(format!("{label}: timed out"))),
    }
}

fn deadline_exceeded_report(target: &str) -> AnalysisReport {
    AnalysisReport {
        file_path: target.to_string(),
        risk: crate::types::RiskAssessment {
            score: 0,
            level: crate::types::RiskLevel::Low,
            factors: Vec::new(),
        },
        volatility: VolatilityResult::default(),
        coupled: Vec::new(),
        drift: Vec::new(),
        importers: Vec::new(),
        siblings: None,
        partial: Some(true),
        degraded: vec!["overall deadline exceeded".to_string()],
    }
}
