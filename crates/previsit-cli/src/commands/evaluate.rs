//! Report evaluation

use crate::args::EvaluateArgs;
use anyhow::{Context, Result};
use previsit_core::config::AppConfig;
use previsit_core::evaluation::evaluate_report;
use previsit_core::llm::CachedTextGenerator;
use std::sync::Arc;

/// Evaluate a finished report against the de-facto diagnosed condition.
pub async fn run(config: AppConfig, args: EvaluateArgs) -> Result<()> {
    let report = std::fs::read_to_string(&args.report)
        .with_context(|| format!("failed to read report {}", args.report.display()))?;

    let cache = super::open_cache(&config).await?;
    let http_client = reqwest::Client::new();
    let upstream = super::build_generator(&config, &http_client)?;
    let generator = CachedTextGenerator::new(upstream, cache);

    let evaluation = evaluate_report(
        &generator,
        &report,
        &args.condition,
        &config.generation.params,
    )
    .await?;
    println!("{evaluation}");
    Ok(())
}
