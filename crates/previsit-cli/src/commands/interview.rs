//! Interactive interview run

use crate::args::InterviewArgs;
use anyhow::{Context, Result};
use previsit_core::config::AppConfig;
use previsit_core::interview::{InterviewSession, PatientRoster, SymptomCatalog};
use previsit_core::llm::CachedTextGenerator;
use previsit_core::report::{ReportWriter, format_delta};
use previsit_core::speech::SpeechOutcome;
use std::sync::Arc;
use tracing::info;

/// Drive a full simulated interview, printing each turn and the evolving
/// report, then the final transcript.
pub async fn run(config: AppConfig, args: InterviewArgs) -> Result<()> {
    let roster = PatientRoster::load(&args.patients_file)?;
    let patient = roster.require(&args.patient)?.clone();
    let catalog = SymptomCatalog::load(&args.symptoms_file)?;
    let symptoms = catalog.script_for(&args.condition)?;

    let cache = super::open_cache(&config).await?;
    let http_client = reqwest::Client::new();
    let upstream = super::build_generator(&config, &http_client)?;
    let generator = Arc::new(CachedTextGenerator::new(upstream, cache.clone()));
    let speech = super::build_speech(&config, &http_client, cache.clone())?;

    let mut settings = config.interview.clone();
    if let Some(turns) = args.turns {
        settings.turn_limit = turns;
    }

    info!(patient = %patient.name, condition = %args.condition, "starting interview simulation");
    let ehr_summary = patient.ehr_summary.clone().unwrap_or_default();
    let writer = ReportWriter::new(generator.clone(), settings.params.clone());
    let mut session = InterviewSession::new(
        patient,
        args.condition,
        symptoms,
        generator,
        speech,
        settings,
    );

    let mut turn = session.start().await.context("failed to start interview")?;
    print_line("Interviewer", &turn.message, &turn.audio);

    let mut previous_q_a = String::new();
    let mut draft: Option<String> = None;

    while !turn.complete {
        let question = turn.message.clone();
        turn = session
            .process_response(&question)
            .await
            .context("interview turn failed")?;

        let answer = turn
            .history
            .get(turn.history.len().wrapping_sub(2))
            .map(|m| m.content.clone())
            .unwrap_or_default();
        print_line("Patient", &answer, &SpeechOutcome::Disabled);
        print_line("Interviewer", &turn.message, &turn.audio);

        let delta = format_delta(&previous_q_a, &question, &answer);
        let updated = writer.update(&ehr_summary, &delta, draft.as_deref()).await?;
        previous_q_a.push_str(&format!("Q: {question}\nA: {answer}\n"));
        draft = Some(updated);
    }

    println!("\n===== Final report =====\n");
    println!("{}", draft.unwrap_or_default());
    println!("\n===== Transcript =====\n");
    println!("{}", session.transcript());

    let stats = session_stats(&cache).await;
    println!("\n{stats}");
    Ok(())
}

fn print_line(speaker: &str, text: &str, audio: &SpeechOutcome) {
    match audio {
        SpeechOutcome::Ok { audio, mime } => {
            println!("{speaker}: {text}  [audio: {} bytes, {mime}]", audio.len());
        }
        SpeechOutcome::Disabled => println!("{speaker}: {text}"),
        SpeechOutcome::Failed(reason) => {
            println!("{speaker}: {text}  [audio unavailable: {reason}]");
        }
    }
}

async fn session_stats(cache: &previsit_core::PersistentCache) -> String {
    let stats = cache.stats().await;
    format!(
        "cache: {} entries, {} hits / {} misses ({}% hit rate), {} MB",
        stats.total_entries, stats.hits, stats.misses, stats.hit_rate, stats.cache_size_mb
    )
}
