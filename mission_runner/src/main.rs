use anyhow::Context;
use fish_core::mission::outcome::{JsonLinesSink, MemorySink, OutcomeSink};
use fish_core::{Detection, EventBus, FishConfig, FishPipeline};
use std::env;
use std::fs::File;
use std::io::BufWriter;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const EVENT_BUS_CAPACITY: usize = 4096;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: mission_runner <config.yaml> <detections.jsonl> [outcomes.jsonl]");
        return Ok(());
    }
    let config_path = &args[1];
    let detections_path = &args[2];

    let config = FishConfig::load(config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    let frames = load_frames(detections_path)?;
    tracing::info!(frames = frames.len(), config = %config_path, "replay loaded");

    // --- 2. Telemetry printer ---
    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let mut rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(%err, "failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // --- 3. Pipeline ---
    let sink: Box<dyn OutcomeSink> = match args.get(3) {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {path}"))?;
            Box::new(JsonLinesSink::new(BufWriter::new(file)))
        }
        None => Box::new(MemorySink::default()),
    };
    let mut pipeline = FishPipeline::from_config(&config, sink, bus);

    // --- 4. Main Processing Loop ---
    // Once the recording runs out the vehicle keeps sweeping empty water
    // until the mission ends.
    let empty: Vec<Detection> = Vec::new();
    let mut replayed = 0usize;
    while pipeline.mission_is_active() {
        let detections = frames.get(replayed).unwrap_or(&empty);
        let report = pipeline.process_frame(detections)?;
        replayed += 1;
        if report.feedback.as_ref().is_some_and(|f| f.status.is_terminal()) {
            tracing::info!(
                frame = report.frame_index,
                phase = %report.phase,
                feedback = ?report.feedback,
                "target handled"
            );
        }
        tokio::task::yield_now().await;
    }

    let mission = pipeline.mission();
    tracing::info!(
        frames = replayed,
        phase = %mission.phase(),
        collected_outcomes = pipeline.outcomes().logged(),
        lost_targets = mission.lost_targets(),
        "mission finished"
    );

    // Dropping the pipeline closes the bus and lets the printer drain.
    drop(pipeline);
    printer.await?;
    Ok(())
}

/// One JSON array of detections per line. Blank lines are empty frames.
fn load_frames(path: &str) -> anyhow::Result<Vec<Vec<Detection>>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            if line.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_json::from_str(line).with_context(|| format!("{path}:{}", index + 1))
        })
        .collect()
}
