use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use readalong_sync::{
    build_timeline_report, AlignmentPayload, Passage, SyncConfig, SyncEngineBuilder,
};

#[path = "sync_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Parser)]
#[command(name = "sync_report")]
#[command(about = "Replay a passage against its alignment and report the active word over time")]
struct Args {
    /// Plain-text passage file.
    #[arg(long, env = "READALONG_REPORT_TEXT")]
    text: PathBuf,
    /// Alignment payload JSON. Without it the timeline runs on the text estimate.
    #[arg(long, env = "READALONG_REPORT_ALIGNMENT")]
    alignment: Option<PathBuf>,
    /// Sync config JSON; defaults apply when omitted.
    #[arg(long, env = "READALONG_REPORT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "READALONG_REPORT_PASSAGE_ID")]
    passage_id: Option<String>,
    /// Audio duration in seconds.
    #[arg(long, env = "READALONG_REPORT_DURATION")]
    duration: f64,
    #[arg(long, env = "READALONG_REPORT_STEP", default_value_t = 0.25)]
    step: f64,
    /// Output path; the report goes to stdout when omitted.
    #[arg(long, env = "READALONG_REPORT_OUT")]
    out: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let text = fs::read_to_string(&args.text)
        .map_err(|err| format!("Failed to read passage text '{}': {err}", args.text.display()))?;
    let passage_id = args
        .passage_id
        .clone()
        .unwrap_or_else(|| passage_id_from_path(&args.text));

    let config = match args.config.as_ref() {
        Some(path) => SyncConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => SyncConfig::default(),
    };
    // The report always follows playback, whatever the configured default.
    let mut engine = SyncEngineBuilder::new(config).with_follow(true).build();

    let ticket = engine.load_passage(&Passage::new(passage_id, text));
    let payload = match args.alignment.as_ref() {
        Some(path) => load_payload(path)?,
        None => AlignmentPayload::empty(),
    };
    engine.apply_alignment(&ticket, Ok(payload));

    let report = build_timeline_report(
        &mut engine,
        args.duration,
        args.step,
        Utc::now().to_rfc3339(),
    )
    .map_err(|err| format!("Failed to build timeline: {err}"))?;

    match args.out.as_ref() {
        Some(path) => {
            json_report_formatter::write_report(path, &report)?;
            println!("{}", path.display());
        }
        None => json_report_formatter::print_report(&report)?,
    }
    Ok(())
}

fn load_payload(path: &Path) -> Result<AlignmentPayload, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read alignment payload '{}': {err}", path.display()))?;
    AlignmentPayload::from_json_str(&data)
        .map_err(|err| format!("Failed to parse alignment payload '{}': {err}", path.display()))
}

fn passage_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "passage".to_string())
}
