use std::path::PathBuf;

use autocatch::config;
use autocatch::game::autoplay;
use autocatch::game::parsing::timeline;
use clap::{Parser, ValueHint};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plans a score-optimal autoplay replay for a catch timeline", long_about = None)]
struct Args {
    /// Timeline JSON with the objects to catch.
    #[arg(value_hint = ValueHint::FilePath)]
    timeline: PathBuf,
    /// Replay JSON destination; stdout when omitted.
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let args = Args::parse();

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let timeline = timeline::load_timeline(&args.timeline)?;
    let agent = cfg.agent(timeline.circle_size);
    let plan = match autoplay::plan(&timeline.objects, &agent) {
        Ok(plan) => plan,
        Err(e) => {
            // No playback is produced; the caller falls back to manual play.
            log::error!(
                "Autoplay planning failed for '{}': {e}",
                args.timeline.display()
            );
            return Err(e.into());
        }
    };
    log::info!(
        "Planned {} frames, expected score {}.",
        plan.replay.len(),
        plan.expected_score
    );

    let json = timeline::replay_to_json(&plan.replay)?;
    match args.output {
        Some(path) => std::fs::write(&path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
