use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use release_velocity_rs::trace::{load_trace, ReleaseRecord};
use release_velocity_rs::{EstimatorConfig, Pose, RansacVelocityEstimator};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay recorded pose traces through the release velocity estimator", long_about = None)]
struct Args {
    /// Path to a trace_*.json[.gz] recording
    #[arg(long, conflicts_with = "trace_dir")]
    trace: Option<PathBuf>,

    /// Directory of recordings to batch replay (processes *.json[.gz])
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Estimator config JSON (missing fields keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override RANSAC sample count (S)
    #[arg(long)]
    sample_count: Option<usize>,

    /// Override dead zone (D)
    #[arg(long)]
    dead_zone: Option<usize>,

    /// Override valid frames required before RANSAC is used
    #[arg(long)]
    min_valid_frames: Option<usize>,

    /// Fixed RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn build_config(args: &Args) -> anyhow::Result<EstimatorConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => EstimatorConfig::from_json_file(path)?,
        None => EstimatorConfig::default(),
    };
    if let Some(sample_count) = args.sample_count {
        config.sample_count = sample_count;
    }
    if let Some(dead_zone) = args.dead_zone {
        config.dead_zone = dead_zone;
    }
    if let Some(min_valid) = args.min_valid_frames {
        config.min_high_confidence_samples = min_valid;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run_once(path: &Path, config: &EstimatorConfig) -> anyhow::Result<serde_json::Value> {
    let trace = load_trace(path)?;
    let Some(first) = trace.frames.first() else {
        anyhow::bail!("{} has no frames", path.display());
    };

    // The estimator is created on the first recorded tick, seeded with that pose
    let first_frame = first.to_frame()?;
    let mut estimator = RansacVelocityEstimator::new(
        config.clone(),
        first_frame.root_pose.unwrap_or_else(Pose::identity),
        first_frame.time,
    )?;

    let mut releases = Vec::new();
    let mut tracked_frames = 0u64;
    let mut gaps = 0u64;
    let mut was_valid = true;

    for record in &trace.frames {
        let frame = record.to_frame()?;
        let valid = frame.confident_pose().is_some();
        if valid {
            tracked_frames += 1;
        } else if was_valid {
            gaps += 1;
        }
        was_valid = valid;

        match record.release_pose()? {
            Some(object) => {
                let release = estimator.compute_release_velocity(&frame, &object);
                println!(
                    "[RELEASE] t={:.3}s v=({:.2}, {:.2}, {:.2}) |v|={:.2} |w|={:.2} rad/s valid_frames={}",
                    frame.time,
                    release.linear_velocity.x,
                    release.linear_velocity.y,
                    release.linear_velocity.z,
                    release.linear_velocity.norm(),
                    release.angular_velocity.norm(),
                    estimator.consecutive_valid_frames()
                );
                releases.push(ReleaseRecord::new(frame.time, &release));
            }
            None => estimator.process(&frame),
        }
    }

    let max_speed = releases.iter().map(|r| r.speed).fold(0.0_f64, f64::max);

    Ok(json!({
        "trace": path.display().to_string(),
        "replayed_at": Utc::now().to_rfc3339(),
        "config": config,
        "frames": trace.frames.len(),
        "tracked_frames": tracked_frames,
        "tracking_gaps": gaps,
        "max_release_speed": max_speed,
        "releases": releases,
    }))
}

fn is_trace_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path.is_file() && (name.ends_with(".json") || name.ends_with(".json.gz"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = build_config(&args)?;
    let mut results = Vec::new();

    if let Some(dir) = args.trace_dir.as_ref() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !is_trace_file(&path) {
                continue;
            }
            match run_once(&path, &config) {
                Ok(res) => results.push(res),
                Err(e) => log::error!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(trace) = args.trace.as_ref() {
        results.push(run_once(trace, &config)?);
    } else {
        anyhow::bail!("Provide --trace or --trace-dir");
    }

    let report = serde_json::to_string_pretty(&results)?;
    match args.output.as_ref() {
        Some(path) => std::fs::write(path, report)?,
        None => println!("{}", report),
    }
    Ok(())
}
