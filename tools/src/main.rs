//! uplift-runner: headless recompute of activity uplift.
//!
//! Usage:
//!   uplift-runner --db uplift.db --data-dir ./data
//!   uplift-runner --db uplift.db --activities acts.json --metrics metrics.json
//!   uplift-runner --synthetic --seed 42
//!   uplift-runner --env-config --db uplift.db

use anyhow::{Context, Result};
use std::env;
use uplift_core::{
    activity::{Activity, DailyMetric},
    config::AttributionConfig,
    engine::{RecomputeSummary, UpliftEngine},
    store::UpliftStore,
    synthetic::{self, SyntheticSpec},
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let synthetic_mode = args.iter().any(|a| a == "--synthetic");
    let env_config = args.iter().any(|a| a == "--env-config");
    let quiet = args.iter().any(|a| a == "--json");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");

    // Config is loaded once per invocation and validated before anything runs.
    let config = if env_config {
        AttributionConfig::from_env()?
    } else {
        AttributionConfig::load(data_dir)?
    };

    if !quiet {
        println!("Uplift attribution: uplift-runner");
        println!("  db:          {db}");
        println!("  config:      {}", if env_config { "environment" } else { data_dir });
        println!("  baseline:    {} days", config.baseline_window_days);
        println!("  post window: {} days", config.post_window_days);
        println!("  attribution: {}", config.post_window_attribution.enabled);
        println!();
    }

    let store = UpliftStore::open(db)?;
    store.migrate()?;

    if synthetic_mode {
        let start = chrono::Utc::now().date_naive() - chrono::Duration::days(90);
        let data = synthetic::generate(&SyntheticSpec::demo(start), seed);
        import(&store, &data.activities, &data.metrics)?;
        log::info!("seeded synthetic dataset (seed={seed})");
    }
    if let Some(path) = str_arg(&args, "--activities") {
        let activities: Vec<Activity> = read_json(path)?;
        import(&store, &activities, &[])?;
    }
    if let Some(path) = str_arg(&args, "--metrics") {
        let metrics: Vec<DailyMetric> = read_json(path)?;
        import(&store, &[], &metrics)?;
    }

    let engine = UpliftEngine::new(config)?;
    let summary = engine.recompute(&store)?;

    if quiet {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn import(store: &UpliftStore, activities: &[Activity], metrics: &[DailyMetric]) -> Result<()> {
    for activity in activities {
        store.insert_activity(activity)?;
    }
    store.insert_daily_metrics(metrics)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))
}

fn print_summary(summary: &RecomputeSummary) {
    println!("=== RECOMPUTE SUMMARY ===");
    println!("  run_id:      {}", summary.run_id);
    println!("  count:       {}", summary.count);
    println!("  duration_ms: {}", summary.duration_ms);
    println!();

    let mut channel = "";
    for r in &summary.reports {
        if r.activity.channel != channel {
            channel = r.activity.channel.as_str();
            println!("--- {channel} ---");
        }
        let cpa = r
            .cost_per_attributed_signup()
            .map(|c| format!("${c:.2}/signup"))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {} {} | raw {:.1} / attr {:.1} signups | raw {:.1} / attr {:.1} activations | {} | {}",
            r.activity.date,
            r.activity.id,
            r.incremental(),
            r.attributed_signups(),
            r.incremental_activations(),
            r.attributed_activations(),
            r.confidence,
            cpa,
        );
    }
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
