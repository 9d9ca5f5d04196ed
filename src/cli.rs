use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use story_shorts_planner::init::init_tracing;
use story_shorts_planner::{Config, JsonEpisodeStore, Optimiser, PlannedVideo, ScheduleManager};
use tracing::info;

/// Story Shorts Planner - picks and schedules the next batch of videos
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select the next batch from episode history
    Plan {
        /// Number of videos to plan
        #[arg(long, default_value_t = 1)]
        batch_count: usize,

        /// Niche used when there is no performance history
        #[arg(long)]
        niche: Option<String>,

        /// Target date for scheduling (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Attach a publish slot to every planned video
        #[arg(long)]
        daily_mode: bool,

        /// Seed the sampler for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the publish slots for a date
    Slots {
        #[arg(long)]
        count: usize,

        #[arg(long)]
        date: Option<String>,
    },

    /// Store 24h performance for a published episode
    RecordMetrics {
        #[arg(long)]
        episode_id: String,

        #[arg(long)]
        views: u64,

        #[arg(long)]
        likes: Option<u64>,

        #[arg(long)]
        comments: Option<u64>,
    },
}

#[derive(Debug, Serialize)]
struct PlanEntry {
    #[serde(flatten)]
    video: PlannedVideo,
    #[serde(skip_serializing_if = "Option::is_none")]
    publish_at: Option<String>,
}

fn resolve_date(raw: Option<&str>, sched: &ScheduleManager) -> Result<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date format: {s}. Use YYYY-MM-DD format.")),
        None => Ok(Utc::now().with_timezone(&sched.timezone()).date_naive()),
    }
}

fn print_plan(entries: &[PlanEntry]) {
    println!("Planned batch:");
    for (i, entry) in entries.iter().enumerate() {
        let v = &entry.video;
        println!("  {}. Niche: {}, Style: {}", i + 1, v.niche, v.style);
        println!("     Pattern: {}, Emotion: {}", v.pattern_type, v.primary_emotion);
        if let Some(secondary) = &v.secondary_emotion {
            println!("     Secondary: {}", secondary);
        }
        if let Some(hint) = &v.topic_hint {
            println!("     Hint: {}", hint);
        }
        if let Some(at) = &entry.publish_at {
            println!("     Publish at: {}", at);
        }
    }
}

async fn run_plan(
    cfg: &Config,
    batch_count: usize,
    niche: Option<String>,
    date: Option<String>,
    daily_mode: bool,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let slots: Vec<Option<String>> = if daily_mode {
        let sched = ScheduleManager::from_config(cfg)?;
        let target = resolve_date(date.as_deref(), &sched)?;
        info!("Daily mode: scheduling {} videos for {}", batch_count, target);
        sched
            .get_daily_slots(target, batch_count)?
            .into_iter()
            .map(|s| Some(s.to_rfc3339()))
            .collect()
    } else {
        vec![None; batch_count]
    };

    let store = JsonEpisodeStore::open(&cfg.storage_path).await?;
    let optimiser = Optimiser::new(store, cfg);
    let planned = match seed {
        Some(seed) => {
            optimiser
                .select_batch_plan_seeded(batch_count, niche.as_deref(), seed)
                .await?
        }
        None => optimiser.select_batch_plan(batch_count, niche.as_deref()).await?,
    };

    let entries: Vec<PlanEntry> = planned
        .into_iter()
        .zip(slots)
        .map(|(video, publish_at)| PlanEntry { video, publish_at })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_plan(&entries);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load_or_default(&args.config).await?;
    init_tracing(&cfg.log_level);
    cfg.log_source();

    match args.command {
        Command::Plan {
            batch_count,
            niche,
            date,
            daily_mode,
            seed,
            json,
        } => run_plan(&cfg, batch_count, niche, date, daily_mode, seed, json).await?,
        Command::Slots { count, date } => {
            let sched = ScheduleManager::from_config(&cfg)?;
            let target = resolve_date(date.as_deref(), &sched)?;
            for (i, slot) in sched.get_daily_slots(target, count)?.iter().enumerate() {
                println!("  Slot {}: {}", i + 1, slot.to_rfc3339());
            }
        }
        Command::RecordMetrics {
            episode_id,
            views,
            likes,
            comments,
        } => {
            let store = JsonEpisodeStore::open(&cfg.storage_path).await?;
            let ep = store.update_metrics(&episode_id, views, likes, comments).await?;
            println!(
                "{}: views_24h={:?} likes_24h={:?} comments_24h={:?}",
                ep.episode_id, ep.views_24h, ep.likes_24h, ep.comments_24h
            );
        }
    }

    Ok(())
}
