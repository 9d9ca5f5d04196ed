use chrono::{NaiveDate, Timelike};
use std::sync::Arc;
use story_shorts_planner::{
    Config, EpisodeRecord, GroupKey, JsonEpisodeStore, MemoryEpisodeStore, Optimiser,
    ScheduleManager,
};
use tempfile::TempDir;

fn scored(id: &str, key: (&str, &str, &str), views: u64, created_at: &str) -> EpisodeRecord {
    EpisodeRecord::new(id, key.0, key.1, key.2, format!("{}_drama", key.0))
        .with_views(views)
        .with_created_at(created_at)
}

#[tokio::test]
async fn history_on_disk_drives_the_weighted_plan() {
    let dir = TempDir::new().unwrap();
    let store = JsonEpisodeStore::open(dir.path()).await.unwrap();

    let courtroom = ("courtroom", "ragebait", "anger");
    let drama = ("relationship_drama", "karma", "satisfaction");
    for (id, key, views, at) in [
        ("ep_001", courtroom, 50_000, "2026-05-01T10:00:00"),
        ("ep_002", courtroom, 80_000, "2026-05-02T10:00:00"),
        ("ep_003", courtroom, 20_000, "2026-05-03T10:00:00"),
        ("ep_004", drama, 100_000, "2026-05-04T10:00:00"),
    ] {
        store.save_episode(&scored(id, key, views, at)).await.unwrap();
    }
    // Unmeasured and corrupt entries must not disturb the plan.
    store
        .save_episode(&EpisodeRecord::new("ep_005", "injustice", "twist", "shock", "x"))
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("ep_006.json"), "{").await.unwrap();

    let optimiser = Optimiser::new(store, &Config::default());
    let plan = optimiser
        .select_batch_plan_seeded(1000, Some("courtroom"), 31337)
        .await
        .unwrap();

    assert_eq!(plan.len(), 1000);
    let drama_key = GroupKey::new("relationship_drama", "karma", "satisfaction");
    let court_key = GroupKey::new("courtroom", "ragebait", "anger");
    let drama_n = plan.iter().filter(|p| p.group_key() == drama_key).count();
    let court_n = plan.iter().filter(|p| p.group_key() == court_key).count();
    assert_eq!(drama_n + court_n, 1000);

    let ratio = drama_n as f64 / court_n as f64;
    assert!((1.6..2.5).contains(&ratio), "ratio was {ratio}");
}

#[tokio::test]
async fn daily_batch_pairs_plan_with_slots() {
    let cfg = Config {
        posting_hours: vec![11, 14, 18],
        timezone: "Europe/London".to_string(),
        ..Config::default()
    };
    let store = Arc::new(MemoryEpisodeStore::new());
    let optimiser = Optimiser::new(Arc::clone(&store), &cfg);
    let sched = ScheduleManager::from_config(&cfg).unwrap();
    let target = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();

    let plan = optimiser.select_batch_plan(5, Some("courtroom")).await.unwrap();
    let slots = sched.get_daily_slots(target, plan.len()).unwrap();

    assert_eq!(plan.len(), slots.len());
    assert!(plan.iter().all(|p| p.niche == "courtroom"));
    let hours: Vec<u32> = slots.iter().map(|s| s.hour()).collect();
    assert_eq!(hours, vec![11, 14, 18, 11, 14]);
    assert!(slots.iter().all(|s| s.date_naive() == target));

    // Once the shared store gains measured history the optimiser switches modes.
    store
        .insert(scored(
            "ep_100",
            ("workplace_drama", "twist", "shock"),
            70_000,
            "2026-07-01T09:00:00",
        ))
        .await;
    let plan = optimiser.select_batch_plan(3, Some("courtroom")).await.unwrap();
    assert!(plan.iter().all(|p| p.niche == "workplace_drama"));
    assert!(plan.iter().all(|p| p.style == "workplace_drama_drama"));
}

#[tokio::test]
async fn recorded_metrics_feed_the_next_plan() {
    let dir = TempDir::new().unwrap();
    let store = JsonEpisodeStore::open(dir.path()).await.unwrap();
    store
        .save_episode(
            &EpisodeRecord::new("ep_a", "injustice", "redemption", "sadness", "ragebait")
                .with_secondary_emotion("hope"),
        )
        .await
        .unwrap();

    store.update_metrics("ep_a", 25_000, Some(2_500), Some(250)).await.unwrap();

    let optimiser = Optimiser::new(store, &Config::default());
    let plan = optimiser.select_batch_plan_seeded(2, None, 5).await.unwrap();
    for p in &plan {
        assert_eq!(p.niche, "injustice");
        assert_eq!(p.style, "ragebait");
        assert_eq!(p.secondary_emotion.as_deref(), Some("hope"));
        assert!(p.topic_hint.is_none());
    }

    let hinted = plan[0].clone().with_topic_hint("landlord keeps the deposit");
    assert_eq!(hinted.topic_hint.as_deref(), Some("landlord keeps the deposit"));
}
