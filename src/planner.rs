use crate::config::Config;
use crate::episode::{EpisodeRecord, GroupKey};
use crate::error::{PlannerError, PlannerResult};
use crate::scoring::{GroupScores, aggregate_groups};
use crate::store::{EpisodeStore, load_recent_episodes};
use crate::{logi, logok, logw};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Niches the cold-start rotation knows about.
pub const KNOWN_NICHES: &[&str] = &[
    "courtroom",
    "relationship_drama",
    "injustice",
    "workplace_drama",
];

const MIX_STYLES: &[&str] = &["courtroom_drama", "ragebait", "relationship_drama"];
const MIX_PATTERNS: &[&str] = &["ragebait", "karma", "twist", "redemption"];
const MIX_PRIMARY_EMOTIONS: &[&str] = &["anger", "shock", "sadness", "satisfaction"];
const MIX_SECONDARY_EMOTIONS: &[Option<&str>] =
    &[Some("disgust"), Some("fear"), Some("hope"), None];

/// A content archetype handed to story generation. Not persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedVideo {
    pub niche: String,
    pub style: String,
    pub pattern_type: String,
    pub primary_emotion: String,
    #[serde(default)]
    pub secondary_emotion: Option<String>,
    #[serde(default)]
    pub topic_hint: Option<String>,
}

impl PlannedVideo {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.niche, &self.pattern_type, &self.primary_emotion)
    }

    pub fn with_topic_hint(mut self, hint: impl Into<String>) -> Self {
        self.topic_hint = Some(hint.into());
        self
    }
}

/// Picks the next batch of planned videos from episode history.
pub struct Optimiser<S> {
    store: S,
    recent_episode_limit: usize,
    default_niche: String,
}

impl<S: EpisodeStore> Optimiser<S> {
    pub fn new(store: S, cfg: &Config) -> Self {
        Self {
            store,
            recent_episode_limit: cfg.recent_episode_limit,
            default_niche: cfg.default_niche.clone(),
        }
    }

    pub async fn select_batch_plan(
        &self,
        batch_count: usize,
        fallback_niche: Option<&str>,
    ) -> PlannerResult<Vec<PlannedVideo>> {
        let history = self.load_history(batch_count).await?;
        let mut rng = StdRng::from_entropy();
        self.plan_from_history(&history, batch_count, fallback_niche, &mut rng)
    }

    /// Same as [`Optimiser::select_batch_plan`] with a reproducible sampler.
    pub async fn select_batch_plan_seeded(
        &self,
        batch_count: usize,
        fallback_niche: Option<&str>,
        seed: u64,
    ) -> PlannerResult<Vec<PlannedVideo>> {
        let history = self.load_history(batch_count).await?;
        let mut rng = StdRng::seed_from_u64(seed);
        self.plan_from_history(&history, batch_count, fallback_niche, &mut rng)
    }

    async fn load_history(&self, batch_count: usize) -> PlannerResult<Vec<EpisodeRecord>> {
        check_batch_count(batch_count)?;
        logi(format!("Selecting batch plan for {} videos...", batch_count));

        match load_recent_episodes(&self.store, self.recent_episode_limit).await {
            Ok(history) => {
                logi(format!("Loaded {} recent episodes", history.len()));
                Ok(history)
            }
            Err(e) => {
                logw(format!("Episode history unavailable ({e:#}); planning without it"));
                Ok(Vec::new())
            }
        }
    }

    /// Plans a batch from an already loaded history snapshot.
    pub fn plan_from_history<R: Rng + ?Sized>(
        &self,
        history: &[EpisodeRecord],
        batch_count: usize,
        fallback_niche: Option<&str>,
        rng: &mut R,
    ) -> PlannerResult<Vec<PlannedVideo>> {
        check_batch_count(batch_count)?;
        let niche = fallback_niche.unwrap_or(self.default_niche.as_str());

        let measured = history.iter().filter(|e| e.has_performance()).count();
        if measured == 0 {
            logi("No performance data available, using simple mix strategy");
            return Ok(cold_start_mix(batch_count, niche));
        }

        logi(format!("Found {} episodes with performance data", measured));
        let scores = aggregate_groups(history);
        logi(format!("Grouped into {} unique combinations", scores.len()));
        for (key, group) in scores.iter() {
            debug!(
                "group {}: score={:.3} members={}",
                key, group.score, group.members
            );
        }

        match weighted_sample(&scores, batch_count, rng) {
            Some(planned) => {
                logok(format!("Generated optimised plan: {} planned videos", planned.len()));
                Ok(planned)
            }
            None => {
                logw("All group scores are zero, falling back to simple mix");
                Ok(cold_start_mix(batch_count, niche))
            }
        }
    }
}

fn check_batch_count(batch_count: usize) -> PlannerResult<()> {
    if batch_count == 0 {
        return Err(PlannerError::InvalidCount {
            what: "batch_count",
            value: batch_count,
        });
    }
    Ok(())
}

/// Deterministic rotation used when no history has been measured.
///
/// Item `i` takes element `i % len` of each list independently. A recognised
/// `niche` pins the niche dimension; anything else rotates through
/// [`KNOWN_NICHES`].
pub fn cold_start_mix(batch_count: usize, niche: &str) -> Vec<PlannedVideo> {
    let pinned = KNOWN_NICHES.contains(&niche);

    let planned: Vec<PlannedVideo> = (0..batch_count)
        .map(|i| PlannedVideo {
            niche: if pinned {
                niche.to_string()
            } else {
                KNOWN_NICHES[i % KNOWN_NICHES.len()].to_string()
            },
            style: MIX_STYLES[i % MIX_STYLES.len()].to_string(),
            pattern_type: MIX_PATTERNS[i % MIX_PATTERNS.len()].to_string(),
            primary_emotion: MIX_PRIMARY_EMOTIONS[i % MIX_PRIMARY_EMOTIONS.len()].to_string(),
            secondary_emotion: MIX_SECONDARY_EMOTIONS[i % MIX_SECONDARY_EMOTIONS.len()]
                .map(str::to_string),
            topic_hint: None,
        })
        .collect();

    logi(format!("Generated simple mix: {} planned videos", planned.len()));
    planned
}

/// Draws `batch_count` groups with replacement, proportional to group score.
/// Returns `None` when no group has a positive score.
pub fn weighted_sample<R: Rng + ?Sized>(
    scores: &GroupScores,
    batch_count: usize,
    rng: &mut R,
) -> Option<Vec<PlannedVideo>> {
    let probs = scores.probabilities()?;
    let dist = WeightedIndex::new(probs.iter().map(|(_, p)| *p)).ok()?;

    let mut planned = Vec::with_capacity(batch_count);
    for _ in 0..batch_count {
        let (key, _) = &probs[dist.sample(rng)];
        let group = scores.get(key)?;
        let rep = &group.representative;
        planned.push(PlannedVideo {
            niche: key.niche.clone(),
            style: rep.style.clone(),
            pattern_type: key.pattern_type.clone(),
            primary_emotion: key.primary_emotion.clone(),
            secondary_emotion: rep.secondary_emotion.clone(),
            topic_hint: None,
        });
    }

    Some(planned)
}
