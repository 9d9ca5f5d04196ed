use crate::episode::{EpisodeRecord, GroupKey};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// View count treated as a "high performance" ceiling.
pub const VIEW_CEILING: f64 = 100_000.0;
/// Weight applied to like-rate and comment-rate.
pub const ENGAGEMENT_WEIGHT: f64 = 0.1;

/// Score of a single episode, or `None` when it has not been measured.
///
/// Not clamped: a high like or comment rate can push a viral episode past 1.0.
pub fn performance_score(episode: &EpisodeRecord) -> Option<f64> {
    let views = episode.views_24h?;
    let view_score = (views as f64 / VIEW_CEILING).min(1.0);

    let mut engagement_bonus = 0.0;
    if views > 0 {
        let views = views as f64;
        if let Some(likes) = episode.likes_24h {
            engagement_bonus += likes as f64 / views * ENGAGEMENT_WEIGHT;
        }
        if let Some(comments) = episode.comments_24h {
            engagement_bonus += comments as f64 / views * ENGAGEMENT_WEIGHT;
        }
    }

    Some(view_score + engagement_bonus)
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub score: f64,
    pub members: usize,
    /// Supplies `style` and `secondary_emotion` for planned videos drawn from this group.
    pub representative: EpisodeRecord,
}

/// Mean performance per (niche, pattern, emotion), ordered by key.
#[derive(Debug, Clone, Default)]
pub struct GroupScores {
    groups: BTreeMap<GroupKey, GroupSummary>,
}

impl GroupScores {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&GroupSummary> {
        self.groups.get(key)
    }

    pub fn score(&self, key: &GroupKey) -> Option<f64> {
        self.groups.get(key).map(|g| g.score)
    }

    pub fn total(&self) -> f64 {
        self.groups.values().map(|g| g.score).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &GroupSummary)> {
        self.groups.iter()
    }

    /// `score / total` per group; `None` when the total is zero.
    pub fn probabilities(&self) -> Option<Vec<(GroupKey, f64)>> {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some(
            self.groups
                .iter()
                .map(|(k, g)| (k.clone(), g.score / total))
                .collect(),
        )
    }
}

struct Accumulator {
    sum: f64,
    members: usize,
    representative: EpisodeRecord,
}

/// Groups scored episodes and averages each group.
///
/// Unmeasured episodes are skipped entirely, so every group has at least one
/// member. The representative is the most recent member by `created_at`;
/// members without a parseable timestamp lose to dated ones, and ties keep the
/// first member encountered.
pub fn aggregate_groups<'a, I>(episodes: I) -> GroupScores
where
    I: IntoIterator<Item = &'a EpisodeRecord>,
{
    let mut acc: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();

    for episode in episodes {
        let Some(score) = performance_score(episode) else {
            continue;
        };

        match acc.entry(episode.group_key()) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                entry.sum += score;
                entry.members += 1;
                if episode.created_at_parsed() > entry.representative.created_at_parsed() {
                    entry.representative = episode.clone();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Accumulator {
                    sum: score,
                    members: 1,
                    representative: episode.clone(),
                });
            }
        }
    }

    let groups = acc
        .into_iter()
        .map(|(key, a)| {
            (
                key,
                GroupSummary {
                    score: a.sum / a.members as f64,
                    members: a.members,
                    representative: a.representative,
                },
            )
        })
        .collect();

    GroupScores { groups }
}
