use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A past episode as kept by the history store.
///
/// `views_24h == None` means the episode has not been measured yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode_id: String,
    pub niche: String,
    pub pattern_type: String,
    pub primary_emotion: String,
    #[serde(default)]
    pub secondary_emotion: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub views_24h: Option<u64>,
    #[serde(default)]
    pub likes_24h: Option<u64>,
    #[serde(default)]
    pub comments_24h: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_style() -> String {
    "courtroom_drama".to_string()
}

impl EpisodeRecord {
    pub fn new(
        episode_id: impl Into<String>,
        niche: impl Into<String>,
        pattern_type: impl Into<String>,
        primary_emotion: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        Self {
            episode_id: episode_id.into(),
            niche: niche.into(),
            pattern_type: pattern_type.into(),
            primary_emotion: primary_emotion.into(),
            secondary_emotion: None,
            style: style.into(),
            views_24h: None,
            likes_24h: None,
            comments_24h: None,
            created_at: None,
        }
    }

    pub fn with_views(mut self, views: u64) -> Self {
        self.views_24h = Some(views);
        self
    }

    pub fn with_engagement(mut self, likes: Option<u64>, comments: Option<u64>) -> Self {
        self.likes_24h = likes;
        self.comments_24h = comments;
        self
    }

    pub fn with_secondary_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.secondary_emotion = Some(emotion.into());
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    pub fn has_performance(&self) -> bool {
        self.views_24h.is_some()
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            niche: self.niche.clone(),
            pattern_type: self.pattern_type.clone(),
            primary_emotion: self.primary_emotion.clone(),
        }
    }

    /// Parsed `created_at`, in UTC when an offset is present.
    /// Missing or unparseable timestamps return `None` and sort as oldest.
    pub fn created_at_parsed(&self) -> Option<NaiveDateTime> {
        let raw = self.created_at.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub niche: String,
    pub pattern_type: String,
    pub primary_emotion: String,
}

impl GroupKey {
    pub fn new(
        niche: impl Into<String>,
        pattern_type: impl Into<String>,
        primary_emotion: impl Into<String>,
    ) -> Self {
        Self {
            niche: niche.into(),
            pattern_type: pattern_type.into(),
            primary_emotion: primary_emotion.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.niche, self.pattern_type, self.primary_emotion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_metrics_parses() {
        let json = r#"{
            "episode_id": "ep_001",
            "niche": "courtroom",
            "pattern_type": "twist",
            "primary_emotion": "shock",
            "style": "courtroom_drama"
        }"#;
        let ep: EpisodeRecord = serde_json::from_str(json).unwrap();
        assert!(!ep.has_performance());
        assert_eq!(ep.secondary_emotion, None);
        assert_eq!(ep.group_key(), GroupKey::new("courtroom", "twist", "shock"));
    }

    #[test]
    fn record_without_style_keeps_its_metrics() {
        let json = r#"{
            "episode_id": "ep_002",
            "niche": "injustice",
            "pattern_type": "karma",
            "primary_emotion": "anger",
            "views_24h": 42000
        }"#;
        let ep: EpisodeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(ep.style, "courtroom_drama");
        assert_eq!(ep.views_24h, Some(42_000));
    }

    #[test]
    fn created_at_accepts_offset_and_naive_forms() {
        let base = EpisodeRecord::new("a", "n", "p", "e", "s");
        let with_offset = base.clone().with_created_at("2026-03-01T12:00:00+01:00");
        let naive = base.clone().with_created_at("2026-03-01T11:30:00.123456");
        let junk = base.with_created_at("yesterday");

        assert!(with_offset.created_at_parsed().unwrap() < naive.created_at_parsed().unwrap());
        assert_eq!(junk.created_at_parsed(), None);
    }

    #[test]
    fn group_key_displays_as_path() {
        let key = GroupKey::new("courtroom", "ragebait", "anger");
        assert_eq!(key.to_string(), "courtroom/ragebait/anger");
    }
}
