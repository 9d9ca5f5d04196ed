use crate::episode::EpisodeRecord;
use crate::error::PlannerError;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Read side of the episode history the optimiser plans from.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    async fn list_episode_ids(&self) -> Result<Vec<String>>;

    /// `Ok(None)` for unknown ids and for records that fail to parse.
    async fn load_episode(&self, episode_id: &str) -> Result<Option<EpisodeRecord>>;
}

#[async_trait]
impl<T: EpisodeStore + ?Sized> EpisodeStore for Arc<T> {
    async fn list_episode_ids(&self) -> Result<Vec<String>> {
        (**self).list_episode_ids().await
    }

    async fn load_episode(&self, episode_id: &str) -> Result<Option<EpisodeRecord>> {
        (**self).load_episode(episode_id).await
    }
}

/// Snapshot of the `limit` most recent episodes, newest first.
///
/// Absent, corrupt, or unreadable records are skipped. Records without a
/// usable `created_at` sort after dated ones, keeping store order among
/// themselves.
pub async fn load_recent_episodes<S: EpisodeStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<Vec<EpisodeRecord>> {
    let ids = store
        .list_episode_ids()
        .await
        .context("Failed to list episodes")?;

    let mut episodes = Vec::with_capacity(ids.len());
    for id in &ids {
        match store.load_episode(id).await {
            Ok(Some(ep)) => episodes.push(ep),
            Ok(None) => {}
            Err(e) => logw(format!("Skipping episode {}: {:#}", id, e)),
        }
    }

    episodes.sort_by(|a, b| b.created_at_parsed().cmp(&a.created_at_parsed()));
    episodes.truncate(limit);
    Ok(episodes)
}

fn episode_id_regex() -> Result<&'static Regex> {
    static ID_RE: OnceCell<Regex> = OnceCell::new();
    ID_RE.get_or_try_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+$").context("failed to compile episode id regex")
    })
}

/// Episode ids double as file names, so only a safe alphabet is accepted.
pub fn validate_episode_id(episode_id: &str) -> Result<()> {
    if episode_id_regex()?.is_match(episode_id) {
        Ok(())
    } else {
        Err(PlannerError::InvalidEpisodeId(episode_id.to_string()).into())
    }
}

/// One pretty-printed JSON document per episode: `<root>/<episode_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonEpisodeStore {
    root: PathBuf,
}

impl JsonEpisodeStore {
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create episode store: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn episode_path(&self, episode_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", episode_id))
    }

    pub async fn save_episode(&self, episode: &EpisodeRecord) -> Result<PathBuf> {
        validate_episode_id(&episode.episode_id)?;
        let path = self.episode_path(&episode.episode_id);
        let body = serde_json::to_string_pretty(episode)
            .with_context(|| format!("Failed to serialise episode {}", episode.episode_id))?;
        fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write episode: {}", path.display()))?;
        logok(format!("Episode saved to: {}", path.display()));
        Ok(path)
    }

    /// Records 24h performance for a stored episode.
    pub async fn update_metrics(
        &self,
        episode_id: &str,
        views: u64,
        likes: Option<u64>,
        comments: Option<u64>,
    ) -> Result<EpisodeRecord> {
        let mut episode = self
            .load_episode(episode_id)
            .await?
            .ok_or_else(|| PlannerError::EpisodeNotFound(episode_id.to_string()))?;

        episode.views_24h = Some(views);
        if likes.is_some() {
            episode.likes_24h = likes;
        }
        if comments.is_some() {
            episode.comments_24h = comments;
        }

        self.save_episode(&episode).await?;
        logi(format!(
            "Updated metrics for {}: views={} likes={:?} comments={:?}",
            episode_id, views, episode.likes_24h, episode.comments_24h
        ));
        Ok(episode)
    }
}

#[async_trait]
impl EpisodeStore for JsonEpisodeStore {
    async fn list_episode_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read episode store: {}", self.root.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(OsStr::to_str) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(OsStr::to_str) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn load_episode(&self, episode_id: &str) -> Result<Option<EpisodeRecord>> {
        validate_episode_id(episode_id)?;
        let path = self.episode_path(episode_id);
        let content = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                logw(format!("Episode not found: {}", episode_id));
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read episode: {}", path.display()));
            }
        };

        match serde_json::from_str::<EpisodeRecord>(&content) {
            Ok(episode) => Ok(Some(episode)),
            Err(e) => {
                logw(format!("Skipping unreadable episode {}: {}", path.display(), e));
                Ok(None)
            }
        }
    }
}

/// In-memory history, kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryEpisodeStore {
    episodes: RwLock<Vec<EpisodeRecord>>,
}

impl MemoryEpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(episodes: Vec<EpisodeRecord>) -> Self {
        Self {
            episodes: RwLock::new(episodes),
        }
    }

    /// Inserts or replaces by `episode_id`.
    pub async fn insert(&self, episode: EpisodeRecord) {
        let mut guard = self.episodes.write().await;
        match guard.iter_mut().find(|e| e.episode_id == episode.episode_id) {
            Some(existing) => *existing = episode,
            None => guard.push(episode),
        }
    }
}

#[async_trait]
impl EpisodeStore for MemoryEpisodeStore {
    async fn list_episode_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .episodes
            .read()
            .await
            .iter()
            .map(|e| e.episode_id.clone())
            .collect())
    }

    async fn load_episode(&self, episode_id: &str) -> Result<Option<EpisodeRecord>> {
        Ok(self
            .episodes
            .read()
            .await
            .iter()
            .find(|e| e.episode_id == episode_id)
            .cloned())
    }
}
