use crate::config::Config;
use crate::{logi, logw};
use anyhow::{Result, anyhow};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

/// Result of one task in a batch, reported at the task's submission index.
#[derive(Debug)]
pub struct TaskOutcome<T> {
    pub name: String,
    pub result: Result<T>,
    pub elapsed: Duration,
}

impl<T> TaskOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Bounded worker pool for whole episodes and for API calls inside an episode.
///
/// A failed task never cancels its siblings.
#[derive(Debug, Clone)]
pub struct ParallelExecutor {
    max_parallel_episodes: usize,
    max_parallel_api_calls: usize,
}

#[derive(Clone, Copy)]
enum Verbosity {
    Batch,
    ApiCalls,
}

impl ParallelExecutor {
    pub fn new(max_parallel_episodes: usize, max_parallel_api_calls: usize) -> Self {
        Self {
            max_parallel_episodes: max_parallel_episodes.max(1),
            max_parallel_api_calls: max_parallel_api_calls.max(1),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.max_parallel_episodes, cfg.max_parallel_api_calls)
    }

    pub async fn execute_batch<T, F>(
        &self,
        tasks: Vec<F>,
        task_names: Option<Vec<String>>,
    ) -> Vec<TaskOutcome<T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let names = resolve_names(task_names, tasks.len(), "task");
        let workers = self.max_parallel_episodes;
        if workers == 1 {
            logi("Sequential execution mode (max_parallel_episodes=1)");
        } else {
            logi(format!(
                "Parallel execution mode: {} tasks with max {} workers",
                tasks.len(),
                workers
            ));
        }
        run_bounded(tasks, names, workers, String::new(), Verbosity::Batch).await
    }

    pub async fn execute_api_calls<T, F>(
        &self,
        tasks: Vec<F>,
        task_names: Option<Vec<String>>,
        episode_id: Option<&str>,
    ) -> Vec<TaskOutcome<T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let names = resolve_names(task_names, tasks.len(), "api_call");
        let prefix = episode_id.map(|id| format!("[{}] ", id)).unwrap_or_default();
        debug!(
            "{}Parallel API calls: {} tasks with max {} workers",
            prefix,
            tasks.len(),
            self.max_parallel_api_calls
        );
        run_bounded(
            tasks,
            names,
            self.max_parallel_api_calls,
            prefix,
            Verbosity::ApiCalls,
        )
        .await
    }
}

fn resolve_names(names: Option<Vec<String>>, len: usize, fallback: &str) -> Vec<String> {
    let given = names.unwrap_or_default();
    (0..len)
        .map(|i| {
            given
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", fallback, i + 1))
        })
        .collect()
}

async fn run_bounded<T, F>(
    tasks: Vec<F>,
    names: Vec<String>,
    workers: usize,
    prefix: String,
    verbosity: Verbosity,
) -> Vec<TaskOutcome<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }

    let batch_start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(workers));
    let completed = Arc::new(AtomicUsize::new(0));
    let sequential = workers == 1;

    let mut outcomes = Vec::with_capacity(total);
    let mut handles = Vec::with_capacity(total);

    for (task, name) in tasks.into_iter().zip(names.iter().cloned()) {
        let semaphore = Arc::clone(&semaphore);
        let completed = Arc::clone(&completed);
        let prefix = prefix.clone();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let started = Instant::now();
            let result = task.await;
            let elapsed = started.elapsed();
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            report(&prefix, &task_name, done, total, elapsed, &result, verbosity);
            (result, elapsed)
        });

        if sequential {
            // Awaiting here keeps strict submission order when only one worker is allowed.
            outcomes.push(collect(handle, name).await);
        } else {
            handles.push((handle, name));
        }
    }

    for (handle, name) in handles {
        outcomes.push(collect(handle, name).await);
    }

    let successful = outcomes.iter().filter(|o| o.is_ok()).count();
    let summary = format!(
        "{}Batch complete: {}/{} successful in {:.2}s (parallelism: {} workers)",
        prefix,
        successful,
        total,
        batch_start.elapsed().as_secs_f64(),
        workers
    );
    match verbosity {
        Verbosity::Batch => logi(summary),
        Verbosity::ApiCalls => debug!("{}", summary),
    }

    outcomes
}

async fn collect<T>(
    handle: tokio::task::JoinHandle<(Result<T>, Duration)>,
    name: String,
) -> TaskOutcome<T> {
    match handle.await {
        Ok((result, elapsed)) => TaskOutcome {
            name,
            result,
            elapsed,
        },
        Err(join_err) => {
            logw(format!("{} aborted: {}", name, join_err));
            TaskOutcome {
                name,
                result: Err(anyhow!("task aborted: {}", join_err)),
                elapsed: Duration::ZERO,
            }
        }
    }
}

fn report<T>(
    prefix: &str,
    name: &str,
    done: usize,
    total: usize,
    elapsed: Duration,
    result: &Result<T>,
    verbosity: Verbosity,
) {
    let secs = elapsed.as_secs_f64();
    match (result, verbosity) {
        (Ok(_), Verbosity::Batch) => {
            logi(format!("{}{} completed ({}/{}) in {:.2}s", prefix, name, done, total, secs))
        }
        (Ok(_), Verbosity::ApiCalls) => {
            debug!("{}{} completed ({}/{}) in {:.2}s", prefix, name, done, total, secs)
        }
        (Err(e), _) => logw(format!(
            "{}{} failed ({}/{}) after {:.2}s: {:#}",
            prefix, name, done, total, secs, e
        )),
    }
}
