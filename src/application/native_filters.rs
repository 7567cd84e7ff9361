// Native filter persistence - collapses bursts of edits into one save per
// dashboard once the filters have been quiet for a while.
use crate::application::dashboard_repository::DashboardRepository;
use crate::domain::widget::Filter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug)]
struct FilterUpdate {
    dashboard_id: String,
    filters: Vec<Filter>,
}

struct Pending {
    deadline: Instant,
    filters: Vec<Filter>,
}

pub struct NativeFilterDebouncer {
    sender: mpsc::UnboundedSender<FilterUpdate>,
    worker: JoinHandle<()>,
}

impl NativeFilterDebouncer {
    pub fn spawn(repository: Arc<dyn DashboardRepository>, quiet: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(repository, quiet, receiver));
        Self { sender, worker }
    }

    /// Queue the latest filters for a dashboard. Each call restarts that
    /// dashboard's quiet period; only the last value in a burst is saved.
    pub fn submit(&self, dashboard_id: &str, filters: Vec<Filter>) -> anyhow::Result<()> {
        self.sender
            .send(FilterUpdate {
                dashboard_id: dashboard_id.to_string(),
                filters,
            })
            .map_err(|_| anyhow::anyhow!("Native filter worker has stopped"))
    }

    /// Stop accepting updates and persist whatever is still pending.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            tracing::warn!("Native filter worker ended abnormally: {}", e);
        }
    }
}

async fn run(
    repository: Arc<dyn DashboardRepository>,
    quiet: Duration,
    mut receiver: mpsc::UnboundedReceiver<FilterUpdate>,
) {
    let mut pending: HashMap<String, Pending> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();

        tokio::select! {
            update = receiver.recv() => match update {
                Some(update) => {
                    tracing::debug!(
                        dashboard_id = %update.dashboard_id,
                        count = update.filters.len(),
                        "native filters changed"
                    );
                    pending.insert(
                        update.dashboard_id,
                        Pending {
                            deadline: Instant::now() + quiet,
                            filters: update.filters,
                        },
                    );
                }
                None => break,
            },
            _ = sleep_until(next_deadline) => {
                let now = Instant::now();
                let due: Vec<String> = pending
                    .iter()
                    .filter(|(_, p)| p.deadline <= now)
                    .map(|(id, _)| id.clone())
                    .collect();
                for dashboard_id in due {
                    if let Some(p) = pending.remove(&dashboard_id) {
                        persist(repository.as_ref(), &dashboard_id, &p.filters).await;
                    }
                }
            }
        }
    }

    for (dashboard_id, p) in pending {
        persist(repository.as_ref(), &dashboard_id, &p.filters).await;
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn persist(repository: &dyn DashboardRepository, dashboard_id: &str, filters: &[Filter]) {
    match repository.save_native_filters(dashboard_id, filters).await {
        Ok(()) => tracing::info!(dashboard_id, count = filters.len(), "native filters saved"),
        Err(e) => tracing::warn!(dashboard_id, "Failed to persist native filters: {:#}", e),
    }
}
