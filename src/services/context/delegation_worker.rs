//! Per-user delegation application worker.
//!
//! One background task per user drains that user's pending delegations in
//! submission order, so delegation effects stay causally ordered without a
//! global lock. Failed applications are retried with exponential backoff
//! up to a bounded attempt count, then reported as a health event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::adapters::sqlite::SqliteDelegationRepository;
use crate::domain::errors::DomainResult;
use crate::domain::models::{ChangeEvent, Delegation, EntityKind};
use crate::domain::ports::{ChangeNotifier, DelegationRepository};

use super::{DelegationQueue, InheritanceCache, NullDelegationQueue, UnifiedContextService};

pub struct DelegationProcessor {
    pool: SqlitePool,
    cache: Arc<InheritanceCache>,
    notifier: Arc<dyn ChangeNotifier>,
    max_attempts: u32,
    workers: Mutex<HashMap<Uuid, mpsc::UnboundedSender<()>>>,
}

impl DelegationProcessor {
    pub fn new(
        pool: SqlitePool,
        cache: Arc<InheritanceCache>,
        notifier: Arc<dyn ChangeNotifier>,
        max_attempts: u32,
    ) -> Self {
        Self {
            pool,
            cache,
            notifier,
            max_attempts: max_attempts.max(1),
            workers: Mutex::new(HashMap::new()),
        }
    }

    fn nudge(&self, user_id: Uuid) {
        let mut workers = self.workers.lock().expect("workers lock poisoned");

        if let Some(tx) = workers.get(&user_id) {
            if tx.send(()).is_ok() {
                return;
            }
            // Worker died; respawn below.
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(());
        workers.insert(user_id, tx);

        let pool = self.pool.clone();
        let cache = self.cache.clone();
        let notifier = self.notifier.clone();
        let max_attempts = self.max_attempts;
        tokio::spawn(async move {
            run_user_worker(pool, cache, notifier, user_id, max_attempts, rx).await;
        });
    }

    /// Apply everything pending for a user right now. Exposed for startup
    /// recovery and tests; normal operation goes through `submit`.
    pub async fn drain_user(&self, user_id: Uuid) -> DomainResult<usize> {
        drain(
            &self.pool,
            &self.cache,
            &self.notifier,
            user_id,
            self.max_attempts,
        )
        .await
    }
}

impl DelegationQueue for DelegationProcessor {
    fn submit(&self, user_id: Uuid) {
        self.nudge(user_id);
    }
}

async fn run_user_worker(
    pool: SqlitePool,
    cache: Arc<InheritanceCache>,
    notifier: Arc<dyn ChangeNotifier>,
    user_id: Uuid,
    max_attempts: u32,
    mut rx: mpsc::UnboundedReceiver<()>,
) {
    while rx.recv().await.is_some() {
        // Coalesce queued nudges; one drain covers them all.
        while rx.try_recv().is_ok() {}

        if let Err(e) = drain(&pool, &cache, &notifier, user_id, max_attempts).await {
            tracing::warn!(user_id = %user_id, error = %e, "Delegation drain failed");
        }
    }
}

async fn drain(
    pool: &SqlitePool,
    cache: &Arc<InheritanceCache>,
    notifier: &Arc<dyn ChangeNotifier>,
    user_id: Uuid,
    max_attempts: u32,
) -> DomainResult<usize> {
    let repo = SqliteDelegationRepository::new(pool.clone()).with_user(user_id);
    let service = UnifiedContextService::for_user(
        pool.clone(),
        user_id,
        cache.clone(),
        Arc::new(NullDelegationQueue),
        notifier.clone(),
    );

    let pending = repo.pending().await?;
    let mut applied = 0;
    for delegation in pending {
        if apply_with_retry(&repo, &service, notifier, &delegation, max_attempts).await {
            applied += 1;
        }
    }
    Ok(applied)
}

async fn apply_with_retry(
    repo: &SqliteDelegationRepository,
    service: &UnifiedContextService,
    notifier: &Arc<dyn ChangeNotifier>,
    delegation: &Delegation,
    max_attempts: u32,
) -> bool {
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    };
    let mut attempts = delegation.attempts;

    loop {
        attempts += 1;
        match service.apply_delegation(delegation).await {
            Ok(_) => {
                if let Err(e) = repo.mark_processed(delegation.id).await {
                    tracing::warn!(delegation_id = %delegation.id, error = %e, "Failed to mark delegation processed");
                }
                notifier.notify(ChangeEvent::new(
                    "processed",
                    EntityKind::Delegation,
                    delegation.id,
                    delegation.user_id,
                ));
                return true;
            }
            Err(e) => {
                let terminal = attempts >= max_attempts;
                if let Err(record_err) = repo
                    .record_failure(delegation.id, attempts, &e.to_string(), terminal)
                    .await
                {
                    tracing::warn!(delegation_id = %delegation.id, error = %record_err, "Failed to record delegation failure");
                }

                if terminal {
                    tracing::error!(
                        delegation_id = %delegation.id,
                        attempts,
                        error = %e,
                        "Delegation permanently failed"
                    );
                    notifier.notify(ChangeEvent::new(
                        "delegation_failed",
                        EntityKind::Delegation,
                        delegation.id,
                        delegation.user_id,
                    ));
                    return false;
                }

                let delay = backoff
                    .next_backoff()
                    .unwrap_or_else(|| std::time::Duration::from_secs(1));
                tokio::time::sleep(delay).await;
            }
        }
    }
}
