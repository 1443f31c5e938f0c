//! Shared Schema Cache
//!
//! Process-wide, single-writer/multi-reader snapshot of the schema. Readers clone an
//! `Arc` under a read lock held only for the pointer copy; a refresh introspects with no
//! lock held and then swaps the pointer. Stale snapshots keep being served until the
//! replacement is published. Concurrent reloads coalesce: one caller introspects while
//! the others wait on a notification and reuse what it published.

use super::{SchemaDescription, SchemaIntrospector};
use crate::error::{CraftError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Anything that can hand a crafting session a schema snapshot.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn snapshot(&self) -> Result<Arc<SchemaDescription>>;
}

#[async_trait]
impl SchemaSource for Arc<SchemaDescription> {
    async fn snapshot(&self) -> Result<Arc<SchemaDescription>> {
        Ok(Arc::clone(self))
    }
}

#[derive(Clone)]
struct Snapshot {
    schema: Arc<SchemaDescription>,
    taken_at: Instant,
}

struct CacheInner {
    introspector: Arc<dyn SchemaIntrospector>,
    current: RwLock<Option<Snapshot>>,
    ttl: Option<Duration>,
    timeout: Duration,
    reloading: AtomicBool,
    reloaded: Notify,
    background_refresh: AtomicBool,
}

/// Marks the end of a reload, including one whose future was dropped mid-flight.
struct ReloadGuard<'a>(&'a CacheInner);

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.0.reloading.store(false, Ordering::Release);
        self.0.reloaded.notify_waiters();
    }
}

#[derive(Clone)]
pub struct SchemaCache {
    inner: Arc<CacheInner>,
}

impl SchemaCache {
    /// `ttl` of `None` disables age-based refresh; `timeout` bounds each introspection.
    pub fn new(
        introspector: Arc<dyn SchemaIntrospector>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                introspector,
                current: RwLock::new(None),
                ttl,
                timeout,
                reloading: AtomicBool::new(false),
                reloaded: Notify::new(),
                background_refresh: AtomicBool::new(false),
            }),
        }
    }

    /// The published snapshot, if any, without triggering introspection.
    pub fn current(&self) -> Option<Arc<SchemaDescription>> {
        self.inner.read().map(|s| s.schema)
    }

    pub fn is_stale(&self) -> bool {
        match self.inner.read() {
            Some(snapshot) => self.inner.is_expired(&snapshot),
            None => true,
        }
    }

    /// Re-introspect now and publish the result. Used on schema-change signals.
    pub async fn refresh(&self) -> Result<Arc<SchemaDescription>> {
        self.inner.reload().await
    }

    /// Re-introspect on a fixed interval until `cancel` fires. Failures keep the
    /// previous snapshot and are logged.
    pub fn spawn_refresher(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Schema refresher stopped");
                        break;
                    }
                    _ = tokio::time::sleep(every) => {
                        if let Err(e) = inner.reload().await {
                            warn!("Scheduled schema refresh failed, keeping previous snapshot: {}", e);
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SchemaSource for SchemaCache {
    async fn snapshot(&self) -> Result<Arc<SchemaDescription>> {
        let Some(snapshot) = self.inner.read() else {
            return self.inner.reload().await;
        };

        if self.inner.is_expired(&snapshot)
            && self
                .inner
                .background_refresh
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            debug!("Schema snapshot is stale, refreshing in background");
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                if let Err(e) = inner.reload().await {
                    warn!("Background schema refresh failed, keeping previous snapshot: {}", e);
                }
                inner.background_refresh.store(false, Ordering::Release);
            });
        }

        Ok(snapshot.schema)
    }
}

impl CacheInner {
    fn read(&self) -> Option<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh_since(&self, requested_at: Instant) -> Option<Snapshot> {
        self.read().filter(|snapshot| snapshot.taken_at >= requested_at)
    }

    fn is_expired(&self, snapshot: &Snapshot) -> bool {
        self.ttl
            .map(|ttl| snapshot.taken_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    fn publish(&self, schema: Arc<SchemaDescription>) {
        let snapshot = Snapshot {
            schema,
            taken_at: Instant::now(),
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    async fn reload(&self) -> Result<Arc<SchemaDescription>> {
        let requested_at = Instant::now();
        let _guard = loop {
            let reloaded = self.reloaded.notified();
            tokio::pin!(reloaded);
            reloaded.as_mut().enable();

            if self
                .reloading
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break ReloadGuard(self);
            }
            reloaded.await;

            // The other writer may have failed; then try to take over.
            if let Some(snapshot) = self.fresh_since(requested_at) {
                return Ok(snapshot.schema);
            }
        };

        if let Some(snapshot) = self.fresh_since(requested_at) {
            return Ok(snapshot.schema);
        }

        let schema = tokio::time::timeout(self.timeout, self.introspector.introspect())
            .await
            .map_err(|_| {
                CraftError::SchemaUnavailable(format!(
                    "introspection timed out after {:?}",
                    self.timeout
                ))
            })??;

        info!(
            "Published schema snapshot: {} tables, {} columns",
            schema.tables.len(),
            schema.column_count()
        );
        let schema = Arc::new(schema);
        self.publish(Arc::clone(&schema));
        Ok(schema)
    }
}
