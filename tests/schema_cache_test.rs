mod common;

use async_trait::async_trait;
use common::{config, ScriptedLlm};
use nl2sql_crafter::schema::{
    JsonSchemaFile, SchemaCache, SchemaDescription, SchemaIntrospector, SchemaSource,
    TableDescriptor,
};
use nl2sql_crafter::{CraftError, QueryCrafter, SessionStatus};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Introspector whose table list grows by one on every call.
struct Growing {
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Duration,
}

impl Growing {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay,
        })
    }
}

#[async_trait]
impl SchemaIntrospector for Growing {
    async fn introspect(&self) -> nl2sql_crafter::Result<SchemaDescription> {
        tokio::time::sleep(self.delay).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(CraftError::SchemaUnavailable("connection refused".to_string()));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let tables = (1..=n)
            .map(|i| TableDescriptor::new(format!("t{}", i)).column("id", "int", false))
            .collect();
        Ok(SchemaDescription::new(tables))
    }
}

#[tokio::test]
async fn test_snapshot_is_loaded_once_and_shared() {
    let introspector = Growing::new(Duration::ZERO);
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));

    let a = cache.snapshot().await.unwrap();
    let b = cache.snapshot().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(introspector.calls.load(Ordering::SeqCst), 1);
    assert!(!cache.is_stale());
}

#[tokio::test]
async fn test_explicit_refresh_swaps_snapshot() {
    let introspector = Growing::new(Duration::ZERO);
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));

    let before = cache.snapshot().await.unwrap();
    let after = cache.refresh().await.unwrap();

    // Readers holding the old snapshot keep it intact.
    assert_eq!(before.tables.len(), 1);
    assert_eq!(after.tables.len(), 2);
    assert_eq!(cache.current().unwrap().tables.len(), 2);
}

#[tokio::test]
async fn test_stale_snapshot_served_while_refreshing() {
    let introspector = Growing::new(Duration::from_millis(20));
    let cache = SchemaCache::new(introspector.clone(), Some(Duration::from_millis(10)), Duration::from_secs(1));

    let first = cache.snapshot().await.unwrap();
    tokio::time::sleep(Duration::from_millis(15)).await;
    assert!(cache.is_stale());

    let stale = cache.snapshot().await.unwrap();
    assert!(Arc::ptr_eq(&first, &stale));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.current().unwrap().tables.len(), 2);
}

#[tokio::test]
async fn test_concurrent_refreshes_are_serialized() {
    let introspector = Growing::new(Duration::from_millis(20));
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));

    let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
    let (a, b) = (a.unwrap(), b.unwrap());
    // The second caller sees the snapshot published while it waited.
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(introspector.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_readers_not_blocked_by_inflight_refresh() {
    let introspector = Growing::new(Duration::from_millis(200));
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));
    cache.refresh().await.unwrap();

    let refreshing = cache.clone();
    let refresh = tokio::spawn(async move { refreshing.refresh().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let read = tokio::time::timeout(Duration::from_millis(50), cache.snapshot()).await;
    assert_eq!(read.unwrap().unwrap().tables.len(), 1);
    assert_eq!(refresh.await.unwrap().unwrap().tables.len(), 2);
}

#[tokio::test]
async fn test_abandoned_refresh_does_not_wedge_cache() {
    let introspector = Growing::new(Duration::from_millis(100));
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));

    let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.refresh()).await;
    assert!(abandoned.is_err());

    let schema = tokio::time::timeout(Duration::from_millis(500), cache.refresh())
        .await
        .expect("refresh after an abandoned one must proceed")
        .unwrap();
    assert_eq!(schema.tables.len(), 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let introspector = Growing::new(Duration::ZERO);
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));
    cache.snapshot().await.unwrap();

    introspector.fail.store(true, Ordering::SeqCst);
    assert!(matches!(cache.refresh().await, Err(CraftError::SchemaUnavailable(_))));
    assert_eq!(cache.current().unwrap().tables.len(), 1);
}

#[tokio::test]
async fn test_introspection_timeout() {
    let introspector = Growing::new(Duration::from_millis(200));
    let cache = SchemaCache::new(introspector, None, Duration::from_millis(20));

    assert!(matches!(cache.snapshot().await, Err(CraftError::SchemaUnavailable(_))));
}

#[tokio::test]
async fn test_background_refresher_stops_on_cancel() {
    let introspector = Growing::new(Duration::ZERO);
    let cache = SchemaCache::new(introspector.clone(), None, Duration::from_secs(1));
    cache.snapshot().await.unwrap();

    let cancel = CancellationToken::new();
    let handle = cache.spawn_refresher(Duration::from_millis(10), cancel.clone());
    tokio::time::sleep(Duration::from_millis(55)).await;
    cancel.cancel();
    handle.await.unwrap();

    let calls = introspector.calls.load(Ordering::SeqCst);
    assert!(calls >= 3, "refresher ran {} times", calls);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(introspector.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn test_schema_unavailable_is_fatal_to_craft() {
    let introspector = Growing::new(Duration::ZERO);
    introspector.fail.store(true, Ordering::SeqCst);
    let cache = SchemaCache::new(introspector, None, Duration::from_secs(1));

    let llm = ScriptedLlm::replying(&["SELECT 1"]);
    let crafter = QueryCrafter::new(config(3), llm.clone());

    let result = crafter.craft("anything", &cache).await;
    assert!(matches!(result, Err(CraftError::SchemaUnavailable(_))));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_craft_against_schema_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"tables": [{{"name": "users", "columns": [{{"name": "id", "type": "int", "nullable": false}}, {{"name": "name", "type": "text"}}]}}]}}"#
    )
    .unwrap();

    let cache = SchemaCache::new(Arc::new(JsonSchemaFile::new(file.path())), None, Duration::from_secs(1));
    let llm = ScriptedLlm::replying(&["```sql\nSELECT name FROM users;\n```"]);
    let crafter = QueryCrafter::new(config(3), llm);

    let result = crafter.craft("show all user names", &cache).await.unwrap();
    assert_eq!(result.status, SessionStatus::Succeeded);
    assert_eq!(result.sql.as_deref(), Some("SELECT name FROM users;"));
}
