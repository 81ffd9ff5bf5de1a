use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::capabilities::{SaveKind, StoreError};
use crate::model::ProfileSnapshot;

/// Where profiles are loaded from and persisted to.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load(&self) -> Result<ProfileSnapshot, StoreError>;
    async fn save(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError>;
    async fn save_draft(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError>;

    async fn persist(&self, kind: SaveKind, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        match kind {
            SaveKind::Publish => self.save(snapshot).await,
            SaveKind::Draft => self.save_draft(snapshot).await,
        }
    }
}

// ============================================================================
// In-memory store with simulated latency and failure injection
// ============================================================================

#[derive(Debug, Default)]
struct StoredProfiles {
    published: ProfileSnapshot,
    draft: Option<ProfileSnapshot>,
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<StoredProfiles>,
    latency: Duration,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    save_calls: AtomicUsize,
    draft_calls: AtomicUsize,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new(initial: ProfileSnapshot) -> Self {
        Self {
            profiles: RwLock::new(StoredProfiles {
                published: initial,
                draft: None,
            }),
            ..Self::default()
        }
    }

    /// Every call sleeps this long first, like a slow backend.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn draft_calls(&self) -> usize {
        self.draft_calls.load(Ordering::SeqCst)
    }

    pub async fn published(&self) -> ProfileSnapshot {
        self.profiles.read().await.published.clone()
    }

    pub async fn draft(&self) -> Option<ProfileSnapshot> {
        self.profiles.read().await.draft.clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self) -> Result<ProfileSnapshot, StoreError> {
        self.simulate_latency().await;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::LoadFailed("Injected failure".into()));
        }
        Ok(self.profiles.read().await.published.clone())
    }

    async fn save(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::SaveFailed("Injected failure".into()));
        }
        let mut profiles = self.profiles.write().await;
        profiles.published = snapshot.clone();
        profiles.draft = None;
        Ok(())
    }

    async fn save_draft(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.draft_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::SaveFailed("Injected failure".into()));
        }
        self.profiles.write().await.draft = Some(snapshot.clone());
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Keeps the published profile and the draft as two JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    profile_path: PathBuf,
    draft_path: PathBuf,
}

impl JsonFileProfileStore {
    /// Stores `profile.json` and `profile.draft.json` under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            profile_path: dir.join("profile.json"),
            draft_path: dir.join("profile.draft.json"),
        }
    }

    #[must_use]
    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }

    #[must_use]
    pub fn draft_path(&self) -> &Path {
        &self.draft_path
    }

    fn read_sync(path: &Path) -> Result<ProfileSnapshot, StoreError> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    // Write-then-rename so a crash never leaves a half-written profile.
    fn write_sync(path: &Path, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    // The published file is already in place; a leftover draft is only noise.
    fn discard_draft_sync(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!("stale draft removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %path.display(), "stale draft could not be removed"),
        }
    }
}

#[async_trait]
impl ProfileStore for JsonFileProfileStore {
    #[instrument(skip(self), fields(path = %self.profile_path.display()))]
    async fn load(&self) -> Result<ProfileSnapshot, StoreError> {
        let path = self.profile_path.clone();
        tokio::task::spawn_blocking(move || Self::read_sync(&path))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    /// A published save supersedes any draft.
    #[instrument(skip(self, snapshot), fields(path = %self.profile_path.display()))]
    async fn save(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        let profile_path = self.profile_path.clone();
        let draft_path = self.draft_path.clone();
        let snapshot = snapshot.clone();
        tokio::task::spawn_blocking(move || {
            Self::write_sync(&profile_path, &snapshot)?;
            Self::discard_draft_sync(&draft_path);
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?
    }

    #[instrument(skip(self, snapshot), fields(path = %self.draft_path.display()))]
    async fn save_draft(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        let path = self.draft_path.clone();
        let snapshot = snapshot.clone();
        tokio::task::spawn_blocking(move || Self::write_sync(&path, &snapshot))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ProfileSnapshot {
        let mut s = ProfileSnapshot::default();
        s.identity.name = name.into();
        s
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_and_counts() {
        let store = InMemoryProfileStore::new(named("Original"));
        assert_eq!(store.load().await.unwrap().identity.name, "Original");

        store.save(&named("Updated")).await.unwrap();
        store.persist(SaveKind::Draft, &named("Draft")).await.unwrap();

        assert_eq!(store.load().await.unwrap().identity.name, "Updated");
        assert_eq!(store.draft().await.unwrap().identity.name, "Draft");
        assert_eq!(store.save_calls(), 1);
        assert_eq!(store.draft_calls(), 1);
    }

    #[tokio::test]
    async fn injected_failures_leave_data_untouched() {
        let store = InMemoryProfileStore::new(named("Original"));
        store.set_fail_saves(true);

        assert!(matches!(store.save(&named("Lost")).await, Err(StoreError::SaveFailed(_))));
        assert!(store.save_draft(&named("Lost")).await.is_err());

        store.set_fail_saves(false);
        assert_eq!(store.published().await.identity.name, "Original");
        assert!(store.draft().await.is_none());
    }

    #[tokio::test]
    async fn file_store_missing_profile_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::in_dir(dir.path());
        assert_eq!(store.load().await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn file_store_save_replaces_draft() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::in_dir(dir.path());

        store.save_draft(&named("Half done")).await.unwrap();
        assert!(store.draft_path().exists());

        store.save(&named("Done")).await.unwrap();
        assert!(!store.draft_path().exists());
        assert_eq!(store.load().await.unwrap().identity.name, "Done");
    }

    #[tokio::test]
    async fn file_store_save_succeeds_when_draft_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::in_dir(dir.path());
        // remove_file refuses directories, so cleanup fails with something
        // other than NotFound.
        std::fs::create_dir(store.draft_path()).unwrap();

        store.save(&named("Done")).await.unwrap();

        assert_eq!(store.load().await.unwrap().identity.name, "Done");
        assert!(store.draft_path().is_dir());
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::in_dir(dir.path());
        std::fs::write(store.profile_path(), b"{not json").unwrap();

        assert!(matches!(store.load().await, Err(StoreError::Serialization(_))));
    }
}
