use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::game::rules::RulesEngine;
use crate::game::session::{Seats, Session, StoredSession};
use crate::{HubError, HubResult};

pub type SessionHandle<P> = Arc<Mutex<Session<P>>>;

/// Snapshot file contents: session id -> stored session.
pub type StoredSessions = BTreeMap<String, StoredSession>;

/// The JSON snapshot on disk. Writes go to a sibling temporary file which is
/// synced and renamed over the snapshot, so a crash mid-write leaves the
/// previous snapshot intact.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub async fn read(&self) -> HubResult<Option<StoredSessions>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            HubError::persistence(format!(
                "malformed snapshot {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub async fn write(&self, sessions: &StoredSessions) -> HubResult<()> {
        let data = serde_json::to_vec_pretty(sessions).map_err(HubError::persistence)?;
        let staging = self.staging_path();

        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&staging, &self.path).await?;
        self.sync_parent().await
    }

    /// Makes the rename itself durable by syncing the containing directory.
    #[cfg(unix)]
    async fn sync_parent(&self) -> HubResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::File::open(parent).await?.sync_all().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn sync_parent(&self) -> HubResult<()> {
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "sessions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Owns every game session and keeps the snapshot file in step with them.
///
/// Each session sits behind its own lock, which serializes moves within a
/// game. The snapshot lock is only held while the file is rewritten, and the
/// store keeps the last committed projection of every session so a commit
/// never needs to lock other sessions.
pub struct SessionStore<E: RulesEngine> {
    engine: Arc<E>,
    sessions: DashMap<String, SessionHandle<E::Position>>,
    committed: Mutex<StoredSessions>,
    file: SnapshotFile,
}

impl<E: RulesEngine> SessionStore<E> {
    /// Rebuilds the store from the snapshot. A missing file yields an empty
    /// store; an unreadable file or record is an error the caller must not
    /// ignore.
    pub async fn load(engine: Arc<E>, file: SnapshotFile) -> HubResult<Self> {
        let stored = file.read().await?.unwrap_or_default();

        let sessions = DashMap::new();
        for (id, entry) in &stored {
            let position =
                engine
                    .deserialize(&entry.record)
                    .map_err(|e| HubError::InvalidPosition {
                        reason: format!("session '{}' in snapshot: {}", id, e),
                    })?;
            let session = Session {
                id: id.clone(),
                white: entry.white.clone(),
                black: entry.black.clone(),
                position,
            };
            sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        }

        tracing::info!(
            sessions = sessions.len(),
            path = %file.path().display(),
            "Session store loaded"
        );

        Ok(Self {
            engine,
            sessions,
            committed: Mutex::new(stored),
            file,
        })
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn get(&self, id: &str) -> HubResult<SessionHandle<E::Position>> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| HubError::SessionNotFound {
                session_id: id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Creates a session at the engine's starting position.
    pub async fn create(&self, seats: Seats) -> HubResult<String> {
        let position = self.engine.starting_position();
        self.create_with(position, seats).await
    }

    /// Creates a session at `position`. It only becomes visible once the
    /// snapshot including it has been written.
    pub async fn create_with(&self, position: E::Position, seats: Seats) -> HubResult<String> {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), seats, position);

        self.commit(&session).await?;
        tracing::info!(
            session_id = %id,
            white = %session.white,
            black = %session.black,
            "Session created"
        );
        self.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        Ok(id)
    }

    /// Persists the full store with `session` as it currently is.
    pub async fn commit(&self, session: &Session<E::Position>) -> HubResult<()> {
        let entry = self.project(session, &session.position);
        self.write_entry(&session.id, entry).await
    }

    /// Persists the store with `session` moved to `next`, then installs `next`
    /// in memory. On failure the session keeps its old position.
    pub async fn advance(
        &self,
        session: &mut Session<E::Position>,
        next: E::Position,
    ) -> HubResult<()> {
        let entry = self.project(session, &next);
        self.write_entry(&session.id, entry).await?;
        session.position = next;
        Ok(())
    }

    pub async fn history(&self, id: &str) -> HubResult<Vec<String>> {
        let handle = self.get(id)?;
        let session = handle.lock().await;
        Ok(self.engine.history(&session.position))
    }

    fn project(&self, session: &Session<E::Position>, position: &E::Position) -> StoredSession {
        StoredSession {
            record: self.engine.serialize(position),
            white: session.white.clone(),
            black: session.black.clone(),
        }
    }

    async fn write_entry(&self, id: &str, entry: StoredSession) -> HubResult<()> {
        let mut committed = self.committed.lock().await;
        let mut next = committed.clone();
        next.insert(id.to_string(), entry);

        if let Err(e) = self.file.write(&next).await {
            tracing::error!(session_id = %id, error = %e, "Snapshot write failed");
            return Err(e);
        }
        *committed = next;
        tracing::debug!(session_id = %id, sessions = committed.len(), "Snapshot written");
        Ok(())
    }
}
