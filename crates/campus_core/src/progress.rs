//! crates/campus_core/src/progress.rs
//!
//! The progress store: the authoritative-enough local view of per-course
//! completion, safe under optimistic local mutation plus later
//! reconciliation against the progress backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::domain::{CourseProgress, LessonKey};
use crate::ports::{PortResult, ProgressBackend};
use crate::session::SessionStore;

/// The identity inputs a completed load is memoized on. Both components must
/// change to justify a fresh fetch, unless `reload()` overrides.
type LoadKey = (Option<String>, bool);

#[derive(Default)]
struct LoadState {
    loaded_for: Option<LoadKey>,
}

/// Per-course completion state for the signed-in user, keyed by course id.
///
/// The in-memory map is owned exclusively by this store: `reload()` is the
/// single authority that may overwrite it wholesale, while the fine-grained
/// mutators only ever add.
pub struct ProgressStore {
    backend: Arc<dyn ProgressBackend>,
    session: Arc<SessionStore>,
    records: RwLock<HashMap<String, CourseProgress>>,
    // Held across the fetch so a duplicate trigger queues behind the first
    // load and then observes the memo instead of fetching again. The
    // mutators take it too, which sequences them after an in-flight
    // overwrite.
    load_state: Mutex<LoadState>,
    loaded: AtomicBool,
}

impl ProgressStore {
    pub fn new(backend: Arc<dyn ProgressBackend>, session: Arc<SessionStore>) -> Self {
        Self {
            backend,
            session,
            records: RwLock::new(HashMap::new()),
            load_state: Mutex::new(LoadState::default()),
            loaded: AtomicBool::new(false),
        }
    }

    /// True once a load has resolved for the current identity, including the
    /// unauthenticated and admin no-op paths. Navigation gates must not
    /// evaluate before this is set, or they see transient false negatives.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub async fn course(&self, course_id: &str) -> Option<CourseProgress> {
        self.records.read().await.get(course_id).cloned()
    }

    //=====================================================================================
    // Loading and reconciliation
    //=====================================================================================

    /// Fetches all progress records for the current user and replaces the
    /// in-memory map. No-op (but still resolves) when unauthenticated or
    /// when the session role is admin. Memoized on `{user, authenticated}`:
    /// safe to call repeatedly without duplicating an in-flight fetch.
    pub async fn load(&self) {
        self.load_inner(false).await;
    }

    /// Forces a fresh fetch regardless of the memo. Used after events that
    /// change server-side truth out-of-band, such as certificate issuance on
    /// exam submission.
    pub async fn reload(&self) {
        self.load_inner(true).await;
    }

    async fn load_inner(&self, force: bool) {
        let mut guard = self.load_state.lock().await;

        let user = self.session.current_user().await;
        let key: LoadKey = (user.as_ref().map(|u| u.id.clone()), user.is_some());
        if !force && guard.loaded_for.as_ref() == Some(&key) {
            return;
        }

        if guard.loaded_for.as_ref() != Some(&key) {
            // The identity changed since the last resolved load. The
            // previous user's records must never be served to the new one,
            // so drop them before fetching: if the fetch below fails, the
            // store degrades to zero progress, not to another identity's
            // data.
            self.loaded.store(false, Ordering::Release);
            self.records.write().await.clear();
            guard.loaded_for = None;
        }

        let fetch_for = match &user {
            None => None,
            Some(u) if u.is_admin() => None,
            Some(u) => Some(u.id.clone()),
        };

        let Some(user_id) = fetch_for else {
            // Admins and anonymous users have no progress; resolve anyway.
            self.records.write().await.clear();
            guard.loaded_for = Some(key);
            self.loaded.store(true, Ordering::Release);
            return;
        };

        match self.backend.fetch_all().await {
            Ok(list) => {
                debug!("Loaded {} progress records for user {}", list.len(), user_id);
                let mut records = self.records.write().await;
                records.clear();
                for record in list {
                    records.insert(record.course_id.clone(), record);
                }
                guard.loaded_for = Some(key);
            }
            Err(e) => {
                // Memo left unset so the next trigger retries the fetch. A
                // same-identity reload keeps the current snapshot; after an
                // identity change the map was already emptied above.
                warn!("Failed to load progress for user {}: {}", user_id, e);
            }
        }
        self.loaded.store(true, Ordering::Release);
    }

    //=====================================================================================
    // Optimistic local mutations
    //=====================================================================================

    /// Local-only, idempotent append of a completed lesson. Recomputes the
    /// `completed` flag from the new count. Callers invoke this only after
    /// the backend accepted the validation; a repeat (network retry,
    /// double-click) is a no-op. An unknown course id is a safe no-op as
    /// well, since the record may not have loaded yet.
    pub async fn record_lesson_completion(&self, lesson: &LessonKey) {
        // Sequenced behind any in-flight load: the fetch's wholesale
        // overwrite lands first and this addition applies on top, instead
        // of being wiped by a stale snapshot.
        let _load = self.load_state.lock().await;
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&lesson.course_id) else {
            return;
        };
        if record.insert_lesson(lesson.to_string()) {
            debug!(
                "Lesson {} recorded, course {} now {}/{}",
                lesson,
                lesson.course_id,
                record.completed_lesson_keys.len(),
                record.total_lessons
            );
        }
    }

    /// Local-only, idempotent append of a passed level. The approved set is
    /// monotonically non-decreasing across every store operation.
    pub async fn record_level_approval(&self, course_id: &str, level: u32) {
        // Same sequencing as lesson completion.
        let _load = self.load_state.lock().await;
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(course_id) else {
            return;
        };
        if record.insert_approved_level(level) {
            debug!("Level {} of course {} approved", level, course_id);
        }
    }

    //=====================================================================================
    // Lesson completion workflow
    //=====================================================================================

    /// Validates one lesson with the backend, then applies the optimistic
    /// local update. Backend rejection leaves local state untouched.
    pub async fn complete_lesson(&self, lesson: &LessonKey) -> PortResult<()> {
        self.backend
            .validate_lesson(&lesson.course_id, lesson)
            .await?;
        self.record_lesson_completion(lesson).await;
        Ok(())
    }
}
