//! crates/campus_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the client's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete HTTP backends and of the durable
//! client storage.

use async_trait::async_trait;

use crate::domain::{
    Course, CourseProgress, ExamAnswer, ExamQuestion, ExamResult, LessonKey,
    LevelAccessDecision, StoredSession, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network,
/// backend rejections, storage).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The persisted payload exists but cannot be decoded. The session store
    /// treats this as a logged-out state, never as a fatal fault.
    #[error("Malformed stored data: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The authentication and profile backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a bearer token and the account record.
    async fn login(&self, email: &str, password: &str) -> PortResult<(String, User)>;

    /// Creates an account. Returns the backend's confirmation message.
    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<String>;

    /// Re-fetches the authoritative profile for the current token. Required
    /// after external events such as a completed payment.
    async fn fetch_profile(&self) -> PortResult<User>;

    /// Updates the display name and returns the refreshed record.
    async fn update_name(&self, name: &str) -> PortResult<User>;
}

/// The progress backend: the server-side source of truth for completion.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    /// Fetches every progress record for the current user in one call.
    async fn fetch_all(&self) -> PortResult<Vec<CourseProgress>>;

    /// Marks one lesson as validated. Idempotent from the caller's
    /// perspective: repeating an already-validated lesson must not error.
    async fn validate_lesson(&self, course_id: &str, lesson: &LessonKey) -> PortResult<()>;
}

/// The examination backend.
#[async_trait]
pub trait ExamBackend: Send + Sync {
    /// The authoritative per-level access decision. The server knows all
    /// prerequisite completion plus rules invisible to the client, such as
    /// subscription gating.
    async fn can_access_level(
        &self,
        course_id: &str,
        level: u32,
    ) -> PortResult<LevelAccessDecision>;

    /// Fetches the question set for one level's exam.
    async fn fetch_questions(&self, course_id: &str, level: u32)
        -> PortResult<Vec<ExamQuestion>>;

    /// Submits one full answer set and returns the backend's verdict.
    async fn submit(
        &self,
        course_id: &str,
        level: u32,
        answers: &[ExamAnswer],
    ) -> PortResult<ExamResult>;
}

/// The read-only course catalog (an external document store).
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn get_course(&self, course_id: &str) -> PortResult<Course>;
}

/// Durable key-value persistence for the `{user, token}` pair. Survives
/// restarts; cleared on logout.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` means nothing persisted; `Err(Malformed)` means a payload
    /// exists but cannot be decoded.
    async fn load(&self) -> PortResult<Option<StoredSession>>;

    async fn save(&self, session: &StoredSession) -> PortResult<()>;

    /// Idempotent: clearing an already-empty store succeeds.
    async fn clear(&self) -> PortResult<()>;
}
