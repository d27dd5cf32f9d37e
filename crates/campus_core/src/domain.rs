//! crates/campus_core/src/domain.rs
//!
//! Defines the pure, core data structures for the platform client.
//! These structs are independent of any backend wire format; the adapters
//! in the `app` service translate to and from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role assigned to an account by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

/// The state of a paid subscription as last reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

/// A subscription snapshot. Only refreshed on explicit events (login,
/// payment return, manual profile refresh), so it can lag server truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Represents the signed-in account, as returned by the auth backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub subscription: Option<Subscription>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Derived on every read from the subscription snapshot, never cached.
    pub fn is_premium(&self) -> bool {
        self.subscription
            .as_ref()
            .map(|s| s.status == SubscriptionStatus::Active)
            .unwrap_or(false)
    }
}

/// The `{user, token}` pair persisted in durable client storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub user: User,
    pub token: String,
}

//=========================================================================================
// Course catalog
//=========================================================================================
// The catalog is an external, read-only document store. The client indexes
// into it by level number and lesson index but never validates or mutates it.

/// A single unit of content within a level.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub title: String,
    pub video_url: Option<String>,
}

/// An ordered stage within a course: lessons followed by a gating exam.
#[derive(Debug, Clone)]
pub struct CourseLevel {
    pub number: u32,
    pub name: String,
    pub lessons: Vec<Lesson>,
}

/// A course definition fetched from the catalog.
#[derive(Debug, Clone)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub levels: Vec<CourseLevel>,
}

impl Course {
    pub fn level(&self, number: u32) -> Option<&CourseLevel> {
        self.levels.iter().find(|l| l.number == number)
    }

    pub fn total_lessons(&self) -> usize {
        self.levels.iter().map(|l| l.lessons.len()).sum()
    }
}

//=========================================================================================
// Lesson keys
//=========================================================================================

/// Error raised when a lesson key token cannot be parsed back into its
/// components. This indicates a defect, not a recoverable condition.
#[derive(Debug, thiserror::Error)]
#[error("Malformed lesson key: {0}")]
pub struct LessonKeyError(pub String);

/// Composite identifier of a lesson: `{course, level, index}`.
///
/// Serialized as a single `course:level:index` token. Course ids are opaque
/// document-store ids and never contain `:`, which keeps the token
/// unambiguous and uniquely derived from the triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonKey {
    pub course_id: String,
    pub level: u32,
    pub index: u32,
}

impl LessonKey {
    pub fn new(course_id: impl Into<String>, level: u32, index: u32) -> Self {
        Self {
            course_id: course_id.into(),
            level,
            index,
        }
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.course_id, self.level, self.index)
    }
}

impl FromStr for LessonKey {
    type Err = LessonKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let index = parts.next().and_then(|p| p.parse::<u32>().ok());
        let level = parts.next().and_then(|p| p.parse::<u32>().ok());
        let course_id = parts.next().filter(|p| !p.is_empty());
        match (course_id, level, index) {
            (Some(course_id), Some(level), Some(index)) => Ok(Self {
                course_id: course_id.to_string(),
                level,
                index,
            }),
            _ => Err(LessonKeyError(s.to_string())),
        }
    }
}

//=========================================================================================
// Progress
//=========================================================================================

/// The per-course completion record for the signed-in user.
///
/// Normalized once at the data-access boundary so downstream logic performs
/// one canonical check instead of several defensive equivalents.
#[derive(Debug, Clone, Default)]
pub struct CourseProgress {
    pub course_id: String,
    /// Serialized lesson key tokens, in completion order. Membership is the
    /// meaningful operation; the chronological order is informative only.
    pub completed_lesson_keys: Vec<String>,
    pub approved_levels: Vec<u32>,
    pub total_lessons: usize,
    pub completed: bool,
}

impl CourseProgress {
    pub fn is_lesson_completed(&self, key: &LessonKey) -> bool {
        let token = key.to_string();
        self.completed_lesson_keys.iter().any(|k| *k == token)
    }

    pub fn is_level_approved(&self, level: u32) -> bool {
        self.approved_levels.contains(&level)
    }

    /// Appends a lesson key if absent and recomputes `completed`.
    /// Returns whether the set actually grew. Lesson keys are never removed.
    pub(crate) fn insert_lesson(&mut self, token: String) -> bool {
        if self.completed_lesson_keys.contains(&token) {
            return false;
        }
        self.completed_lesson_keys.push(token);
        self.completed = self.completed_lesson_keys.len() >= self.total_lessons;
        true
    }

    /// Appends a level number if absent. The approved set only ever grows.
    pub(crate) fn insert_approved_level(&mut self, level: u32) -> bool {
        if self.approved_levels.contains(&level) {
            return false;
        }
        self.approved_levels.push(level);
        true
    }
}

//=========================================================================================
// Exams
//=========================================================================================

/// One question of a level exam. The correct option index never reaches the
/// client; grading is entirely backend-side.
#[derive(Debug, Clone)]
pub struct ExamQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// The selected option for one question, as sent on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAnswer {
    pub question_id: String,
    pub option_index: usize,
}

/// The backend's verdict on a submitted attempt. `approved` and
/// `percentage` are authoritative remote decisions, never derived locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamResult {
    pub approved: bool,
    pub percentage: f64,
    pub course_completed: bool,
}

/// The answer to "may this user take this level's exam", with the
/// server-supplied reason when denied.
#[derive(Debug, Clone)]
pub struct LevelAccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}
