//! crates/campus_core/src/gate.rs
//!
//! The course navigation gate: decides, for a loaded course, which levels
//! and lessons are navigable. Level 1 is always open; every other level is
//! an authoritative remote decision, because the server can encode rules
//! (such as subscription gating) invisible to the client.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::domain::{Course, CourseProgress, LessonKey};
use crate::ports::ExamBackend;

/// Navigation state of one lesson row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonAccess {
    pub index: u32,
    pub completed: bool,
}

/// Navigation state of one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAccess {
    pub number: u32,
    pub unlocked: bool,
    /// The exam entry point is offered only while the level is unlocked and
    /// not yet approved. Direct navigation to an already-passed exam is the
    /// exam component's own concern, not prevented here.
    pub exam_available: bool,
    pub lessons: Vec<LessonAccess>,
}

/// An immutable per-course snapshot, produced only after every per-level
/// check has settled so consumers never observe a partial level list.
#[derive(Debug, Clone)]
pub struct CourseAccess {
    pub course_id: String,
    pub levels: Vec<LevelAccess>,
}

impl CourseAccess {
    pub fn level(&self, number: u32) -> Option<&LevelAccess> {
        self.levels.iter().find(|l| l.number == number)
    }
}

pub struct CourseNavigationGate {
    exams: Arc<dyn ExamBackend>,
}

impl CourseNavigationGate {
    pub fn new(exams: Arc<dyn ExamBackend>) -> Self {
        Self { exams }
    }

    /// Computes the navigation snapshot for one course.
    ///
    /// All remote per-level checks are issued together, so total latency is
    /// bounded by the slowest single check. A failed check resolves to
    /// locked, never unlocked. Callers must wait for the progress store to
    /// resolve before evaluating, or completed/approved flags come up as
    /// transient false negatives.
    pub async fn evaluate(
        &self,
        course: &Course,
        progress: Option<&CourseProgress>,
    ) -> CourseAccess {
        let checks = course.levels.iter().map(|level| {
            let exams = self.exams.clone();
            let course_id = course.id.clone();
            let number = level.number;
            async move {
                if number == 1 {
                    return (number, true);
                }
                match exams.can_access_level(&course_id, number).await {
                    Ok(decision) => (number, decision.allowed),
                    Err(e) => {
                        // Fail closed: an unreachable authority never
                        // unlocks content.
                        warn!(
                            "Access check for course {} level {} failed ({}), treating as locked",
                            course_id, number, e
                        );
                        (number, false)
                    }
                }
            }
        });
        let unlocked: HashMap<u32, bool> = join_all(checks).await.into_iter().collect();

        let levels = course
            .levels
            .iter()
            .map(|level| {
                let is_unlocked = unlocked.get(&level.number).copied().unwrap_or(false);
                let approved = progress
                    .map(|p| p.is_level_approved(level.number))
                    .unwrap_or(false);
                let lessons = (0..level.lessons.len() as u32)
                    .map(|index| LessonAccess {
                        index,
                        completed: progress
                            .map(|p| {
                                p.is_lesson_completed(&LessonKey::new(
                                    course.id.clone(),
                                    level.number,
                                    index,
                                ))
                            })
                            .unwrap_or(false),
                    })
                    .collect();
                LevelAccess {
                    number: level.number,
                    unlocked: is_unlocked,
                    exam_available: is_unlocked && !approved,
                    lessons,
                }
            })
            .collect();

        CourseAccess {
            course_id: course.id.clone(),
            levels,
        }
    }
}
