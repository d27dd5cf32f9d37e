pub mod domain;
pub mod exam;
pub mod gate;
pub mod ports;
pub mod progress;
pub mod session;

#[cfg(test)]
mod testutil;

pub use domain::{
    Course, CourseLevel, CourseProgress, ExamAnswer, ExamQuestion, ExamResult, Lesson, LessonKey,
    LessonKeyError, LevelAccessDecision, Role, StoredSession, Subscription, SubscriptionStatus,
    User,
};
pub use exam::{ExamError, ExamPhase, ExamSession};
pub use gate::{CourseAccess, CourseNavigationGate, LessonAccess, LevelAccess};
pub use ports::{
    AuthBackend, CourseCatalog, CredentialStore, ExamBackend, PortError, PortResult,
    ProgressBackend,
};
pub use progress::ProgressStore;
pub use session::{SessionError, SessionStore, TokenSlot};
