//! crates/campus_core/src/exam.rs
//!
//! The exam session state machine. One `ExamSession` manages one attempt at
//! one level's exam: load, answer, submit, result. Attempts are ephemeral
//! and never persisted across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{ExamAnswer, ExamQuestion, ExamResult};
use crate::ports::{ExamBackend, PortError};
use crate::progress::ProgressStore;

/// The phase of the current attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamPhase {
    Loading,
    /// The backend denied access; terminal for this attempt. The user must
    /// navigate away and return, which constructs a fresh session.
    Blocked { reason: String },
    /// The exam has no questions (or could not be fetched).
    Unavailable,
    Ready,
    Submitting,
    Finished(ExamResult),
}

#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    /// Rejected locally, before any network call is issued.
    #[error("{missing} question(s) still unanswered")]
    Unanswered { missing: usize },
    #[error("Unknown question id: {0}")]
    UnknownQuestion(String),
    #[error("Option {index} does not exist for question {question_id}")]
    InvalidOption { question_id: String, index: usize },
    #[error("Operation not valid in phase {0:?}")]
    InvalidPhase(ExamPhase),
    #[error("Exam backend error: {0}")]
    Backend(#[from] PortError),
}

struct AttemptState {
    phase: ExamPhase,
    questions: Vec<ExamQuestion>,
    answers: HashMap<String, usize>,
}

/// Drives one exam attempt against the exam backend, reporting approvals
/// into the progress store.
pub struct ExamSession {
    course_id: String,
    level: u32,
    backend: Arc<dyn ExamBackend>,
    progress: Arc<ProgressStore>,
    state: RwLock<AttemptState>,
}

impl ExamSession {
    pub fn new(
        course_id: impl Into<String>,
        level: u32,
        backend: Arc<dyn ExamBackend>,
        progress: Arc<ProgressStore>,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            level,
            backend,
            progress,
            state: RwLock::new(AttemptState {
                phase: ExamPhase::Loading,
                questions: Vec::new(),
                answers: HashMap::new(),
            }),
        }
    }

    pub async fn phase(&self) -> ExamPhase {
        self.state.read().await.phase.clone()
    }

    /// The shuffled question order of the current attempt.
    pub async fn questions(&self) -> Vec<ExamQuestion> {
        self.state.read().await.questions.clone()
    }

    pub async fn selected_answer(&self, question_id: &str) -> Option<usize> {
        self.state.read().await.answers.get(question_id).copied()
    }

    /// True once every question has exactly one selection. Presentation uses
    /// this to disable the submit action; `submit()` enforces it again.
    pub async fn all_answered(&self) -> bool {
        let state = self.state.read().await;
        !state.questions.is_empty() && state.answers.len() >= state.questions.len()
    }

    //=====================================================================================
    // Loading
    //=====================================================================================

    /// Runs the Loading phase: the authoritative access check first, then
    /// the question fetch, then a fresh uniform shuffle. Transport failures
    /// land in the fail-closed phase for the step that failed.
    ///
    /// Rejected while a submission is in flight (its verdict must land in
    /// `Finished` exactly once) and from `Blocked`, which is terminal for
    /// this session.
    pub async fn start(&self) -> Result<ExamPhase, ExamError> {
        {
            let mut state = self.state.write().await;
            if matches!(
                state.phase,
                ExamPhase::Submitting | ExamPhase::Blocked { .. }
            ) {
                return Err(ExamError::InvalidPhase(state.phase.clone()));
            }
            state.phase = ExamPhase::Loading;
            state.questions.clear();
            state.answers.clear();
        }

        let decision = match self.backend.can_access_level(&self.course_id, self.level).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    "Exam access check failed for course {} level {}: {}",
                    self.course_id, self.level, e
                );
                let phase = ExamPhase::Blocked {
                    reason: "Access could not be verified".to_string(),
                };
                self.state.write().await.phase = phase.clone();
                return Ok(phase);
            }
        };
        if !decision.allowed {
            let phase = ExamPhase::Blocked {
                reason: decision
                    .reason
                    .unwrap_or_else(|| "Access denied".to_string()),
            };
            self.state.write().await.phase = phase.clone();
            return Ok(phase);
        }

        let mut questions = match self
            .backend
            .fetch_questions(&self.course_id, self.level)
            .await
        {
            Ok(questions) => questions,
            Err(e) => {
                warn!(
                    "Question fetch failed for course {} level {}: {}",
                    self.course_id, self.level, e
                );
                self.state.write().await.phase = ExamPhase::Unavailable;
                return Ok(ExamPhase::Unavailable);
            }
        };
        if questions.is_empty() {
            self.state.write().await.phase = ExamPhase::Unavailable;
            return Ok(ExamPhase::Unavailable);
        }

        // A fresh permutation per load, so retries see a new order.
        questions.shuffle(&mut rand::thread_rng());

        let mut state = self.state.write().await;
        state.questions = questions;
        state.phase = ExamPhase::Ready;
        Ok(ExamPhase::Ready)
    }

    //=====================================================================================
    // Answering and submission
    //=====================================================================================

    /// Records the selection for one question, overwriting any prior choice.
    /// Last write wins; no history is kept.
    pub async fn select_answer(
        &self,
        question_id: &str,
        option_index: usize,
    ) -> Result<(), ExamError> {
        let mut state = self.state.write().await;
        if state.phase != ExamPhase::Ready {
            return Err(ExamError::InvalidPhase(state.phase.clone()));
        }
        let question = state
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ExamError::UnknownQuestion(question_id.to_string()))?;
        if option_index >= question.options.len() {
            return Err(ExamError::InvalidOption {
                question_id: question_id.to_string(),
                index: option_index,
            });
        }
        state.answers.insert(question_id.to_string(), option_index);
        Ok(())
    }

    /// Submits the full answer set. Incomplete attempts are rejected locally
    /// with no network call. On a transport failure the session returns to
    /// `Ready` with answers preserved; this is the one retry-safe path
    /// distinct from `retry()`, which discards them.
    pub async fn submit(&self) -> Result<ExamResult, ExamError> {
        let answers: Vec<ExamAnswer> = {
            let mut state = self.state.write().await;
            if state.phase != ExamPhase::Ready {
                return Err(ExamError::InvalidPhase(state.phase.clone()));
            }
            let missing = state
                .questions
                .iter()
                .filter(|q| !state.answers.contains_key(&q.id))
                .count();
            if missing > 0 {
                return Err(ExamError::Unanswered { missing });
            }
            state.phase = ExamPhase::Submitting;
            state
                .questions
                .iter()
                .map(|q| ExamAnswer {
                    question_id: q.id.clone(),
                    option_index: state.answers[&q.id],
                })
                .collect()
        };

        let result = match self
            .backend
            .submit(&self.course_id, self.level, &answers)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "Exam submission failed for course {} level {}: {}",
                    self.course_id, self.level, e
                );
                self.state.write().await.phase = ExamPhase::Ready;
                return Err(ExamError::Backend(e));
            }
        };

        info!(
            "Exam for course {} level {} graded: approved={} percentage={}",
            self.course_id, self.level, result.approved, result.percentage
        );
        if result.approved {
            self.progress
                .record_level_approval(&self.course_id, self.level)
                .await;
        }
        // Server-side side effects (certificates, course completion) can
        // only be picked up by a full refetch.
        self.progress.reload().await;

        self.state.write().await.phase = ExamPhase::Finished(result.clone());
        Ok(result)
    }

    /// Starts a new attempt after a result, discarding prior answers and
    /// reshuffling. Only valid from the `Finished` phase.
    pub async fn retry(&self) -> Result<ExamPhase, ExamError> {
        {
            let state = self.state.read().await;
            if !matches!(state.phase, ExamPhase::Finished(_)) {
                return Err(ExamError::InvalidPhase(state.phase.clone()));
            }
        }
        self.start().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourseProgress, LessonKey, LevelAccessDecision};
    use crate::ports::{PortResult, ProgressBackend};
    use crate::testutil::{signed_in_session, student};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    struct FakeProgressBackend {
        records: Vec<CourseProgress>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ProgressBackend for FakeProgressBackend {
        async fn fetch_all(&self) -> PortResult<Vec<CourseProgress>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }

        async fn validate_lesson(&self, _: &str, _: &LessonKey) -> PortResult<()> {
            Ok(())
        }
    }

    struct FakeExamBackend {
        access: PortResult<LevelAccessDecision>,
        questions: Vec<ExamQuestion>,
        submit_result: StdMutex<Option<PortResult<ExamResult>>>,
        submissions: AtomicUsize,
        /// When set, a submission parks here until the test releases it.
        submit_gate: Option<Arc<Notify>>,
    }

    impl FakeExamBackend {
        fn open_with_questions(count: usize) -> Self {
            Self {
                access: Ok(LevelAccessDecision {
                    allowed: true,
                    reason: None,
                }),
                questions: (0..count)
                    .map(|i| ExamQuestion {
                        id: format!("q{i}"),
                        prompt: format!("Pregunta {i}"),
                        options: vec!["a".into(), "b".into(), "c".into()],
                    })
                    .collect(),
                submit_result: StdMutex::new(None),
                submissions: AtomicUsize::new(0),
                submit_gate: None,
            }
        }

        fn scripted_verdict(self, result: ExamResult) -> Self {
            *self.submit_result.lock().unwrap() = Some(Ok(result));
            self
        }

        fn gated_submit(mut self, gate: Arc<Notify>) -> Self {
            self.submit_gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl ExamBackend for FakeExamBackend {
        async fn can_access_level(&self, _: &str, _: u32) -> PortResult<LevelAccessDecision> {
            match &self.access {
                Ok(d) => Ok(d.clone()),
                Err(_) => Err(PortError::Unexpected("backend unreachable".into())),
            }
        }

        async fn fetch_questions(&self, _: &str, _: u32) -> PortResult<Vec<ExamQuestion>> {
            Ok(self.questions.clone())
        }

        async fn submit(&self, _: &str, _: u32, _: &[ExamAnswer]) -> PortResult<ExamResult> {
            if let Some(gate) = &self.submit_gate {
                gate.notified().await;
            }
            self.submissions.fetch_add(1, Ordering::SeqCst);
            self.submit_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(PortError::Unexpected("no verdict scripted".into())))
        }
    }

    fn failing_result() -> ExamResult {
        ExamResult {
            approved: false,
            percentage: 40.0,
            course_completed: false,
        }
    }

    fn passing_result() -> ExamResult {
        ExamResult {
            approved: true,
            percentage: 90.0,
            course_completed: false,
        }
    }

    async fn progress_for(course_id: &str) -> (Arc<ProgressStore>, Arc<FakeProgressBackend>) {
        let backend = Arc::new(FakeProgressBackend {
            records: vec![CourseProgress {
                course_id: course_id.to_string(),
                total_lessons: 2,
                ..CourseProgress::default()
            }],
            fetches: AtomicUsize::new(0),
        });
        let store = Arc::new(ProgressStore::new(
            backend.clone(),
            signed_in_session(student("u1")).await,
        ));
        store.load().await;
        (store, backend)
    }

    async fn answer_all(session: &ExamSession) {
        for question in session.questions().await {
            session.select_answer(&question.id, 0).await.unwrap();
        }
    }

    #[tokio::test]
    async fn submit_is_rejected_locally_while_unanswered() {
        let backend = Arc::new(
            FakeExamBackend::open_with_questions(3).scripted_verdict(passing_result()),
        );
        let (progress, _) = progress_for("c1").await;
        let session = ExamSession::new("c1", 2, backend.clone(), progress);
        session.start().await.unwrap();

        let questions = session.questions().await;
        session.select_answer(&questions[0].id, 1).await.unwrap();
        session.select_answer(&questions[1].id, 2).await.unwrap();

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, ExamError::Unanswered { missing: 1 }));
        // No network call was issued and the attempt is still answerable.
        assert_eq!(backend.submissions.load(Ordering::SeqCst), 0);
        assert_eq!(session.phase().await, ExamPhase::Ready);

        session.select_answer(&questions[2].id, 0).await.unwrap();
        session.submit().await.unwrap();
        assert_eq!(backend.submissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_discards_prior_answers() {
        let backend = Arc::new(
            FakeExamBackend::open_with_questions(2).scripted_verdict(failing_result()),
        );
        let (progress, _) = progress_for("c1").await;
        let session = ExamSession::new("c1", 2, backend, progress);
        session.start().await.unwrap();
        answer_all(&session).await;
        let result = session.submit().await.unwrap();
        assert!(!result.approved);

        session.retry().await.unwrap();
        assert_eq!(session.phase().await, ExamPhase::Ready);
        for question in session.questions().await {
            assert_eq!(session.selected_answer(&question.id).await, None);
        }
    }

    #[tokio::test]
    async fn approval_is_recorded_and_progress_reloaded() {
        let backend = Arc::new(
            FakeExamBackend::open_with_questions(1).scripted_verdict(passing_result()),
        );
        let (progress, progress_backend) = progress_for("c1").await;
        let fetches_before = progress_backend.fetches.load(Ordering::SeqCst);

        let session = ExamSession::new("c1", 2, backend, progress.clone());
        session.start().await.unwrap();
        answer_all(&session).await;
        let result = session.submit().await.unwrap();

        assert!(result.approved);
        assert!(matches!(session.phase().await, ExamPhase::Finished(_)));
        // The reload overwrote the optimistic approval; what survives is the
        // backend truth, which in this fake has no approvals. The reload
        // itself is the observable contract here.
        assert_eq!(
            progress_backend.fetches.load(Ordering::SeqCst),
            fetches_before + 1
        );
    }

    #[tokio::test]
    async fn denied_access_blocks_with_the_server_reason() {
        let backend = Arc::new(FakeExamBackend {
            access: Ok(LevelAccessDecision {
                allowed: false,
                reason: Some("Debes aprobar el nivel anterior".into()),
            }),
            questions: vec![],
            submit_result: StdMutex::new(None),
            submissions: AtomicUsize::new(0),
            submit_gate: None,
        });
        let (progress, _) = progress_for("c1").await;
        let session = ExamSession::new("c1", 3, backend, progress);

        let phase = session.start().await.unwrap();
        assert_eq!(
            phase,
            ExamPhase::Blocked {
                reason: "Debes aprobar el nivel anterior".into()
            }
        );
        // Terminal: answering, submitting and reloading are all rejected.
        assert!(session.select_answer("q0", 0).await.is_err());
        assert!(matches!(
            session.submit().await.unwrap_err(),
            ExamError::InvalidPhase(_)
        ));
        assert!(matches!(
            session.start().await.unwrap_err(),
            ExamError::InvalidPhase(ExamPhase::Blocked { .. })
        ));
    }

    #[tokio::test]
    async fn start_is_rejected_while_a_submission_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            FakeExamBackend::open_with_questions(1)
                .scripted_verdict(passing_result())
                .gated_submit(gate.clone()),
        );
        let (progress, _) = progress_for("c1").await;
        let session = Arc::new(ExamSession::new("c1", 2, backend, progress));
        session.start().await.unwrap();
        answer_all(&session).await;

        let submitting = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(session.phase().await, ExamPhase::Submitting);

        // A reload attempt mid-submission must not reset the machine; the
        // pending verdict still has to land in `Finished` exactly once.
        assert!(matches!(
            session.start().await.unwrap_err(),
            ExamError::InvalidPhase(ExamPhase::Submitting)
        ));

        gate.notify_one();
        let result = submitting.await.unwrap().unwrap();
        assert!(result.approved);
        assert!(matches!(session.phase().await, ExamPhase::Finished(_)));
    }

    #[tokio::test]
    async fn empty_question_set_is_unavailable() {
        let backend = Arc::new(FakeExamBackend::open_with_questions(0));
        let (progress, _) = progress_for("c1").await;
        let session = ExamSession::new("c1", 2, backend, progress);
        assert_eq!(session.start().await.unwrap(), ExamPhase::Unavailable);
    }

    #[tokio::test]
    async fn failed_submission_returns_to_ready_with_answers_kept() {
        let backend = Arc::new(FakeExamBackend::open_with_questions(2));
        let (progress, _) = progress_for("c1").await;
        let session = ExamSession::new("c1", 2, backend, progress);
        session.start().await.unwrap();
        answer_all(&session).await;

        // No verdict scripted: the backend errors out.
        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, ExamError::Backend(_)));
        assert_eq!(session.phase().await, ExamPhase::Ready);
        for question in session.questions().await {
            assert_eq!(session.selected_answer(&question.id).await, Some(0));
        }
    }
}
