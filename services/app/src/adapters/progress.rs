//! services/app/src/adapters/progress.rs
//!
//! This module contains the HTTP adapter for the progress backend. It
//! implements the `ProgressBackend` port from the `core` crate and
//! normalizes the wire records into `CourseProgress` at this boundary, so
//! downstream logic performs one canonical check instead of several
//! defensive equivalents.

use async_trait::async_trait;
use campus_core::domain::{CourseProgress, LessonKey};
use campus_core::ports::{PortResult, ProgressBackend};
use serde::{Deserialize, Serialize};

use super::http::BackendClient;

/// The HTTP implementation of the `ProgressBackend` port.
#[derive(Clone)]
pub struct HttpProgressBackend {
    http: BackendClient,
}

impl HttpProgressBackend {
    pub fn new(http: BackendClient) -> Self {
        Self { http }
    }
}

//=========================================================================================
// Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
pub(crate) struct ProgressRecord {
    #[serde(rename = "cursoId")]
    curso_id: String,
    #[serde(rename = "leccionesCompletadas", default)]
    lecciones_completadas: Vec<String>,
    #[serde(rename = "nivelesAprobados", default)]
    niveles_aprobados: Vec<u32>,
    #[serde(rename = "totalLecciones", default)]
    total_lecciones: usize,
    #[serde(rename = "completado", default)]
    completado: bool,
}

impl ProgressRecord {
    pub(crate) fn to_domain(self) -> CourseProgress {
        CourseProgress {
            course_id: self.curso_id,
            completed_lesson_keys: self.lecciones_completadas,
            approved_levels: self.niveles_aprobados,
            total_lessons: self.total_lecciones,
            completed: self.completado,
        }
    }
}

#[derive(Deserialize)]
struct MyProgressResponse {
    #[allow(dead_code)]
    ok: bool,
    #[serde(default)]
    data: Vec<ProgressRecord>,
}

#[derive(Serialize)]
struct ValidateLessonRequest<'a> {
    #[serde(rename = "cursoId")]
    curso_id: &'a str,
    #[serde(rename = "leccionId")]
    leccion_id: String,
}

#[derive(Deserialize)]
struct ValidateLessonResponse {
    #[allow(dead_code)]
    ok: bool,
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl ProgressBackend for HttpProgressBackend {
    async fn fetch_all(&self) -> PortResult<Vec<CourseProgress>> {
        let response: MyProgressResponse =
            self.http.get_json("/progreso/mis-progresos").await?;
        Ok(response
            .data
            .into_iter()
            .map(ProgressRecord::to_domain)
            .collect())
    }

    async fn validate_lesson(&self, course_id: &str, lesson: &LessonKey) -> PortResult<()> {
        let _: ValidateLessonResponse = self
            .http
            .post_json(
                "/progreso/validar-leccion",
                &ValidateLessonRequest {
                    curso_id: course_id,
                    leccion_id: lesson.to_string(),
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_record_normalizes_to_course_progress() {
        let record: ProgressRecord = serde_json::from_str(
            r#"{
                "cursoId": "c1",
                "leccionesCompletadas": ["c1:1:0", "c1:1:1"],
                "nivelesAprobados": [1],
                "totalLecciones": 6,
                "completado": false
            }"#,
        )
        .unwrap();
        let progress = record.to_domain();
        assert_eq!(progress.course_id, "c1");
        assert!(progress.is_lesson_completed(&LessonKey::new("c1", 1, 0)));
        assert!(!progress.is_lesson_completed(&LessonKey::new("c1", 1, 2)));
        assert!(progress.is_level_approved(1));
        assert!(!progress.completed);
    }

    #[test]
    fn missing_fields_mean_zero_progress_not_an_error() {
        let record: ProgressRecord =
            serde_json::from_str(r#"{ "cursoId": "c2" }"#).unwrap();
        let progress = record.to_domain();
        assert!(progress.completed_lesson_keys.is_empty());
        assert!(progress.approved_levels.is_empty());
        assert!(!progress.completed);
    }
}
