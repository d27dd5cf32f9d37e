//! services/app/src/adapters/exam.rs
//!
//! This module contains the HTTP adapter for the examination backend. It
//! implements the `ExamBackend` port from the `core` crate. Grading is
//! entirely server-side; the adapter carries the verdict back verbatim.

use async_trait::async_trait;
use campus_core::domain::{ExamAnswer, ExamQuestion, ExamResult, LevelAccessDecision};
use campus_core::ports::{ExamBackend, PortResult};
use serde::{Deserialize, Serialize};

use super::http::BackendClient;

/// The HTTP implementation of the `ExamBackend` port.
#[derive(Clone)]
pub struct HttpExamBackend {
    http: BackendClient,
}

impl HttpExamBackend {
    pub fn new(http: BackendClient) -> Self {
        Self { http }
    }
}

//=========================================================================================
// Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct CanAccessResponse {
    #[allow(dead_code)]
    ok: bool,
    #[serde(rename = "puedeAcceder")]
    puede_acceder: bool,
    #[serde(default, alias = "razon")]
    reason: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct QuestionRecord {
    #[serde(alias = "_id")]
    id: String,
    pregunta: String,
    #[serde(default)]
    opciones: Vec<String>,
}

impl QuestionRecord {
    pub(crate) fn to_domain(self) -> ExamQuestion {
        ExamQuestion {
            id: self.id,
            prompt: self.pregunta,
            options: self.opciones,
        }
    }
}

#[derive(Deserialize)]
struct QuestionsResponse {
    #[allow(dead_code)]
    ok: bool,
    #[serde(default)]
    preguntas: Vec<QuestionRecord>,
}

#[derive(Serialize)]
struct AnswerRecord<'a> {
    #[serde(rename = "preguntaId")]
    pregunta_id: &'a str,
    respuesta: usize,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    respuestas: Vec<AnswerRecord<'a>>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    aprobado: bool,
    porcentaje: f64,
    #[serde(rename = "cursoFinalizado", default)]
    curso_finalizado: bool,
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl ExamBackend for HttpExamBackend {
    async fn can_access_level(
        &self,
        course_id: &str,
        level: u32,
    ) -> PortResult<LevelAccessDecision> {
        let path = format!("/examen/{course_id}/nivel/{level}/puede-acceder");
        let response: CanAccessResponse = self.http.get_json(&path).await?;
        Ok(LevelAccessDecision {
            allowed: response.puede_acceder,
            reason: response.reason,
        })
    }

    async fn fetch_questions(
        &self,
        course_id: &str,
        level: u32,
    ) -> PortResult<Vec<ExamQuestion>> {
        let path = format!("/examen/{course_id}/nivel/{level}");
        let response: QuestionsResponse = self.http.get_json(&path).await?;
        Ok(response
            .preguntas
            .into_iter()
            .map(QuestionRecord::to_domain)
            .collect())
    }

    async fn submit(
        &self,
        course_id: &str,
        level: u32,
        answers: &[ExamAnswer],
    ) -> PortResult<ExamResult> {
        let path = format!("/examen/{course_id}/nivel/{level}");
        let request = SubmitRequest {
            respuestas: answers
                .iter()
                .map(|a| AnswerRecord {
                    pregunta_id: &a.question_id,
                    respuesta: a.option_index,
                })
                .collect(),
        };
        let response: SubmitResponse = self.http.post_json(&path, &request).await?;
        Ok(ExamResult {
            approved: response.aprobado,
            percentage: response.porcentaje,
            course_completed: response.curso_finalizado,
        })
    }
}
