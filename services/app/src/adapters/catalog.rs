//! services/app/src/adapters/catalog.rs
//!
//! This module contains the adapter for the course-content document store.
//! It implements the read-only `CourseCatalog` port from the `core` crate.
//! The catalog is treated as an opaque external collection of documents;
//! this adapter only converts them to the shapes the core indexes into.

use async_trait::async_trait;
use campus_core::domain::{Course, CourseLevel, Lesson};
use campus_core::ports::{CourseCatalog, PortResult};
use serde::Deserialize;

use super::http::BackendClient;

/// A document-store backed implementation of the `CourseCatalog` port.
#[derive(Clone)]
pub struct DocumentCatalog {
    http: BackendClient,
}

impl DocumentCatalog {
    pub fn new(http: BackendClient) -> Self {
        Self { http }
    }
}

//=========================================================================================
// Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
pub(crate) struct LessonDocument {
    titulo: String,
    #[serde(rename = "videoUrl", default)]
    video_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LevelDocument {
    numero: u32,
    #[serde(default)]
    nombre: String,
    #[serde(default)]
    lecciones: Vec<LessonDocument>,
}

#[derive(Deserialize)]
pub(crate) struct CourseDocument {
    #[serde(alias = "_id")]
    id: String,
    nombre: String,
    #[serde(default)]
    niveles: Vec<LevelDocument>,
}

impl CourseDocument {
    pub(crate) fn to_domain(self) -> Course {
        let mut levels: Vec<CourseLevel> = self
            .niveles
            .into_iter()
            .map(|level| CourseLevel {
                number: level.numero,
                name: level.nombre,
                lessons: level
                    .lecciones
                    .into_iter()
                    .map(|lesson| Lesson {
                        title: lesson.titulo,
                        video_url: lesson.video_url,
                    })
                    .collect(),
            })
            .collect();
        // Documents are unordered; the navigation order is by level number.
        levels.sort_by_key(|l| l.number);
        Course {
            id: self.id,
            name: self.nombre,
            levels,
        }
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl CourseCatalog for DocumentCatalog {
    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        let documents: Vec<CourseDocument> = self.http.get_json("/cursos").await?;
        Ok(documents.into_iter().map(CourseDocument::to_domain).collect())
    }

    async fn get_course(&self, course_id: &str) -> PortResult<Course> {
        let document: CourseDocument =
            self.http.get_json(&format!("/cursos/{course_id}")).await?;
        Ok(document.to_domain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_document_orders_levels_by_number() {
        let document: CourseDocument = serde_json::from_str(
            r#"{
                "_id": "c1",
                "nombre": "Guitarra desde cero",
                "niveles": [
                    { "numero": 2, "nombre": "Intermedio", "lecciones": [] },
                    { "numero": 1, "nombre": "Básico", "lecciones": [
                        { "titulo": "Afinación" },
                        { "titulo": "Primeros acordes", "videoUrl": "https://v/1" }
                    ]}
                ]
            }"#,
        )
        .unwrap();
        let course = document.to_domain();
        assert_eq!(course.levels[0].number, 1);
        assert_eq!(course.levels[1].number, 2);
        assert_eq!(course.levels[0].lessons.len(), 2);
        assert_eq!(course.total_lessons(), 2);
        assert_eq!(
            course.levels[0].lessons[1].video_url.as_deref(),
            Some("https://v/1")
        );
    }
}
