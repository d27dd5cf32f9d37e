//! services/app/src/bin/app.rs

use app_lib::{
    adapters::{
        BackendClient, DocumentCatalog, FileCredentialStore, HttpAuthBackend, HttpExamBackend,
        HttpProgressBackend,
    },
    config::Config,
    error::AppError,
};
use campus_core::{
    gate::CourseNavigationGate, ports::CourseCatalog, progress::ProgressStore,
    session::SessionStore, session::TokenSlot,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting the campus client...");

    // --- 2. Build the HTTP Layer ---
    let token = Arc::new(TokenSlot::default());
    let api_client = BackendClient::new(config.api_base_url.clone(), token.clone())?;
    let catalog_client = BackendClient::new(config.catalog_url.clone(), token.clone())?;

    // --- 3. Initialize Service Adapters ---
    let auth_adapter = Arc::new(HttpAuthBackend::new(api_client.clone()));
    let progress_adapter = Arc::new(HttpProgressBackend::new(api_client.clone()));
    let exam_adapter = Arc::new(HttpExamBackend::new(api_client));
    let catalog = DocumentCatalog::new(catalog_client);
    let credential_store = Arc::new(FileCredentialStore::new(config.session_file.clone()));

    // --- 4. Construct the Stores (one instance each, shared by reference) ---
    let session = Arc::new(SessionStore::new(auth_adapter, credential_store, token));
    let progress = Arc::new(ProgressStore::new(progress_adapter, session.clone()));
    let gate = CourseNavigationGate::new(exam_adapter);

    // --- 5. Restore the Session (and optionally log in) ---
    session.load_from_storage().await;
    if !session.is_authenticated().await {
        match (&config.demo_email, &config.demo_password) {
            (Some(email), Some(password)) => {
                let user = session.login(email, password).await?;
                info!("Logged in as {} ({:?})", user.name, user.role);
            }
            _ => info!("No persisted session and no credentials; browsing anonymously."),
        }
    }

    // --- 6. Load Progress & Walk the Catalog ---
    progress.load().await;

    let courses = catalog.list_courses().await?;
    info!("Catalog has {} course(s)", courses.len());
    for course in &courses {
        let course_progress = progress.course(&course.id).await;
        let access = gate.evaluate(course, course_progress.as_ref()).await;
        info!("Course: {} ({})", course.name, course.id);
        for level in &access.levels {
            let completed = level.lessons.iter().filter(|l| l.completed).count();
            info!(
                "  Nivel {}: {} — {}/{} lessons done{}",
                level.number,
                if level.unlocked { "unlocked" } else { "locked" },
                completed,
                level.lessons.len(),
                if level.exam_available { ", exam available" } else { "" }
            );
        }
        if let Some(p) = course_progress {
            if p.completed {
                info!("  Course completed!");
            }
        }
    }

    if session.is_premium().await {
        info!("Premium subscription active.");
    } else if session.is_authenticated().await {
        warn!("No active subscription; premium content stays locked.");
    }

    Ok(())
}
