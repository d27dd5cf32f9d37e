pub mod auth;
pub mod catalog;
pub mod exam;
pub mod http;
pub mod progress;
pub mod storage;

pub use auth::HttpAuthBackend;
pub use catalog::DocumentCatalog;
pub use exam::HttpExamBackend;
pub use http::BackendClient;
pub use progress::HttpProgressBackend;
pub use storage::FileCredentialStore;
