use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("widget configuration is invalid: {}", .0.join(" "))]
    Validation(Vec<String>),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("persistence failed: {0:#}")]
    Repository(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn dashboard_not_found(id: &str) -> Self {
        Self::NotFound(format!("dashboard {id}"))
    }

    pub fn section_not_found(id: &str) -> Self {
        Self::NotFound(format!("section {id}"))
    }

    pub fn widget_not_found(id: &str) -> Self {
        Self::NotFound(format!("widget {id}"))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
