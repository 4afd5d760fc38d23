use thiserror::Error;

#[derive(Error, Debug)]
pub enum MargenError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Unknown employee: {0}")]
    UnknownEmployee(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MargenError>;
