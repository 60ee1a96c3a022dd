use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
    #[error("Binding '{name}' must be a number, got '{value}'")]
    InvalidBinding { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, RouteError>;
