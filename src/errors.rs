use std::fmt;

#[derive(Debug, Clone)]
pub enum ServiceError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    ConversionForward(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::DatabaseConfig(_) => "E001",
            ServiceError::DatabaseConnection(_) => "E002",
            ServiceError::DatabaseOperation(_) => "E003",
            ServiceError::Validation(_) => "E004",
            ServiceError::NotFound(_) => "E005",
            ServiceError::Serialization(_) => "E006",
            ServiceError::ConversionForward(_) => "E007",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServiceError::DatabaseConfig(_) => "Database Configuration Error",
            ServiceError::DatabaseConnection(_) => "Database Connection Error",
            ServiceError::DatabaseOperation(_) => "Database Operation Error",
            ServiceError::Validation(_) => "Validation Error",
            ServiceError::NotFound(_) => "Resource Not Found",
            ServiceError::Serialization(_) => "Serialization Error",
            ServiceError::ConversionForward(_) => "Conversion Forwarding Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::DatabaseConfig(msg) => msg,
            ServiceError::DatabaseConnection(msg) => msg,
            ServiceError::DatabaseOperation(msg) => msg,
            ServiceError::Validation(msg) => msg,
            ServiceError::NotFound(msg) => msg,
            ServiceError::Serialization(msg) => msg,
            ServiceError::ConversionForward(msg) => msg,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ServiceError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ServiceError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ServiceError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ServiceError::Serialization(msg.into())
    }

    pub fn conversion_forward<T: Into<String>>(msg: T) -> Self {
        ServiceError::ConversionForward(msg.into())
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(err: sea_orm::DbErr) -> Self {
        ServiceError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::DatabaseConfig(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::ConversionForward(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
