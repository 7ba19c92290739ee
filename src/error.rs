use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Type conversion error: can't convert {message} to {target}")]
    TypeConversion { target: String, message: String },
    #[error("Association {association} in {model} is invalid because {class_name} does not exist")]
    AssociationConfiguration { model: String, association: String, class_name: String },
    #[error("Unknown attribute {name} for {model}")]
    UnknownAttribute { model: String, name: String },
    #[error("Definition error: {0}")]
    Definition(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Finder error: {0}")]
    Finder(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, AttributionError>;

impl AttributionError {
    pub fn conversion(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeConversion { target: target.into(), message: message.into() }
    }
}

// Helper conversions
impl From<serde_json::Error> for AttributionError {
    fn from(e: serde_json::Error) -> Self { Self::Parse(e.to_string()) }
}
impl From<config::ConfigError> for AttributionError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<regex::Error> for AttributionError {
    fn from(e: regex::Error) -> Self { Self::Definition(e.to_string()) }
}
