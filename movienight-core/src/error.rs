use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid name: {name}")]
    InvalidName { name: String },

    #[error("Name already taken: {name}")]
    NameTaken { name: String },

    #[error("Host {host} is banned (attempted name {name}, known names: {})", names.join(", "))]
    Banned {
        host: String,
        name: String,
        names: Vec<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Text shown to the viewer whose join attempt failed
    #[must_use]
    pub fn join_message(&self) -> String {
        match self {
            Self::InvalidName { .. } => {
                "Invalid name. Names must be 3 to 36 characters of letters, numbers, '_' or '-'.".to_string()
            }
            Self::NameTaken { .. } => "Name already taken".to_string(),
            Self::Banned { .. } => "You are banned from this chat.".to_string(),
            other => {
                tracing::error!("Join failed: {other}");
                "Unable to join chat".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
