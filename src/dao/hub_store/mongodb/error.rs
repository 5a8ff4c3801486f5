use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code reported when a unique index rejects a write.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("{message}")]
    DuplicateKey { message: String },
    #[error("failed to insert score for game `{game_key}`")]
    InsertScore {
        game_key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to query scores for game `{game_key}`")]
    QueryScores {
        game_key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save user `{id}`")]
    SaveUser {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load user")]
    LoadUser {
        #[source]
        source: MongoError,
    },
    #[error("stored document for user `{id}` is malformed")]
    MalformedUser { id: String },
    #[error("stored document for score `{id}` is malformed")]
    MalformedScore { id: String },
}

impl MongoDaoError {
    /// Classify a write error, turning unique index violations into [`MongoDaoError::DuplicateKey`].
    pub fn from_user_write(id: Uuid, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            let message = duplicate_key_message(&source);
            return MongoDaoError::DuplicateKey { message };
        }
        MongoDaoError::SaveUser { id, source }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn duplicate_key_message(err: &MongoError) -> String {
    let detail = err.to_string();
    if detail.contains("username") {
        "username already taken".to_owned()
    } else {
        "email already registered".to_owned()
    }
}
