//! Failures of the CouchDB tournament store.

use reqwest::StatusCode;
use thiserror::Error;

use crate::state::model::MatchId;

/// Result alias used inside the CouchDB store.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Everything that can go wrong while talking to CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Configuration incomplete.
    #[error("environment variable `{var}` is required for the CouchDB store")]
    MissingEnvVar { var: &'static str },
    /// TLS or client setup failed.
    #[error("cannot build the CouchDB HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Probing or creating the database failed before CouchDB answered.
    #[error("cannot {action} CouchDB database `{database}`")]
    DatabaseRequest {
        database: String,
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected status for a database probe or creation.
    #[error("CouchDB answered {status} for database `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// Transport failure on a document endpoint.
    #[error("request to CouchDB `{path}` was not sent")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected status for a document endpoint.
    #[error("CouchDB answered {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The `_rev` sent with a write is no longer the current one.
    #[error("revision conflict writing `{path}`")]
    Conflict { path: String },
    /// Body was not valid JSON.
    #[error("unreadable CouchDB response body for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// JSON did not fit the document model.
    #[error("document `{path}` does not match the expected shape")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// A tournament document references matches that are not stored.
    #[error("tournament `{doc_id}` references missing matches {match_ids:?}")]
    MissingMatches {
        doc_id: String,
        match_ids: Vec<MatchId>,
    },
    /// Id allocation lost every race.
    #[error("`{kind}` id sequence still conflicting after {attempts} attempts")]
    SequenceContention { kind: &'static str, attempts: u32 },
}
