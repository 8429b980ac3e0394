use tracing::{debug, info};

use crate::client::{QueryError, SERVER_ERROR};
use crate::query::{Query, QueryResponse};

/// What the result/error regions currently show.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UiState {
    #[default]
    Idle,
    Loading,
    Result(QueryResponse),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Send this query, then hand the outcome to [`Controller::complete`].
    Dispatch(Query),
    /// Blank input; the validation message is already showing.
    Rejected,
    /// A request is still in flight.
    Ignored,
}

/// Owns the submission lifecycle: idle -> loading -> result/error.
#[derive(Debug, Default)]
pub struct Controller {
    state: UiState,
    in_flight: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn submit(&mut self, raw: &str) -> Submission {
        if self.in_flight {
            debug!("Submission ignored, request already in flight");
            return Submission::Ignored;
        }

        match Query::parse(raw) {
            Ok(query) => {
                info!(len = query.as_str().len(), "Submitting query");
                self.state = UiState::Loading;
                self.in_flight = true;
                Submission::Dispatch(query)
            }
            Err(e) => {
                self.state = UiState::Error(e.to_string());
                Submission::Rejected
            }
        }
    }

    pub fn complete(&mut self, outcome: Result<QueryResponse, QueryError>) {
        self.in_flight = false;
        self.state = match outcome {
            Ok(response) => {
                info!(sources = response.sources.len(), "Query answered");
                UiState::Result(response)
            }
            Err(e) => UiState::Error(error_message(&e)),
        };
    }
}

/// User-facing text for a failed query.
pub fn error_message(error: &QueryError) -> String {
    let message = error.to_string();
    if message.is_empty() {
        format!("Error: {}", SERVER_ERROR)
    } else {
        format!("Error: {}", message)
    }
}
