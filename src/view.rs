//! Pure mapping from [`UiState`] to what the window shows.
//!
//! Every call builds a fresh [`ViewModel`], so a new result always
//! replaces the previous one instead of adding to it.

use crate::controller::UiState;
use crate::query::{field_or, QueryResponse, SourceRecord};

pub const NO_SOURCES: &str = "No matching cars found.";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub loading_visible: bool,
    pub result_visible: bool,
    pub error_visible: bool,
    pub submit_enabled: bool,
    pub answer: String,
    pub error: String,
    pub sources: SourcesView,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourcesView {
    Hidden,
    Empty(&'static str),
    Rows(Vec<SourceRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub heading: String,
    pub details: String,
    pub title: String,
}

impl SourceRow {
    pub fn from_record(record: &SourceRecord) -> Self {
        SourceRow {
            heading: format!(
                "{} {} ({})",
                field_or(&record.make, ""),
                field_or(&record.model, ""),
                field_or(&record.year, ""),
            ),
            details: format!(
                "Price: {} • Mileage: {} • Body: {}",
                field_or(&record.latest_price, "-"),
                field_or(&record.mileage_km, "-"),
                field_or(&record.body_type, "-"),
            ),
            title: field_or(&record.title, ""),
        }
    }
}

pub fn render(state: &UiState) -> ViewModel {
    let blank = ViewModel {
        loading_visible: false,
        result_visible: false,
        error_visible: false,
        submit_enabled: true,
        answer: String::new(),
        error: String::new(),
        sources: SourcesView::Hidden,
    };

    match state {
        UiState::Idle => blank,
        UiState::Loading => ViewModel {
            loading_visible: true,
            submit_enabled: false,
            ..blank
        },
        UiState::Result(response) => ViewModel {
            result_visible: true,
            answer: response.answer_text(),
            sources: render_sources(response),
            ..blank
        },
        UiState::Error(message) => ViewModel {
            error_visible: true,
            error: message.clone(),
            ..blank
        },
    }
}

fn render_sources(response: &QueryResponse) -> SourcesView {
    if response.sources.is_empty() {
        SourcesView::Empty(NO_SOURCES)
    } else {
        SourcesView::Rows(response.sources.iter().map(SourceRow::from_record).collect())
    }
}
