//! Debounced city search.
//!
//! Each keystroke restarts the debounce timer; only the query still current
//! when the timer fires is sent. Results for a superseded query are dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::client::WeatherSource;
use crate::dashboard::StateChange;
use crate::scheduler::Scheduler;
use crate::types::SearchSuggestion;

const SEARCH_KEY: &str = "search";

#[derive(Debug, Default)]
struct SearchState {
    query: String,
    /// Bumped on every query change; a search only lands if it still matches
    generation: u64,
    suggestions: Vec<SearchSuggestion>,
}

pub struct AutocompleteController<S> {
    source: Arc<S>,
    scheduler: Scheduler<&'static str>,
    debounce: Duration,
    state: Arc<Mutex<SearchState>>,
    events: broadcast::Sender<StateChange>,
}

impl<S: WeatherSource> AutocompleteController<S> {
    pub fn new(source: Arc<S>, debounce: Duration, events: broadcast::Sender<StateChange>) -> Self {
        Self {
            source,
            scheduler: Scheduler::new(),
            debounce,
            state: Arc::new(Mutex::new(SearchState::default())),
            events,
        }
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    pub fn suggestions(&self) -> Vec<SearchSuggestion> {
        self.state.lock().suggestions.clone()
    }

    /// Whether a debounced search is waiting or running
    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending(&SEARCH_KEY)
    }

    /// Record new query text. Blank text clears suggestions right away;
    /// anything else (re)starts the debounce timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn update_query(&self, text: &str) {
        let generation = {
            let mut state = self.state.lock();
            state.query = text.to_string();
            state.generation += 1;
            state.generation
        };

        if text.trim().is_empty() {
            self.scheduler.cancel(&SEARCH_KEY);
            self.clear_suggestions();
            return;
        }

        let source = self.source.clone();
        let state = self.state.clone();
        let events = self.events.clone();
        let query = text.to_string();

        self.scheduler.schedule(SEARCH_KEY, self.debounce, async move {
            let result = source.search(&query).await;

            let landed = {
                let mut state = state.lock();
                if state.generation != generation {
                    false
                } else {
                    match result {
                        Ok(suggestions) => state.suggestions = suggestions,
                        Err(e) => {
                            tracing::debug!("Search for {:?} failed: {}", query, e);
                            state.suggestions.clear();
                        }
                    }
                    true
                }
            };

            if landed {
                let _ = events.send(StateChange::SuggestionsChanged);
            } else {
                tracing::debug!("Dropping results for superseded query {:?}", query);
            }
        });
    }

    /// A suggestion was picked: stop searching and show its name as the query
    pub fn select(&self, name: &str) {
        self.scheduler.cancel(&SEARCH_KEY);
        {
            let mut state = self.state.lock();
            state.query = name.to_string();
            state.generation += 1;
        }
        self.clear_suggestions();
    }

    /// Reset query and suggestions
    pub fn clear(&self) {
        self.scheduler.cancel(&SEARCH_KEY);
        {
            let mut state = self.state.lock();
            state.query.clear();
            state.generation += 1;
        }
        self.clear_suggestions();
    }

    fn clear_suggestions(&self) {
        let had_any = !std::mem::take(&mut self.state.lock().suggestions).is_empty();
        if had_any {
            let _ = self.events.send(StateChange::SuggestionsChanged);
        }
    }
}
