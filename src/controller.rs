//! The incremental search controller.
//!
//! Keystrokes are debounced into queries, each query is looked up on a
//! worker thread, and completions come back over a channel tagged with the
//! generation that launched them. Only the most recently launched generation
//! may touch the display or the page fragment: a slow reply to an old query
//! can never overwrite the answer to a newer one.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::check::{Backend, CheckError, SearchResponse};
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::fragment::{self, PageLocation};
use crate::render::{DisplayState, Renderer, Update};

/// Where the controller is in its search cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing pending.
    Idle,
    /// A keystroke burst is waiting for the debounce window.
    AwaitingDebounce,
    /// The latest query's lookup has not completed.
    InFlight,
}

/// A finished lookup, as sent back by the worker.
#[derive(Debug)]
struct Completion {
    generation: u64,
    query: String,
    outcome: Result<SearchResponse, CheckError>,
}

/// Drives one search session.
///
/// Owns the input text, the debouncer, the display, and the page location;
/// construct one per session.
pub struct SearchController {
    backend: Arc<dyn Backend>,
    page: PageLocation,
    input: String,
    debouncer: Debouncer<String>,
    renderer: Renderer,
    /// Generation of the most recently launched lookup.
    generation: u64,
    /// Set while the latest generation has not completed.
    outstanding: Option<u64>,
    notice: Option<String>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl SearchController {
    /// Create a controller searching `backend` for the given page.
    pub fn new(backend: Arc<dyn Backend>, page: PageLocation, config: &Config) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            page,
            input: String::new(),
            debouncer: Debouncer::new(config.debounce),
            renderer: Renderer::new(config.empty_results),
            generation: 0,
            outstanding: None,
            notice: None,
            tx,
            rx,
        }
    }

    /// Restore the query from the page fragment and search it right away.
    ///
    /// Returns the restored input, if any. A fragment that does not decode is
    /// reported through [`notice`](Self::notice) and nothing is searched.
    pub fn on_load(&mut self) -> Option<&str> {
        let raw = self.page.read()?.to_string();
        match fragment::decode(&raw) {
            Ok(query) => {
                self.input = query.clone();
                self.search(query);
                Some(self.input.as_str())
            }
            Err(e) => {
                tracing::warn!(fragment = %raw, error = %e, "ignoring page fragment");
                self.notice = Some(format!("ignoring page fragment: {e}"));
                None
            }
        }
    }

    /// Record the input field's new value and re-arm the debouncer.
    pub fn on_input(&mut self, value: &str, now: Instant) {
        self.input = value.to_string();
        self.notice = None;
        self.debouncer.schedule_at(value.to_string(), now);
    }

    /// Search the current input immediately, skipping the debounce window.
    pub fn submit(&mut self) {
        self.debouncer.cancel();
        self.search(self.input.clone());
    }

    /// Fire a due debounce and apply any finished lookups. Never blocks.
    ///
    /// Returns whether anything visible may have changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(query) = self.debouncer.take_due(now) {
            self.on_debounce_fire(query);
            changed = true;
        }
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.complete(completion);
        }
        changed
    }

    /// Block up to `timeout` for one lookup to finish and apply it.
    ///
    /// Returns whether a completion arrived.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.complete(completion);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Drive pending debounce and lookups until the controller is idle.
    pub fn run_until_idle(&mut self) {
        loop {
            match self.phase() {
                Phase::Idle => return,
                Phase::AwaitingDebounce => {
                    if let Some(deadline) = self.debouncer.deadline() {
                        thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    }
                    self.poll(Instant::now());
                }
                Phase::InFlight => {
                    // The controller holds a sender, so this never disconnects.
                    if let Ok(completion) = self.rx.recv() {
                        self.complete(completion);
                    }
                }
            }
        }
    }

    /// The query a fired debounce hands over.
    ///
    /// Whitespace-only queries clear everything without a lookup.
    pub fn on_debounce_fire(&mut self, query: String) {
        self.search(query);
    }

    fn search(&mut self, query: String) {
        if query.trim().is_empty() {
            // Invalidate anything still running for an older query.
            self.generation += 1;
            self.outstanding = None;
            self.renderer.render(Update::Clear);
            self.page.write("");
            return;
        }
        self.launch(query);
    }

    fn launch(&mut self, query: String) {
        self.generation += 1;
        let generation = self.generation;
        self.outstanding = Some(generation);
        tracing::debug!(generation, query = %query, "launching lookup");

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let worker_query = query.clone();
        let spawned = thread::Builder::new()
            .name(format!("lookup-{generation}"))
            .spawn(move || {
                let outcome = backend.check(worker_query.trim());
                // The controller may be gone; nobody is left to care.
                let _ = tx.send(Completion {
                    generation,
                    query: worker_query,
                    outcome,
                });
            });
        if let Err(e) = spawned {
            self.complete(Completion {
                generation,
                query,
                outcome: Err(CheckError::Internal(format!("cannot start lookup: {e}"))),
            });
        }
    }

    /// Apply a finished lookup. Returns false when it was stale.
    fn complete(&mut self, completion: Completion) -> bool {
        let Completion {
            generation,
            query,
            outcome,
        } = completion;
        if generation != self.generation {
            tracing::debug!(
                generation,
                latest = self.generation,
                query = %query,
                "discarding stale lookup"
            );
            return false;
        }
        self.outstanding = None;
        match outcome {
            Ok(response) => {
                tracing::debug!(
                    generation,
                    username = %response.username,
                    platforms = response.results.len(),
                    "lookup finished"
                );
                self.renderer.render(Update::Response(&response));
                self.page.write(&fragment::encode(&response.username));
            }
            Err(e) => {
                tracing::warn!(generation, query = %query, error = %e, "lookup failed");
                self.renderer.render(Update::Failed(&e));
                // The backend never saw the query, so the typed text is the
                // best record of it; a bad reply leaves the page as it was.
                if e.is_transport() {
                    self.page.write(&fragment::encode(&query));
                }
            }
        }
        true
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.debouncer.is_armed() {
            Phase::AwaitingDebounce
        } else if self.outstanding.is_some() {
            Phase::InFlight
        } else {
            Phase::Idle
        }
    }

    /// When the event loop must call [`poll`](Self::poll) next, if a
    /// debounce is pending.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// The input field's text, verbatim.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// What the results area shows.
    #[must_use]
    pub fn display(&self) -> &DisplayState {
        self.renderer.state()
    }

    /// The page location, fragment included.
    #[must_use]
    pub fn page(&self) -> &PageLocation {
        &self.page
    }

    /// A non-fatal message for the user, e.g. an unusable fragment.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Number of lookups launched or invalidated so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("page", &self.page)
            .field("input", &self.input)
            .field("phase", &self.phase())
            .field("generation", &self.generation)
            .field("display", self.renderer.state())
            .finish_non_exhaustive()
    }
}
