//! Single owner of the request tester's state.
//!
//! # Design
//! `Controller` holds the form, validation marks, display toggles and the
//! poll scheduler. Everything a running polling session must reach from a
//! spawned task lives in `Shared` behind an `Arc`: the executor, the
//! notifier, the loading flag, the session generation, and a `watch`
//! channel carrying the latest response so views can subscribe to it.
//!
//! Every start or stop of polling bumps the generation. A tick result that
//! settles after its session ended sees a stale generation and is dropped
//! without touching the response or raising a notification.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::HttpClient;
use crate::error::ProbeError;
use crate::executor::{Outcome, RequestExecutor};
use crate::http::HttpMethod;
use crate::notify::Notifier;
use crate::scheduler::{PollPhase, PollScheduler};
use crate::types::{DisplayOptions, PollState, RequestConfig, RequestForm, ResponseState};

/// Input that can hold focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Url,
    Headers,
    Body,
    PollInterval,
}

/// What the response pane shows. Replaced as a whole on every update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseView {
    pub state: ResponseState,
    pub status: Option<u16>,
    pub elapsed: Option<Duration>,
}

struct Shared {
    executor: RequestExecutor,
    notifier: Arc<dyn Notifier>,
    response: watch::Sender<ResponseView>,
    loading: AtomicBool,
    generation: AtomicU64,
}

impl Shared {
    /// Run one request and publish its result. `session` is the polling
    /// generation the call belongs to, `None` for a manual submit.
    async fn dispatch(
        &self,
        config: &RequestConfig,
        session: Option<u64>,
    ) -> Result<Outcome, ProbeError> {
        let started = Instant::now();
        let result = self.executor.execute(config).await;
        let elapsed = started.elapsed();

        // The generation is compared under the response lock, the same lock
        // `retire_session` bumps it under.
        let mut current = true;
        self.response.send_if_modified(|view| {
            if let Some(generation) = session {
                current = self.generation.load(Ordering::SeqCst) == generation;
            }
            match &result {
                Ok(outcome) if current => {
                    *view = ResponseView {
                        state: outcome.state(),
                        status: Some(outcome.status()),
                        elapsed: Some(elapsed),
                    };
                    true
                }
                _ => false,
            }
        });

        if !current {
            debug!(?session, "discarding result from a stopped polling session");
        } else if let Err(e) = &result {
            self.notifier.notify(&e.to_string());
        }
        result
    }

    /// Start a new polling session and return its generation.
    fn next_session(&self) -> u64 {
        let mut generation = 0;
        self.response.send_if_modified(|_| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            false
        });
        generation
    }

    /// Invalidate the running session so in-flight ticks are dropped.
    fn retire_session(&self) {
        self.response.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
}

/// Holds the loading flag for one manual request. Clears it on drop, so a
/// submit whose future is abandoned mid-flight does not leave the
/// controller busy.
struct LoadingGuard<'a> {
    loading: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(loading: &'a AtomicBool) -> Option<Self> {
        loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { loading })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.store(false, Ordering::SeqCst);
    }
}

pub struct Controller {
    shared: Arc<Shared>,
    form: RequestForm,
    url_invalid: bool,
    focus: Option<FormField>,
    display: DisplayOptions,
    scheduler: PollScheduler,
}

impl Controller {
    pub fn new(client: impl HttpClient + 'static, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_executor(RequestExecutor::new(client), notifier)
    }

    pub fn with_executor(executor: RequestExecutor, notifier: Arc<dyn Notifier>) -> Self {
        let (response, _) = watch::channel(ResponseView::default());
        Self {
            shared: Arc::new(Shared {
                executor,
                notifier,
                response,
                loading: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
            form: RequestForm::default(),
            url_invalid: false,
            focus: None,
            display: DisplayOptions::default(),
            scheduler: PollScheduler::new(),
        }
    }

    // -- form --------------------------------------------------------------

    pub fn form(&self) -> &RequestForm {
        &self.form
    }

    pub fn set_method(&mut self, method: HttpMethod) {
        self.form.method = method;
    }

    /// Editing the URL clears its invalid mark.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.form.url = url.into();
        self.url_invalid = false;
    }

    pub fn set_headers(&mut self, text: impl Into<String>) {
        self.form.headers = text.into();
    }

    pub fn set_body(&mut self, text: impl Into<String>) {
        self.form.body = text.into();
    }

    pub fn url_invalid(&self) -> bool {
        self.url_invalid
    }

    pub fn focused_field(&self) -> Option<FormField> {
        self.focus
    }

    pub fn display(&self) -> DisplayOptions {
        self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayOptions {
        &mut self.display
    }

    // -- response ----------------------------------------------------------

    pub fn response(&self) -> ResponseView {
        self.shared.response.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResponseView> {
        self.shared.response.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    // -- manual request ----------------------------------------------------

    /// Send the current form once.
    ///
    /// Rejected as `Busy` while a request or a polling session holds the
    /// loading flag. Validation and fetch failures are also reported to the
    /// notifier.
    pub async fn submit(&mut self) -> Result<Outcome, ProbeError> {
        if self.is_loading() {
            return Err(ProbeError::Busy);
        }
        let config = self.validated_config()?;

        // `&mut self` is held across the await, so polling cannot start
        // while the guard is alive.
        let shared = Arc::clone(&self.shared);
        let loading = LoadingGuard::acquire(&shared.loading).ok_or(ProbeError::Busy)?;
        let result = shared.dispatch(&config, None).await;
        drop(loading);
        result
    }

    // -- polling -----------------------------------------------------------

    pub fn poll_phase(&self) -> PollPhase {
        self.scheduler.phase()
    }

    pub fn poll_state(&self) -> PollState {
        self.scheduler.state()
    }

    /// Tick the polling control on: open the interval prompt.
    pub fn enable_polling(&mut self) -> Result<(), ProbeError> {
        if !self.form.has_url() {
            return Err(self.reject(ProbeError::EmptyUrl));
        }
        self.scheduler.arm()?;
        self.focus = Some(FormField::PollInterval);
        Ok(())
    }

    pub fn set_poll_interval(&mut self, interval_ms: u64) -> Result<(), ProbeError> {
        self.scheduler.set_interval(interval_ms)
    }

    /// Confirm the interval prompt and start ticking.
    ///
    /// The form is validated and captured once here; later edits do not
    /// affect the running session. On any rejection polling stays armed.
    pub fn confirm_polling(&mut self) -> Result<(), ProbeError> {
        if self.scheduler.phase() != PollPhase::Armed {
            return Err(ProbeError::InvalidTransition {
                action: "confirm the polling interval",
                phase: self.scheduler.phase().as_str(),
            });
        }
        if let Err(e) = self.scheduler.check_interval() {
            self.focus = Some(FormField::PollInterval);
            return Err(self.reject(e));
        }
        let config = self.validated_config()?;

        let generation = self.shared.next_session();
        let shared = Arc::clone(&self.shared);
        self.scheduler.start(move |_tick| {
            let shared = Arc::clone(&shared);
            let config = config.clone();
            tokio::spawn(async move {
                // Failures were already reported through the notifier.
                let _ = shared.dispatch(&config, Some(generation)).await;
            });
        })?;
        self.shared.loading.store(true, Ordering::SeqCst);
        self.focus = None;
        Ok(())
    }

    /// Close the interval prompt without starting.
    pub fn cancel_polling_prompt(&mut self) -> Result<(), ProbeError> {
        self.scheduler.cancel_arm()?;
        self.focus = None;
        Ok(())
    }

    /// Tick the polling control off. Tears down the timer, clears the
    /// loading flag and retires the session so late results are dropped.
    /// Safe to call in any phase, any number of times.
    pub fn disable_polling(&mut self) {
        let was_running = self.scheduler.stop();
        if was_running {
            self.shared.retire_session();
            self.shared.loading.store(false, Ordering::SeqCst);
        }
        if self.focus == Some(FormField::PollInterval) {
            self.focus = None;
        }
    }

    /// Release the timer. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.disable_polling();
        info!("controller shut down");
    }

    // -- helpers -----------------------------------------------------------

    fn validated_config(&mut self) -> Result<RequestConfig, ProbeError> {
        self.form.to_config().map_err(|e| {
            self.focus = Some(match e {
                ProbeError::MalformedHeaders(_) => FormField::Headers,
                ProbeError::MalformedBody(_) => FormField::Body,
                _ => FormField::Url,
            });
            self.reject(e)
        })
    }

    /// Mark the offending field, notify, and hand the error back.
    fn reject(&mut self, error: ProbeError) -> ProbeError {
        if matches!(error, ProbeError::EmptyUrl) {
            self.url_invalid = true;
            self.focus = Some(FormField::Url);
        }
        self.shared.notifier.notify(&error.to_string());
        error
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.disable_polling();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("form", &self.form)
            .field("url_invalid", &self.url_invalid)
            .field("focus", &self.focus)
            .field("display", &self.display)
            .field("scheduler", &self.scheduler)
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}
