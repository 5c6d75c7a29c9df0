//! Process-wide memory tracer
//!
//! Rust has no interpreter-level line hook, so tracing is driven by explicit
//! instrumentation points: [`checkpoint!`](crate::checkpoint) records a
//! `line` event and [`trace_scope!`](crate::trace_scope) records `call` on
//! entry and `return` when its guard drops. Each point samples memory
//! *before* the code that follows it runs, so the delta between two
//! consecutive records is attributed to the first one.
//!
//! At most one session is active per process. [`start_memory_tracing`]
//! claims the process-wide slot and rejects a second start with
//! [`MemtraceError::SessionActive`]; the returned [`TraceHandle`] owns the
//! buffer and releases the slot on [`TraceHandle::stop`] or drop.
//!
//! Checkpoints hit from several threads are serialized by the session lock and
//! land in lock order. Measurements are only meaningful when the traced code
//! runs on one thread.

use crate::config::TraceConfig;
use crate::error::{MemtraceError, Result};
use crate::frame::{Frame, LineCache, Site, TraceEvent};
use crate::memory::MemorySample;
use crate::sampler::MemorySampler;
use crate::summary::{summarize, TraceSummary};
use parking_lot::{const_rwlock, Mutex, RwLock};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// One entry of the trace buffer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraceRecord {
    pub frame: Frame,
    pub sample: MemorySample,
}

/// Ordered trace buffer of a finished session.
pub type MemoryTrace = Vec<TraceRecord>;

static TRACING_ENABLED: AtomicBool = AtomicBool::new(false);
static SESSION_CLAIMED: AtomicBool = AtomicBool::new(false);
static ACTIVE_SESSION: RwLock<Option<Arc<Session>>> = const_rwlock(None);

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Whether a session is currently recording.
pub fn is_memory_tracing_enabled() -> bool {
    TRACING_ENABLED.load(Ordering::Acquire)
}

pub(crate) fn disable_tracing() {
    TRACING_ENABLED.store(false, Ordering::Release);
}

struct Session {
    config: TraceConfig,
    state: Mutex<SessionState>,
}

struct SessionState {
    sampler: MemorySampler,
    lines: LineCache,
    trace: MemoryTrace,
    closed: bool,
}

impl Session {
    fn record(&self, site: Site, event: TraceEvent) {
        if !self.config.accepts(site.module, event) {
            return;
        }
        self.push(site, event);
    }

    fn push(&self, site: Site, event: TraceEvent) {
        // framework cache hooks run under the lock and may be instrumented
        let Some(_hook) = HookGuard::enter() else {
            return;
        };
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        let line_text = state.lines.line(site.file, site.line);
        let frame = Frame {
            filename: site.file.to_string(),
            module: site.module.to_string(),
            line_number: site.line,
            event,
            line_text,
        };
        let sample = state.sampler.sample();
        state.trace.push(TraceRecord { frame, sample });
    }
}

/// Marks the current thread as recording; resets the flag on drop.
struct HookGuard;

impl HookGuard {
    /// `None` when this thread is already recording.
    fn enter() -> Option<Self> {
        if IN_HOOK.with(|f| f.replace(true)) {
            None
        } else {
            Some(HookGuard)
        }
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        IN_HOOK.with(|f| f.set(false));
    }
}

/// Entry point of the instrumentation macros.
///
/// Cheap when tracing is disabled: a single atomic load.
pub fn trace_site(site: Site, event: TraceEvent) {
    if !is_memory_tracing_enabled() {
        return;
    }
    let session = ACTIVE_SESSION.read().clone();
    if let Some(session) = session {
        session.record(site, event);
    }
}

/// Start a session with auto-detected memory backends.
pub fn start_memory_tracing(config: TraceConfig) -> Result<TraceHandle> {
    start_with(config, MemorySampler::detect)
}

/// Start a session that samples through `sampler`.
pub fn start_memory_tracing_with(
    config: TraceConfig,
    sampler: MemorySampler,
) -> Result<TraceHandle> {
    start_with(config, move |_| sampler)
}

fn start_with(
    config: TraceConfig,
    make_sampler: impl FnOnce(&TraceConfig) -> MemorySampler,
) -> Result<TraceHandle> {
    SESSION_CLAIMED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map_err(|_| MemtraceError::SessionActive)?;

    let sampler = make_sampler(&config);
    info!(
        modules = ?config.modules_to_trace,
        excluded = ?config.modules_not_to_trace,
        events = ?config.events_to_trace,
        host = sampler.has_host(),
        accelerator = sampler.has_accelerator(),
        "memory tracing started"
    );
    let session = Arc::new(Session {
        state: Mutex::new(SessionState {
            sampler,
            lines: LineCache::new(config.source_root.clone()),
            trace: Vec::new(),
            closed: false,
        }),
        config,
    });

    *ACTIVE_SESSION.write() = Some(session.clone());
    TRACING_ENABLED.store(true, Ordering::Release);

    Ok(TraceHandle {
        session,
        stopped: false,
    })
}

/// Owner of an active tracing session and its buffer.
pub struct TraceHandle {
    session: Arc<Session>,
    stopped: bool,
}

impl TraceHandle {
    /// Number of records collected so far.
    pub fn len(&self) -> usize {
        self.session.state.lock().trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record through this handle instead of the global hook. Same filters.
    pub fn record(&self, site: Site, event: TraceEvent) {
        if is_memory_tracing_enabled() {
            self.session.record(site, event);
        }
    }

    /// Record a measurement boundary. Bypasses the module and event filters
    /// so a traced region always has a first and a last sample.
    pub fn mark(&self, site: Site) {
        self.session.push(site, TraceEvent::Line);
    }

    /// End the session and take the buffer.
    pub fn stop(mut self) -> MemoryTrace {
        self.teardown();
        let mut state = self.session.state.lock();
        // drops the accelerator session, shutting the library down
        state.sampler = MemorySampler::disabled();
        std::mem::take(&mut state.trace)
    }

    /// End the session and reduce the buffer.
    pub fn stop_and_summarize(self, ignore_released_memory: bool) -> Option<TraceSummary> {
        let trace = self.stop();
        summarize(&trace, ignore_released_memory)
    }

    fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        disable_tracing();
        self.session.state.lock().closed = true;
        {
            let mut slot = ACTIVE_SESSION.write();
            if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, &self.session)) {
                *slot = None;
            }
        }
        SESSION_CLAIMED.store(false, Ordering::Release);
        self.stopped = true;
        debug!(records = self.session.state.lock().trace.len(), "memory tracing stopped");
    }
}

impl Drop for TraceHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Guard returned by [`trace_scope!`](crate::trace_scope); records `return`
/// when dropped.
#[must_use = "the return event is recorded when the guard drops"]
pub struct ScopeGuard {
    site: Site,
}

impl ScopeGuard {
    pub fn enter(site: Site) -> Self {
        trace_site(site, TraceEvent::Call);
        Self { site }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        trace_site(self.site, TraceEvent::Return);
    }
}

/// Run `f` inside a session, with boundary marks before and after it.
pub fn trace_call<R>(
    config: TraceConfig,
    sampler: Option<MemorySampler>,
    f: impl FnOnce() -> R,
) -> Result<(R, MemoryTrace)> {
    let handle = match sampler {
        Some(sampler) => start_memory_tracing_with(config, sampler)?,
        None => start_memory_tracing(config)?,
    };
    handle.mark(crate::site!());
    let out = f();
    handle.mark(crate::site!());
    Ok((out, handle.stop()))
}

/// The [`Site`] of the macro invocation.
#[macro_export]
macro_rules! site {
    () => {
        $crate::frame::Site {
            file: file!(),
            line: line!(),
            module: module_path!(),
        }
    };
}

/// Record a `line` event at this point.
#[macro_export]
macro_rules! checkpoint {
    () => {
        $crate::tracer::trace_site($crate::site!(), $crate::frame::TraceEvent::Line)
    };
}

/// Record `call` now and `return` when the returned guard drops.
#[macro_export]
macro_rules! trace_scope {
    () => {
        $crate::tracer::ScopeGuard::enter($crate::site!())
    };
}
