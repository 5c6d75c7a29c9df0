//! Tracing session configuration

use crate::accelerator::FrameworkHook;
use crate::frame::TraceEvent;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// When the accelerator library is initialized and shut down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorScope {
    /// Init and shutdown around every sample
    PerSample,
    /// Init once at session start, shut down when the session ends.
    /// Device indices are re-validated on every sample.
    #[default]
    PerSession,
}

/// Configuration for a memory tracing session
///
/// Module filters match by substring against the module path of the
/// instrumentation point (`module_path!()`), so `"model::attention"` matches
/// `my_crate::model::attention::softmax`.
#[derive(Clone)]
pub struct TraceConfig {
    /// Only record events whose module contains one of these entries.
    /// `None` records every module.
    pub modules_to_trace: Option<Vec<String>>,

    /// Skip events whose module contains any of these entries.
    pub modules_not_to_trace: Option<Vec<String>>,

    /// Event kinds to record. `None` records every kind.
    /// Default: `Some(vec![TraceEvent::Line])`
    pub events_to_trace: Option<Vec<TraceEvent>>,

    /// Accelerator indices to sum over. `None` sums every device.
    pub gpus_to_trace: Option<Vec<u32>>,

    /// Directory that relative `file!()` paths are resolved against
    /// when reading line text.
    pub source_root: Option<PathBuf>,

    pub accelerator_scope: AcceleratorScope,

    /// Framework cache hooks. Accelerator memory is only sampled when at
    /// least one of them reports itself available.
    pub frameworks: Vec<Arc<dyn FrameworkHook>>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            modules_to_trace: None,
            modules_not_to_trace: None,
            events_to_trace: Some(vec![TraceEvent::Line]),
            gpus_to_trace: None,
            source_root: None,
            accelerator_scope: AcceleratorScope::default(),
            frameworks: Vec::new(),
        }
    }
}

impl TraceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules_to_trace = Some(modules.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules_not_to_trace = Some(modules.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = TraceEvent>) -> Self {
        self.events_to_trace = Some(events.into_iter().collect());
        self
    }

    pub fn all_events(mut self) -> Self {
        self.events_to_trace = None;
        self
    }

    pub fn with_gpus(mut self, gpus: impl IntoIterator<Item = u32>) -> Self {
        self.gpus_to_trace = Some(gpus.into_iter().collect());
        self
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn with_scope(mut self, scope: AcceleratorScope) -> Self {
        self.accelerator_scope = scope;
        self
    }

    pub fn with_framework(mut self, hook: Arc<dyn FrameworkHook>) -> Self {
        self.frameworks.push(hook);
        self
    }

    /// Whether an event at `module` of kind `event` passes the filters.
    pub fn accepts(&self, module: &str, event: TraceEvent) -> bool {
        if let Some(events) = &self.events_to_trace {
            if !events.contains(&event) {
                return false;
            }
        }
        if module.is_empty() {
            return false;
        }
        if let Some(allow) = &self.modules_to_trace {
            if !allow.iter().any(|m| module.contains(m.as_str())) {
                return false;
            }
        }
        if let Some(deny) = &self.modules_not_to_trace {
            if deny.iter().any(|m| module.contains(m.as_str())) {
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for TraceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frameworks: Vec<&str> = self.frameworks.iter().map(|h| h.name()).collect();
        f.debug_struct("TraceConfig")
            .field("modules_to_trace", &self.modules_to_trace)
            .field("modules_not_to_trace", &self.modules_not_to_trace)
            .field("events_to_trace", &self.events_to_trace)
            .field("gpus_to_trace", &self.gpus_to_trace)
            .field("source_root", &self.source_root)
            .field("accelerator_scope", &self.accelerator_scope)
            .field("frameworks", &frameworks)
            .finish()
    }
}
