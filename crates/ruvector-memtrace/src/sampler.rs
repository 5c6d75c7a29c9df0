use crate::accelerator::{AcceleratorBackend, FrameworkHook, NvmlBackend};
use crate::config::{AcceleratorScope, TraceConfig};
use crate::error::Result;
use crate::memory::{detect_host, HostMemorySource, MemorySample};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads host and accelerator memory for a tracing session.
///
/// Backends are chosen once, when the sampler is built. A missing backend is
/// reported with a single warning and reads as zero afterwards.
pub struct MemorySampler {
    host: Option<Box<dyn HostMemorySource>>,
    accelerator: Option<AcceleratorSession>,
    frameworks: Vec<Arc<dyn FrameworkHook>>,
}

impl MemorySampler {
    /// Detect the host backend and try to load NVML.
    pub fn detect(config: &TraceConfig) -> Self {
        let accelerator = match NvmlBackend::load() {
            Ok(nvml) => Some(Box::new(nvml) as Box<dyn AcceleratorBackend>),
            Err(e) => {
                warn!("No accelerator memory library ({e}), accelerator memory will not be traced");
                None
            }
        };
        Self::new(config, detect_host(), accelerator)
    }

    pub fn new(
        config: &TraceConfig,
        host: Option<Box<dyn HostMemorySource>>,
        accelerator: Option<Box<dyn AcceleratorBackend>>,
    ) -> Self {
        if host.is_none() {
            warn!("No host memory backend available, host memory will read as 0");
        }

        let framework_present = config.frameworks.iter().any(|f| f.is_available());
        let accelerator = match accelerator {
            None => None,
            Some(_) if !framework_present => {
                info!("No framework hook available, accelerator memory will not be traced");
                None
            }
            Some(backend) => {
                let name = backend.name();
                match AcceleratorSession::open(
                    backend,
                    config.gpus_to_trace.as_deref(),
                    config.accelerator_scope,
                ) {
                    Ok(session) => {
                        debug!(
                            backend = name,
                            devices = ?session.devices,
                            "accelerator tracing enabled"
                        );
                        Some(session)
                    }
                    Err(e) => {
                        warn!(
                            "Error while initializing communication with accelerator ({e}), \
                             accelerator memory will not be traced"
                        );
                        None
                    }
                }
            }
        };

        Self {
            host,
            accelerator,
            frameworks: config.frameworks.clone(),
        }
    }

    /// A sampler with no backends; every reading is zero.
    pub fn disabled() -> Self {
        Self {
            host: None,
            accelerator: None,
            frameworks: Vec::new(),
        }
    }

    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    pub fn has_accelerator(&self) -> bool {
        self.accelerator.is_some()
    }

    /// Resident bytes of this process, 0 without a host backend.
    pub fn sample_host(&mut self) -> u64 {
        self.host.as_mut().map_or(0, |h| h.resident_bytes())
    }

    /// Used bytes summed over the traced devices, 0 without an accelerator.
    ///
    /// Framework caches are flushed first.
    pub fn sample_accelerator(&mut self) -> u64 {
        let Some(session) = self.accelerator.as_mut() else {
            return 0;
        };
        for hook in self.frameworks.iter().filter(|h| h.is_available()) {
            hook.empty_cache();
        }
        session.used_bytes()
    }

    pub fn sample(&mut self) -> MemorySample {
        let host_bytes = self.sample_host();
        let accelerator_bytes = self.sample_accelerator();
        MemorySample {
            host_bytes,
            accelerator_bytes,
        }
    }
}

struct AcceleratorSession {
    backend: Box<dyn AcceleratorBackend>,
    devices: Vec<u32>,
    scope: AcceleratorScope,
    initialized: bool,
}

impl AcceleratorSession {
    fn open(
        mut backend: Box<dyn AcceleratorBackend>,
        requested: Option<&[u32]>,
        scope: AcceleratorScope,
    ) -> Result<Self> {
        backend.init()?;
        let devices = match backend.device_count() {
            Ok(count) => match requested {
                Some(ids) => ids.to_vec(),
                None => (0..count).collect(),
            },
            Err(e) => {
                let _ = backend.shutdown();
                return Err(e);
            }
        };
        let mut session = Self {
            backend,
            devices,
            scope,
            initialized: true,
        };
        if scope == AcceleratorScope::PerSample {
            session.release();
        }
        Ok(session)
    }

    fn used_bytes(&mut self) -> u64 {
        if !self.initialized {
            if let Err(e) = self.backend.init() {
                debug!("accelerator init failed while sampling: {e}");
                return 0;
            }
            self.initialized = true;
        }

        let count = self.backend.device_count().unwrap_or(0);
        let mut total = 0u64;
        for &device in &self.devices {
            if device >= count {
                debug!(device, count, "traced device index no longer valid");
                continue;
            }
            match self.backend.used_memory(device) {
                Ok(bytes) => total = total.saturating_add(bytes),
                Err(e) => debug!("accelerator query failed: {e}"),
            }
        }

        if self.scope == AcceleratorScope::PerSample {
            self.release();
        }
        total
    }

    fn release(&mut self) {
        if self.initialized {
            if let Err(e) = self.backend.shutdown() {
                debug!("accelerator shutdown failed: {e}");
            }
            self.initialized = false;
        }
    }
}

impl Drop for AcceleratorSession {
    fn drop(&mut self) {
        self.release();
    }
}
