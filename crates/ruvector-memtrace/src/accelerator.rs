//! Accelerator memory backends and framework cache hooks.

use crate::error::{MemtraceError, Result};
use libloading::{Library, Symbol};
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Query interface over a device-memory reporting library.
///
/// Real implementations wrap NVML ([`NvmlBackend`]). Use
/// [`MockAccelerator`] for deterministic tests.
pub trait AcceleratorBackend: Send {
    fn name(&self) -> &'static str;

    fn init(&mut self) -> Result<()>;

    fn shutdown(&mut self) -> Result<()>;

    fn device_count(&mut self) -> Result<u32>;

    /// Used bytes on device `index`.
    fn used_memory(&mut self, index: u32) -> Result<u64>;
}

/// Hook into an ML framework that keeps its own device-memory pool.
///
/// `empty_cache` is called before each accelerator sample so the reading
/// covers live allocations only.
pub trait FrameworkHook: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    fn empty_cache(&self);
}

/// A [`FrameworkHook`] built from a closure.
pub struct CacheFlushFn {
    name: String,
    flush: Box<dyn Fn() + Send + Sync>,
}

impl CacheFlushFn {
    pub fn new(name: impl Into<String>, flush: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            flush: Box::new(flush),
        }
    }
}

impl FrameworkHook for CacheFlushFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn empty_cache(&self) {
        (self.flush)()
    }
}

// NVML C ABI
type NvmlReturn = i32;
type NvmlDevice = *mut c_void;

type GetHandleFn = unsafe extern "C" fn(u32, *mut NvmlDevice) -> NvmlReturn;
type GetMemoryFn = unsafe extern "C" fn(NvmlDevice, *mut NvmlMemory) -> NvmlReturn;

const NVML_SUCCESS: NvmlReturn = 0;

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct NvmlMemory {
    total: u64,
    free: u64,
    used: u64,
}

#[cfg(target_os = "windows")]
const NVML_LIBRARIES: &[&str] = &["nvml.dll"];
#[cfg(not(target_os = "windows"))]
const NVML_LIBRARIES: &[&str] = &["libnvidia-ml.so.1", "libnvidia-ml.so"];

/// NVIDIA management library, loaded at runtime.
pub struct NvmlBackend {
    lib: Library,
}

impl NvmlBackend {
    /// Load the NVML shared library. Fails when no driver is installed.
    pub fn load() -> Result<Self> {
        let mut last_err = String::from("no candidate library names");
        for name in NVML_LIBRARIES {
            // SAFETY: NVML has no library constructors with preconditions.
            match unsafe { Library::new(name) } {
                Ok(lib) => return Ok(Self { lib }),
                Err(e) => last_err = format!("{name}: {e}"),
            }
        }
        Err(MemtraceError::AcceleratorUnavailable(last_err))
    }

    unsafe fn symbol<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>> {
        unsafe {
            self.lib.get(name).map_err(|_| {
                MemtraceError::AcceleratorUnavailable(format!(
                    "missing symbol {}",
                    String::from_utf8_lossy(name).trim_end_matches('\0')
                ))
            })
        }
    }

    fn check(code: NvmlReturn, device: u32) -> Result<()> {
        if code == NVML_SUCCESS {
            Ok(())
        } else {
            Err(MemtraceError::AcceleratorQuery { device, code })
        }
    }
}

impl AcceleratorBackend for NvmlBackend {
    fn name(&self) -> &'static str {
        "nvml"
    }

    fn init(&mut self) -> Result<()> {
        unsafe {
            let init: Symbol<unsafe extern "C" fn() -> NvmlReturn> = self.symbol(b"nvmlInit_v2\0")?;
            let code = init();
            if code != NVML_SUCCESS {
                return Err(MemtraceError::AcceleratorUnavailable(format!(
                    "nvmlInit_v2 returned {code}"
                )));
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        unsafe {
            let shutdown: Symbol<unsafe extern "C" fn() -> NvmlReturn> =
                self.symbol(b"nvmlShutdown\0")?;
            Self::check(shutdown(), 0)
        }
    }

    fn device_count(&mut self) -> Result<u32> {
        unsafe {
            let get_count: Symbol<unsafe extern "C" fn(*mut u32) -> NvmlReturn> =
                self.symbol(b"nvmlDeviceGetCount_v2\0")?;
            let mut count = 0u32;
            Self::check(get_count(&mut count), 0)?;
            Ok(count)
        }
    }

    fn used_memory(&mut self, index: u32) -> Result<u64> {
        unsafe {
            let get_handle: Symbol<GetHandleFn> = self.symbol(b"nvmlDeviceGetHandleByIndex_v2\0")?;
            let get_memory: Symbol<GetMemoryFn> = self.symbol(b"nvmlDeviceGetMemoryInfo\0")?;

            let mut handle: NvmlDevice = std::ptr::null_mut();
            Self::check(get_handle(index, &mut handle), index)?;
            let mut info = NvmlMemory::default();
            Self::check(get_memory(handle, &mut info), index)?;
            Ok(info.used)
        }
    }
}

/// Counters shared between a [`MockAccelerator`] and the test holding it.
#[derive(Debug, Default)]
pub struct MockCounters {
    pub inits: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub queries: AtomicUsize,
}

/// A mock accelerator with fixed per-device usage.
pub struct MockAccelerator {
    pub used: Vec<u64>,
    pub fail_init: bool,
    pub counters: Arc<MockCounters>,
}

impl MockAccelerator {
    pub fn new(used: Vec<u64>) -> Self {
        Self {
            used,
            fail_init: false,
            counters: Arc::new(MockCounters::default()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::new(Vec::new())
        }
    }
}

impl AcceleratorBackend for MockAccelerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn init(&mut self) -> Result<()> {
        self.counters.inits.fetch_add(1, Ordering::Relaxed);
        if self.fail_init {
            return Err(MemtraceError::AcceleratorUnavailable("mock init failure".into()));
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.counters.shutdowns.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn device_count(&mut self) -> Result<u32> {
        Ok(self.used.len() as u32)
    }

    fn used_memory(&mut self, index: u32) -> Result<u64> {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);
        self.used
            .get(index as usize)
            .copied()
            .ok_or(MemtraceError::AcceleratorQuery { device: index, code: -1 })
    }
}
