use parking_lot::Mutex;
use std::sync::Arc;

/// Destination of the runner's human-readable output.
#[derive(Debug, Clone, Default)]
pub enum Printer {
    /// Print to stdout
    #[default]
    Stdout,
    /// Print to stdout and emit every line as an `info` event
    StdoutAndLog,
    /// Collect lines in memory
    Capture(Arc<Mutex<Vec<String>>>),
}

impl Printer {
    pub fn from_log_flag(log_print: bool) -> Self {
        if log_print {
            Printer::StdoutAndLog
        } else {
            Printer::Stdout
        }
    }

    pub fn capture() -> Self {
        Printer::Capture(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn print(&self, msg: &str) {
        match self {
            Printer::Stdout => println!("{msg}"),
            Printer::StdoutAndLog => {
                tracing::info!(target: "ruvector_model_bench::output", "{msg}");
                println!("{msg}");
            }
            Printer::Capture(lines) => lines.lock().push(msg.to_string()),
        }
    }

    /// Captured lines; empty for the stdout variants.
    pub fn captured(&self) -> Vec<String> {
        match self {
            Printer::Capture(lines) => lines.lock().clone(),
            _ => Vec::new(),
        }
    }
}
