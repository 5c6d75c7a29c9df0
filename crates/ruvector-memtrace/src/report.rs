use crate::summary::{MemoryState, TraceSummary};

/// Number of entries shown in the top and bottom cumulative listings.
pub const REPORT_EXTREMES: usize = 6;

/// `<file>:<line>: mem <combined>: <source text>`
pub fn format_state(state: &MemoryState) -> String {
    format!(
        "{}:{}: mem {}: {}",
        state.frame.filename,
        state.frame.line_number,
        state.cpu_gpu.human(),
        state.frame.line_text
    )
}

/// Line-by-line listing, top and bottom consumers, and the total.
///
/// Listing lines use human-readable units; the total is whole megabytes.
pub fn format_memory_trace_statistics(summary: &TraceSummary) -> String {
    let sequential: Vec<String> = summary.sequential.iter().map(format_state).collect();
    let top: Vec<String> = summary
        .cumulative
        .iter()
        .take(REPORT_EXTREMES)
        .map(|s| format!("=> {}", format_state(s)))
        .collect();
    let tail_start = summary.cumulative.len().saturating_sub(REPORT_EXTREMES);
    let bottom: Vec<String> = summary.cumulative[tail_start..]
        .iter()
        .map(|s| format!("=> {}", format_state(s)))
        .collect();

    format!(
        "\nLines by line memory consumption:\n{}\n\
         \nLines with top memory consumption:\n{}\n\
         \nLines with lowest memory consumption:\n{}\n\
         \nTotal memory increase: {}",
        sequential.join("\n"),
        top.join("\n"),
        bottom.join("\n"),
        summary.total
    )
}
