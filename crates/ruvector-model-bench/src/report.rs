//! Result table formatting

use crate::results::{Measurement, ResultTable};

/// Lines printed for a result table, model by model in grid order.
///
/// Seconds are rounded to the millisecond and printed without padding (`0.1s`).
pub fn format_results(table: &ResultTable) -> Vec<String> {
    let mut lines = Vec::new();
    for name in &table.model_names {
        lines.push(format!("\t======= MODEL CHECKPOINT: {name} ======="));
        let Some(model) = table.model(name) else {
            continue;
        };
        for (bs, ss, value) in model.cells() {
            lines.push(match value {
                Measurement::Seconds(s) => {
                    format!("\t\t{name}/{bs}/{ss}: {}s", (1000.0 * s).round() / 1000.0)
                }
                Measurement::Memory(m) => format!("\t\t{name}/{bs}/{ss}: {m} MB"),
            });
        }
    }
    lines
}

/// Banner preceding a result table, e.g. `======= INFERENCE - SPEED - RESULT =======`.
pub fn banner(phase: &str, kind: &str) -> String {
    format!("======= {phase} - {kind} - RESULT =======")
}
