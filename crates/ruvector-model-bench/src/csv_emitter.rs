use crate::error::{BenchError, Result};
use crate::results::ResultTable;
use std::path::Path;

/// Header of every results CSV.
pub const RESULT_COLUMNS: [&str; 4] = ["model", "batch_size", "sequence_length", "result"];

/// Write one result table to `path`, replacing any existing file.
///
/// One row per filled (model, batch size, sequence length) cell, in model
/// then grid order.
pub fn write_results_csv(path: &Path, table: &ResultTable) -> Result<()> {
    if table.model_names.is_empty() {
        return Err(BenchError::NoModels);
    }

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(RESULT_COLUMNS)?;
    for name in &table.model_names {
        let Some(model) = table.model(name) else {
            continue;
        };
        for (bs, ss, value) in model.cells() {
            wtr.write_record([name.clone(), bs.to_string(), ss.to_string(), value.csv_value()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}
