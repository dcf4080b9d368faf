use std::collections::BTreeSet;
use std::path::PathBuf;

use futures::StreamExt;
use load_analytics::domain::LoadReading;

use crate::csv_layout::{CLEANED_HEADER, TIMESTAMP_FORMAT};
use crate::pipeline::{PipelineError, Sink};

/// Writes the combined cleaned load profile as CSV.
///
/// Buffers the whole stream so the output can be sorted by (meter id, entry
/// timestamp). Rejected upstream records are counted and skipped.
pub struct CleanedCsvSink {
    path: PathBuf,
}

impl CleanedCsvSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn write_rows(&self, rows: &[LoadReading]) -> Result<(), PipelineError> {
        let sink_err = |e: String| PipelineError::Sink(e);

        let mut wtr = csv::Writer::from_path(&self.path)
            .map_err(|e| sink_err(format!("failed to create {}: {e}", self.path.display())))?;
        wtr.write_record(CLEANED_HEADER)
            .map_err(|e| sink_err(format!("failed to write CSV header: {e}")))?;

        for r in rows {
            let entry_ts = r
                .entry_ts
                .format(TIMESTAMP_FORMAT)
                .map_err(|e| sink_err(format!("failed to format timestamp: {e}")))?;
            let meter_ts = r
                .meter_ts
                .format(TIMESTAMP_FORMAT)
                .map_err(|e| sink_err(format!("failed to format timestamp: {e}")))?;
            let import_w = r.import_w.to_string();
            let export_w = r.export_w.to_string();
            wtr.write_record([
                entry_ts.as_str(),
                meter_ts.as_str(),
                r.meter_id.as_str(),
                import_w.as_str(),
                export_w.as_str(),
            ])
            .map_err(|e| sink_err(format!("failed to write CSV record: {e}")))?;
        }

        wtr.flush()
            .map_err(|e| sink_err(format!("failed to flush CSV: {e}")))?;
        Ok(())
    }
}

fn log_summary(rows: &[LoadReading]) {
    if rows.is_empty() {
        return;
    }

    let meters: BTreeSet<&str> = rows.iter().map(|r| r.meter_id.as_str()).collect();
    let (Some(first_ts), Some(last_ts)) = (
        rows.iter().map(|r| r.entry_ts).min(),
        rows.iter().map(|r| r.entry_ts).max(),
    ) else {
        return;
    };

    let n = rows.len() as f64;
    let avg_import = rows.iter().map(|r| r.import_w).sum::<f64>() / n;
    let max_import = rows.iter().map(|r| r.import_w).fold(f64::MIN, f64::max);
    let avg_export = rows.iter().map(|r| r.export_w).sum::<f64>() / n;
    let max_export = rows.iter().map(|r| r.export_w).fold(f64::MIN, f64::max);

    tracing::info!(
        records = rows.len(),
        unique_meters = meters.len(),
        first_ts = %first_ts,
        last_ts = %last_ts,
        avg_import_w = avg_import,
        max_import_w = max_import,
        avg_export_w = avg_export,
        max_export_w = max_export,
        "combined load profile statistics"
    );
}

#[async_trait::async_trait]
impl Sink<LoadReading> for CleanedCsvSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<LoadReading, PipelineError>> + Send + Unpin + 'static,
    {
        let mut rows: Vec<LoadReading> = Vec::new();

        while let Some(item) = input.next().await {
            match item {
                Ok(r) => rows.push(r),
                Err(PipelineError::Transform(e)) => {
                    metrics::counter!("cleaning_rejected_records_total").increment(1);
                    tracing::warn!(error = %e, "rejected record during cleaning");
                }
                Err(e) => return Err(e),
            }
        }

        rows.sort_by(|a, b| {
            (a.meter_id.as_str(), a.entry_ts).cmp(&(b.meter_id.as_str(), b.entry_ts))
        });

        self.write_rows(&rows)?;
        metrics::counter!("cleaned_records_written_total").increment(rows.len() as u64);
        tracing::info!(
            records = rows.len(),
            path = %self.path.display(),
            "cleaned load profile written"
        );
        log_summary(&rows);

        Ok(())
    }
}
