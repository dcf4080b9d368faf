use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use futures::Stream;
use load_analytics::domain::LoadReading;
use time::PrimitiveDateTime;

use crate::csv_layout::{
    COL_ENTRY_TS, COL_EXPORT_W, COL_IMPORT_W, COL_METER_ID, COL_METER_TS, TIMESTAMP_FORMAT,
};
use crate::pipeline::{PipelineError, Source};

/// CSV source for cleaned load-profile data (the combined export or a
/// single-meter slice of it).
///
/// Expected header columns (by name):
/// - Entry Datetime (`YYYY-MM-DD HH:MM:SS`)
/// - Meter Datetime (`YYYY-MM-DD HH:MM:SS`)
/// - HES Meter Id
/// - Import active power (QI+QIV)[W]
/// - Export active power (QII+QIII)[W] (optional)
///
/// Cleaned data is expected to be well-typed, so a malformed record fails
/// the stream rather than being skipped.
pub struct LoadProfileCsvFileSource {
    path: PathBuf,
}

impl LoadProfileCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn parse_timestamp(s: &str, column: &str) -> Result<PrimitiveDateTime, PipelineError> {
    PrimitiveDateTime::parse(s.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| PipelineError::Source(format!("invalid {column} '{s}': {e}")))
}

fn record_to_reading(
    record: &StringRecord,
    headers: &csv::StringRecord,
) -> Result<LoadReading, PipelineError> {
    let get = |name: &str| -> Result<&str, PipelineError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| PipelineError::Source(format!("missing column '{name}' in CSV record")))
    };

    let entry_ts = parse_timestamp(get(COL_ENTRY_TS)?, COL_ENTRY_TS)?;
    let meter_ts = parse_timestamp(get(COL_METER_TS)?, COL_METER_TS)?;
    let meter_id = get(COL_METER_ID)?.trim().to_string();

    let import_str = get(COL_IMPORT_W)?;
    let import_w: f64 = import_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid import power '{import_str}': {e}")))?;

    // Export power is carried through cleaning but not every slice has it.
    let export_w = get(COL_EXPORT_W)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0.0);

    Ok(LoadReading {
        entry_ts,
        meter_ts,
        meter_id,
        import_w,
        export_w,
    })
}

#[async_trait::async_trait]
impl Source<LoadReading> for LoadProfileCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<LoadReading, PipelineError>> + Send>> {
        // This source uses a blocking CSV reader but is wrapped in a single
        // async task. For large files, you might want to move this onto a
        // dedicated thread pool.
        let path = self.path.clone();
        let s = async_stream::try_stream! {
            let file = File::open(&path)
                .map_err(|e| PipelineError::Source(format!("failed to open CSV file: {e}")))?;
            let mut rdr = csv::Reader::from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
                .clone();

            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read CSV record: {e}"
                )))?;

                let reading = match record_to_reading(&record, &headers) {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("load_profile_csv_parse_errors_total").increment(1);
                        Err(e)?
                    }
                };

                yield reading;
            }
        };

        Box::pin(s)
    }
}
