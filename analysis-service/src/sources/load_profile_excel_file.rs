use std::path::PathBuf;

use calamine::{open_workbook, Data, Reader, Xlsx};
use futures::Stream;
use load_analytics::domain::LoadReading;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::csv_layout::{COL_ENTRY_TS, COL_EXPORT_W, COL_IMPORT_W, COL_METER_ID, COL_METER_TS};
use crate::pipeline::{PipelineError, Source};

/// Raw head-end Excel export source. Reads the first worksheet of each
/// workbook; the first row is the header and columns are matched by name.
///
/// The exports are messy: datetimes are text like
/// `May 10, 2023, 00:00:00:123456` (colon before the microseconds), power
/// cells are sometimes text or blank. Rows whose datetimes do not parse or
/// whose meter id is empty are dropped and counted; power cells that are not
/// numeric coerce to 0.
pub struct LoadProfileExcelSource {
    paths: Vec<PathBuf>,
}

impl LoadProfileExcelSource {
    pub fn new<P: Into<PathBuf>>(paths: Vec<P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Head-end datetime layout after separator repair.
const EXPORT_TS_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day], [year], [hour]:[minute]:[second].[subsecond]");

/// The export writes `HH:MM:SS:ffffff`; turn the last colon into a decimal
/// point so the subseconds parse.
fn fix_subsecond_separator(s: &str) -> String {
    if let Some((head, tail)) = s.rsplit_once(':') {
        if tail.len() == 6
            && tail.bytes().all(|b| b.is_ascii_digit())
            && head.matches(':').count() >= 2
        {
            return format!("{head}.{tail}");
        }
    }
    s.to_string()
}

fn parse_export_timestamp(s: &str) -> Result<PrimitiveDateTime, String> {
    let repaired = fix_subsecond_separator(s.trim());
    PrimitiveDateTime::parse(&repaired, EXPORT_TS_FORMAT)
        .map_err(|e| format!("invalid datetime '{s}': {e}"))
}

fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell {
        Some(Data::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Data::Int(i)) => Some(i.to_string()),
        Some(Data::Float(f)) => Some(f.to_string()),
        _ => None,
    }
}

/// Numeric coercion for power cells: anything that is not a number becomes 0.
fn cell_power(cell: Option<&Data>) -> f64 {
    match cell {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

struct ColumnIndexes {
    entry_ts: usize,
    meter_ts: usize,
    meter_id: usize,
    import_w: usize,
    export_w: Option<usize>,
}

impl ColumnIndexes {
    fn from_header(header: &[Data]) -> Result<Self, PipelineError> {
        let position = |name: &str| -> Option<usize> {
            header.iter().position(|cell| match cell {
                Data::String(s) => s.trim() == name,
                _ => false,
            })
        };
        let required = |name: &str| -> Result<usize, PipelineError> {
            position(name).ok_or_else(|| {
                PipelineError::Source(format!("missing column '{name}' in Excel header"))
            })
        };

        Ok(Self {
            entry_ts: required(COL_ENTRY_TS)?,
            meter_ts: required(COL_METER_TS)?,
            meter_id: required(COL_METER_ID)?,
            import_w: required(COL_IMPORT_W)?,
            export_w: position(COL_EXPORT_W),
        })
    }
}

fn row_to_reading(row: &[Data], cols: &ColumnIndexes) -> Result<LoadReading, String> {
    let entry_text = cell_text(row.get(cols.entry_ts)).ok_or("empty entry datetime cell")?;
    let meter_text = cell_text(row.get(cols.meter_ts)).ok_or("empty meter datetime cell")?;
    let meter_id = cell_text(row.get(cols.meter_id)).ok_or("empty meter id cell")?;

    Ok(LoadReading {
        entry_ts: parse_export_timestamp(&entry_text)?,
        meter_ts: parse_export_timestamp(&meter_text)?,
        meter_id,
        import_w: cell_power(row.get(cols.import_w)),
        export_w: cols.export_w.map(|idx| cell_power(row.get(idx))).unwrap_or(0.0),
    })
}

#[async_trait::async_trait]
impl Source<LoadReading> for LoadProfileExcelSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<LoadReading, PipelineError>> + Send>> {
        let paths = self.paths.clone();
        let s = async_stream::try_stream! {
            for path in &paths {
                let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
                    PipelineError::Source(format!("failed to open Excel file {}: {e}", path.display()))
                })?;

                let sheet_names = workbook.sheet_names().to_vec();
                let first_sheet = sheet_names.first().ok_or_else(|| {
                    PipelineError::Source(format!("no sheets in {}", path.display()))
                })?;
                let range = workbook.worksheet_range(first_sheet).map_err(|e| {
                    PipelineError::Source(format!("failed to read worksheet: {e}"))
                })?;

                let mut rows = range.rows();
                let header = rows.next().ok_or_else(|| {
                    PipelineError::Source(format!("empty worksheet in {}", path.display()))
                })?;
                let cols = ColumnIndexes::from_header(header)?;

                let mut dropped: u64 = 0;
                for row in rows {
                    if row.iter().all(|cell| matches!(cell, Data::Empty)) {
                        continue;
                    }
                    let reading = match row_to_reading(row, &cols) {
                        Ok(reading) => reading,
                        Err(e) => {
                            dropped += 1;
                            metrics::counter!("load_profile_excel_dropped_rows_total").increment(1);
                            tracing::debug!(error = %e, "dropped unparseable Excel row");
                            continue;
                        }
                    };
                    yield reading;
                }
                if dropped > 0 {
                    tracing::info!(file = %path.display(), dropped, "dropped rows with invalid values");
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn subsecond_separator_is_repaired() {
        assert_eq!(
            fix_subsecond_separator("May 10, 2023, 00:30:00:123456"),
            "May 10, 2023, 00:30:00.123456"
        );
        // already correct: untouched
        assert_eq!(
            fix_subsecond_separator("May 10, 2023, 00:30:00.123456"),
            "May 10, 2023, 00:30:00.123456"
        );
        // too few digits after the last colon: untouched
        assert_eq!(fix_subsecond_separator("00:30:00"), "00:30:00");
    }

    #[test]
    fn export_timestamps_parse_after_repair() {
        let ts = parse_export_timestamp("May 10, 2023, 21:30:00:000000").unwrap();
        assert_eq!(ts, datetime!(2023-05-10 21:30:00));

        assert!(parse_export_timestamp("May 10, 2023, 21:30:00").is_err());
        assert!(parse_export_timestamp("garbage").is_err());
    }

    #[test]
    fn power_cells_coerce_to_zero() {
        assert_eq!(cell_power(Some(&Data::Float(12.5))), 12.5);
        assert_eq!(cell_power(Some(&Data::Int(7))), 7.0);
        assert_eq!(cell_power(Some(&Data::String("  8.25 ".to_string()))), 8.25);
        assert_eq!(cell_power(Some(&Data::String("n/a".to_string()))), 0.0);
        assert_eq!(cell_power(Some(&Data::Empty)), 0.0);
        assert_eq!(cell_power(None), 0.0);
    }

    #[test]
    fn rows_with_bad_datetimes_are_rejected() {
        let header = vec![
            Data::String(COL_ENTRY_TS.to_string()),
            Data::String(COL_METER_TS.to_string()),
            Data::String(COL_METER_ID.to_string()),
            Data::String(COL_IMPORT_W.to_string()),
            Data::String(COL_EXPORT_W.to_string()),
        ];
        let cols = ColumnIndexes::from_header(&header).unwrap();

        let good = vec![
            Data::String("May 10, 2023, 00:05:00:000000".to_string()),
            Data::String("May 10, 2023, 00:00:00:000000".to_string()),
            Data::String("KFM2020660190982".to_string()),
            Data::Float(450.0),
            Data::Float(0.0),
        ];
        let reading = row_to_reading(&good, &cols).unwrap();
        assert_eq!(reading.meter_ts, datetime!(2023-05-10 00:00:00));
        assert_eq!(reading.import_w, 450.0);

        let mut bad = good.clone();
        bad[1] = Data::String("not a datetime".to_string());
        assert!(row_to_reading(&bad, &cols).is_err());

        let mut no_meter = good;
        no_meter[2] = Data::Empty;
        assert!(row_to_reading(&no_meter, &cols).is_err());
    }
}
