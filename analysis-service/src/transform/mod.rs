use std::collections::HashSet;
use std::sync::Mutex;

use load_analytics::domain::LoadReading;
use time::macros::datetime;
use time::PrimitiveDateTime;

use crate::pipeline::{PipelineError, Transform};

const MIN_TS: PrimitiveDateTime = datetime!(2000-01-01 00:00:00);
const MAX_TS: PrimitiveDateTime = datetime!(2100-01-01 00:00:00);

/// Pure validation of a `LoadReading`.
///
/// Rules:
/// - import and export power must be finite and non-negative.
/// - both timestamps must be within a broad sanity window
///   [2000-01-01, 2100-01-01].
pub fn validate_reading(r: &LoadReading) -> Result<(), PipelineError> {
    if !r.import_w.is_finite() || r.import_w < 0.0 {
        return Err(PipelineError::Transform(format!(
            "import power must be a non-negative number, got {}",
            r.import_w
        )));
    }
    if !r.export_w.is_finite() || r.export_w < 0.0 {
        return Err(PipelineError::Transform(format!(
            "export power must be a non-negative number, got {}",
            r.export_w
        )));
    }

    for ts in [r.entry_ts, r.meter_ts] {
        if ts < MIN_TS || ts > MAX_TS {
            return Err(PipelineError::Transform(
                "timestamp out of allowed range".to_string(),
            ));
        }
    }

    Ok(())
}

#[derive(Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<LoadReading> for ReadingValidation {
    async fn apply(&self, input: LoadReading) -> Result<Option<LoadReading>, PipelineError> {
        match validate_reading(&input) {
            Ok(()) => Ok(Some(input)),
            Err(e) => {
                metrics::counter!("validation_reading_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_ts(hasher: &mut blake3::Hasher, ts: PrimitiveDateTime) {
    hasher.update(&ts.assume_utc().unix_timestamp_nanos().to_le_bytes());
}

fn reading_fingerprint(r: &LoadReading) -> [u8; 32] {
    let mut h = blake3::Hasher::new();
    hash_ts(&mut h, r.entry_ts);
    hash_ts(&mut h, r.meter_ts);
    hash_str(&mut h, &r.meter_id);
    h.update(&r.import_w.to_bits().to_le_bytes());
    h.update(&r.export_w.to_bits().to_le_bytes());
    *h.finalize().as_bytes()
}

/// Drops exact duplicate readings by content hash; the first occurrence
/// wins. The raw exports overlap between files, so duplicates are expected
/// rather than an error.
#[derive(Default)]
pub struct ReadingDedup {
    seen: Mutex<HashSet<[u8; 32]>>,
}

#[async_trait::async_trait]
impl Transform<LoadReading> for ReadingDedup {
    async fn apply(&self, input: LoadReading) -> Result<Option<LoadReading>, PipelineError> {
        let fingerprint = reading_fingerprint(&input);
        let fresh = self
            .seen
            .lock()
            .map_err(|_| PipelineError::Transform("dedup state poisoned".to_string()))?
            .insert(fingerprint);

        if fresh {
            Ok(Some(input))
        } else {
            metrics::counter!("reading_duplicates_dropped_total").increment(1);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> LoadReading {
        LoadReading {
            entry_ts: datetime!(2024-01-01 00:05:00),
            meter_ts: datetime!(2024-01-01 00:00:00),
            meter_id: "m-1".to_string(),
            import_w: 1.0,
            export_w: 0.0,
        }
    }

    #[test]
    fn validation_accepts_valid_reading() {
        assert!(validate_reading(&reading()).is_ok());
    }

    #[test]
    fn validation_rejects_negative_import() {
        let mut r = reading();
        r.import_w = -0.1;
        assert!(matches!(
            validate_reading(&r),
            Err(PipelineError::Transform(_))
        ));
    }

    #[test]
    fn validation_rejects_non_finite_power() {
        let mut r = reading();
        r.import_w = f64::NAN;
        assert!(validate_reading(&r).is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_ts() {
        let mut r = reading();
        r.meter_ts = datetime!(1800-01-01 00:00:00);
        assert!(matches!(
            validate_reading(&r),
            Err(PipelineError::Transform(_))
        ));
    }

    #[tokio::test]
    async fn dedup_keeps_first_occurrence_only() {
        let dedup = ReadingDedup::default();

        let first = dedup.apply(reading()).await.unwrap();
        assert!(first.is_some());

        let second = dedup.apply(reading()).await.unwrap();
        assert!(second.is_none());

        // a different value is not a duplicate
        let mut other = reading();
        other.import_w = 2.0;
        let third = dedup.apply(other).await.unwrap();
        assert!(third.is_some());
    }
}
