use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// The combined cleaned CSV, written by `clean_load_profile` and read by
    /// the analysis jobs.
    pub combined_csv: PathBuf,
    /// Optional cap on loaded rows for the anomaly scan.
    pub max_records: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub out_dir: PathBuf,
    /// How many top-ranked meters get per-meter profile exports.
    pub top_meters: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ANALYSIS_CONFIG").unwrap_or_else(|_| "analysis-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_from_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [input]
            combined_csv = "combined_load_profile_electrical.csv"
            max_records = 500000

            [report]
            out_dir = "reports"
            top_meters = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.input.max_records, Some(500_000));
        assert_eq!(cfg.report.top_meters, 5);
        assert_eq!(cfg.report.out_dir, PathBuf::from("reports"));
    }

    #[test]
    fn max_records_is_optional() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [input]
            combined_csv = "combined.csv"

            [report]
            out_dir = "reports"
            top_meters = 3
            "#,
        )
        .unwrap();

        assert!(cfg.input.max_records.is_none());
    }
}
