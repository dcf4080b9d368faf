pub mod cleaned_csv;

pub use cleaned_csv::CleanedCsvSink;
