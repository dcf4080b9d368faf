pub mod load_profile_csv_file;
pub mod load_profile_excel_file;

pub use load_profile_csv_file::LoadProfileCsvFileSource;
pub use load_profile_excel_file::LoadProfileExcelSource;
