pub mod csv_export;
pub mod xlsx_export;
