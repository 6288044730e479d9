pub mod coverage;
pub mod health;
pub mod index;
pub mod report_files;
