pub mod chart;
pub mod records;

pub use records::RecordsService;
