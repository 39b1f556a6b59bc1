pub mod invoice;
pub mod pricing;

pub use invoice::InvoiceService;
