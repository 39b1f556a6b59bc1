pub mod messaging;
pub mod threads;

pub use messaging::MessagingService;
