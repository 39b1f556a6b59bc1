pub mod availability;
pub mod catalog;
pub mod clock;
pub mod form;
pub mod selector;
pub mod session;
pub mod slots;
pub mod store;

pub use availability::{AvailabilitySource, BookedAvailability, FixedAvailability, RandomAvailability};
pub use catalog::Catalog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use form::{BookingAction, BookingEvent, BookingFormController, FormView};
pub use selector::{SelectionOutcome, SlotSelector};
pub use session::{BookingSession, BookingState};
pub use slots::SlotGenerator;
pub use store::AppointmentStore;
