use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;

use crate::models::TimeSlot;
use crate::services::availability::AvailabilitySource;

pub const SLOTS_PER_DAY: usize = 16;
pub const SLOT_MINUTES: i64 = 30;
pub const FIRST_SLOT_HOUR: u32 = 8;

/// Lays out the bookable half-hour grid of a day (08:00 to 16:00) and asks an
/// availability source which slots are open.
pub struct SlotGenerator<'a, A: AvailabilitySource + ?Sized> {
    availability: &'a A,
}

impl<'a, A: AvailabilitySource + ?Sized> SlotGenerator<'a, A> {
    pub fn new(availability: &'a A) -> Self {
        Self { availability }
    }

    pub fn generate(&self, date: NaiveDate) -> Vec<TimeSlot> {
        self.generate_for(date, None)
    }

    pub fn generate_for(&self, date: NaiveDate, provider: Option<&str>) -> Vec<TimeSlot> {
        let day_start = date.and_time(NaiveTime::default()) + Duration::hours(FIRST_SLOT_HOUR as i64);

        let slots: Vec<TimeSlot> = (0..SLOTS_PER_DAY)
            .map(|i| {
                let start_time = day_start + Duration::minutes(SLOT_MINUTES * i as i64);
                let end_time = start_time + Duration::minutes(SLOT_MINUTES);

                TimeSlot {
                    id: format!("slot-{}-{}", date.format("%Y-%m-%d"), i),
                    start_time,
                    end_time,
                    is_available: self.availability.is_available(provider, start_time, end_time),
                }
            })
            .collect();

        debug!(
            "Generated {} slots for {} ({} available)",
            slots.len(),
            date,
            slots.iter().filter(|s| s.is_available).count()
        );

        slots
    }
}
