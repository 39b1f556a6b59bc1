use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{NaiveDateTime, NaiveTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// Answers whether a provider can take a booking in `[start, end)`.
pub trait AvailabilitySource: Send + Sync {
    fn is_available(&self, provider: Option<&str>, start: NaiveDateTime, end: NaiveDateTime) -> bool;
}

/// Placeholder availability: every slot is an independent draw that comes up
/// open with probability `ratio`.
pub struct RandomAvailability {
    ratio: f64,
    rng: Mutex<StdRng>,
}

impl RandomAvailability {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(ratio: f64, seed: u64) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl AvailabilitySource for RandomAvailability {
    fn is_available(&self, _provider: Option<&str>, _start: NaiveDateTime, _end: NaiveDateTime) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_bool(self.ratio)
    }
}

/// Deterministic calendar: everything is open except the listed start times.
#[derive(Debug, Default, Clone)]
pub struct FixedAvailability {
    closed: HashSet<NaiveTime>,
}

impl FixedAvailability {
    pub fn all_open() -> Self {
        Self::default()
    }

    pub fn closed_at(times: impl IntoIterator<Item = NaiveTime>) -> Self {
        Self {
            closed: times.into_iter().collect(),
        }
    }
}

impl AvailabilitySource for FixedAvailability {
    fn is_available(&self, _provider: Option<&str>, start: NaiveDateTime, _end: NaiveDateTime) -> bool {
        !self.closed.contains(&start.time())
    }
}

/// A scheduled booking that occupies a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedInterval {
    pub provider: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Wraps another source and closes anything that overlaps an existing
/// scheduled booking of the same provider.
pub struct BookedAvailability<'a, A: AvailabilitySource + ?Sized> {
    inner: &'a A,
    booked: Vec<BookedInterval>,
}

impl<'a, A: AvailabilitySource + ?Sized> BookedAvailability<'a, A> {
    pub fn new(inner: &'a A, booked: Vec<BookedInterval>) -> Self {
        Self { inner, booked }
    }
}

impl<'a, A: AvailabilitySource + ?Sized> AvailabilitySource for BookedAvailability<'a, A> {
    fn is_available(&self, provider: Option<&str>, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if let Some(provider) = provider {
            let taken = self
                .booked
                .iter()
                .any(|b| b.provider == provider && b.start < end && start < b.end);
            if taken {
                debug!("{} is already booked at {}", provider, start);
                return false;
            }
        }

        self.inner.is_available(provider, start, end)
    }
}
