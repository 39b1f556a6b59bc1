use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};

use booking_cell::services::{
    AvailabilitySource, BookingAction, BookingEvent, BookingFormController, Catalog, FixedAvailability,
    FixedClock, RandomAvailability, AppointmentStore, SlotGenerator,
};
use booking_cell::{AppointmentKind, AppointmentStatus, BookingConfirmation, BookingError, ImagingModality};
use shared_config::{BookingSettings, MultiSlotPolicy};

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn form_with(availability: Arc<dyn AvailabilitySource>, settings: BookingSettings) -> BookingFormController {
    BookingFormController::new(
        availability,
        Arc::new(FixedClock(may_first().and_hms_opt(7, 0, 0).unwrap())),
        Arc::new(Catalog::standard()),
        settings,
    )
}

fn open_form(settings: BookingSettings) -> BookingFormController {
    form_with(Arc::new(FixedAvailability::all_open()), settings)
}

fn start_lab_booking(form: &mut BookingFormController, store: &mut AppointmentStore) {
    form.apply(BookingAction::ChooseType { kind: AppointmentKind::Standard }, store).unwrap();
    form.apply(BookingAction::ChooseTest { test_type: "Bilan Lipidique".into() }, store).unwrap();
    form.apply(BookingAction::Continue, store).unwrap();
    form.apply(BookingAction::ChooseDate { date: may_first() }, store).unwrap();
}

fn confirm(form: &mut BookingFormController, store: &mut AppointmentStore) -> BookingConfirmation {
    let event = form.apply(BookingAction::Confirm, store).unwrap();
    assert_matches!(event, BookingEvent::Confirmed { confirmation } => confirmation)
}

#[test]
fn test_generate_is_sixteen_slots_for_every_date() {
    let source = RandomAvailability::seeded(0.7, 1);
    let generator = SlotGenerator::new(&source);

    for offset in 0..60 {
        let date = may_first() + chrono::Duration::days(offset);
        let slots = generator.generate(date);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].start_time.time(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(slots[15].end_time.time(), NaiveTime::from_hms_opt(16, 0, 0).unwrap());
    }
}

#[test]
fn test_selecting_two_slots_books_the_first() {
    let mut store = AppointmentStore::new();
    let mut form = open_form(BookingSettings::default());
    start_lab_booking(&mut form, &mut store);

    let slots = form.slots().to_vec();
    assert_eq!(slots.len(), 16);

    form.apply(BookingAction::ToggleSlot { slot_id: slots[2].id.clone() }, &mut store).unwrap();
    form.apply(BookingAction::ToggleSlot { slot_id: slots[5].id.clone() }, &mut store).unwrap();
    assert_eq!(form.selected(), &[slots[2].clone(), slots[5].clone()]);
    assert!(form.can_confirm());

    let confirmation = confirm(&mut form, &mut store);

    assert_eq!(confirmation.appointments.len(), 1);
    assert_eq!(confirmation.appointments[0].start_time, slots[2].start_time);
    assert_eq!(confirmation.ignored_slots, vec![slots[5].clone()]);
    assert_eq!(store.len(), 1);
    assert_eq!(store.list()[0].status, AppointmentStatus::Scheduled);
    assert_eq!(store.list()[0].test_type, "Bilan Lipidique");
    assert_eq!(store.list()[0].address, "123 Rue Principale, Ville");
    assert!(store.list()[0].provider_name.is_none());

    // the form starts over
    assert_eq!(form.step(), booking_cell::services::form::BookingStep::SelectingType);
    assert!(form.slots().is_empty());
}

#[test]
fn test_each_slot_policy_books_every_selection() {
    let mut store = AppointmentStore::new();
    let settings = BookingSettings {
        multi_slot_policy: MultiSlotPolicy::EachSlot,
        ..BookingSettings::default()
    };
    let mut form = open_form(settings);
    start_lab_booking(&mut form, &mut store);

    let ids: Vec<String> = [1, 4, 9].iter().map(|i| form.slots()[*i].id.clone()).collect();
    for id in &ids {
        form.apply(BookingAction::ToggleSlot { slot_id: id.clone() }, &mut store).unwrap();
    }
    let confirmation = confirm(&mut form, &mut store);

    assert_eq!(confirmation.appointments.len(), 3);
    assert!(confirmation.ignored_slots.is_empty());
    assert_eq!(store.len(), 3);
}

#[test]
fn test_lab_selection_never_exceeds_cap() {
    let mut store = AppointmentStore::new();
    let mut form = open_form(BookingSettings::default());
    start_lab_booking(&mut form, &mut store);

    let ids: Vec<String> = form.slots().iter().map(|s| s.id.clone()).collect();
    for (step, id) in ids.iter().cycle().take(100).enumerate() {
        if step % 3 == 0 {
            continue;
        }
        form.apply(BookingAction::ToggleSlot { slot_id: id.clone() }, &mut store).unwrap();
        assert!(form.selected().len() <= 3);
    }
}

#[test]
fn test_unavailable_slot_cannot_be_booked() {
    let mut store = AppointmentStore::new();
    let closed = FixedAvailability::closed_at([NaiveTime::from_hms_opt(8, 0, 0).unwrap()]);
    let mut form = form_with(Arc::new(closed), BookingSettings::default());
    start_lab_booking(&mut form, &mut store);

    let first = form.slots()[0].id.clone();
    let event = form.apply(BookingAction::ToggleSlot { slot_id: first }, &mut store).unwrap();
    assert_matches!(
        event,
        BookingEvent::SlotToggled { result: booking_cell::services::SelectionOutcome::Unavailable, .. }
    );
    assert!(!form.can_confirm());

    assert_matches!(
        form.apply(BookingAction::ToggleSlot { slot_id: "slot-1999-01-01-0".into() }, &mut store),
        Err(BookingError::SlotNotFound(_))
    );
}

#[test]
fn test_cancel_frees_the_nurse_slot() {
    let mut store = AppointmentStore::new();
    let mut form = open_form(BookingSettings::default());

    form.apply(BookingAction::ChooseType { kind: AppointmentKind::Standard }, &mut store).unwrap();
    form.apply(BookingAction::ChooseNurse { nurse_id: Some("nurse-1".into()) }, &mut store).unwrap();
    form.apply(BookingAction::Continue, &mut store).unwrap();
    form.apply(BookingAction::ChooseDate { date: may_first() }, &mut store).unwrap();
    let slot_id = form.slots()[4].id.clone();
    form.apply(BookingAction::ToggleSlot { slot_id }, &mut store).unwrap();
    let booked = confirm(&mut form, &mut store).appointments.remove(0);
    assert_eq!(booked.provider_name.as_deref(), Some("Marie Dupont"));

    let slot_open = |form: &mut BookingFormController, store: &mut AppointmentStore| {
        form.apply(BookingAction::ChooseType { kind: AppointmentKind::Standard }, store).unwrap();
        form.apply(BookingAction::ChooseNurse { nurse_id: Some("nurse-1".into()) }, store).unwrap();
        form.apply(BookingAction::Continue, store).unwrap();
        form.apply(BookingAction::ChooseDate { date: may_first() }, store).unwrap();
        let open = form.slots()[4].is_available;
        form.apply(BookingAction::Reset, store).unwrap();
        open
    };

    assert!(!slot_open(&mut form, &mut store));
    store.cancel(booked.id).unwrap();
    assert!(slot_open(&mut form, &mut store));
}

#[test]
fn test_imaging_booking_uses_center_details() {
    let mut store = AppointmentStore::new();
    let mut form = open_form(BookingSettings::default());

    form.apply(BookingAction::ChooseType { kind: AppointmentKind::Imaging }, &mut store).unwrap();
    form.apply(BookingAction::ChooseModality { modality: ImagingModality::Scanner }, &mut store).unwrap();
    form.apply(BookingAction::ChooseCenter { center_id: "center-3".into() }, &mut store).unwrap();
    form.apply(BookingAction::Continue, &mut store).unwrap();
    form.apply(BookingAction::ChooseDate { date: may_first() }, &mut store).unwrap();

    let ids: Vec<String> = form.slots()[..2].iter().map(|s| s.id.clone()).collect();
    form.apply(BookingAction::ToggleSlot { slot_id: ids[0].clone() }, &mut store).unwrap();
    let second = form.apply(BookingAction::ToggleSlot { slot_id: ids[1].clone() }, &mut store).unwrap();
    assert_matches!(
        second,
        BookingEvent::SlotToggled { result: booking_cell::services::SelectionOutcome::CapacityReached { max: 1 }, .. }
    );

    let appointment = confirm(&mut form, &mut store).appointments.remove(0);
    assert_eq!(appointment.kind, AppointmentKind::Imaging);
    assert_eq!(appointment.imaging_type, Some(ImagingModality::Scanner));
    assert_eq!(appointment.test_type, "Scanner");
    assert_eq!(appointment.center_name.as_deref(), Some("Centre de Radiologie Moderne"));
    assert_eq!(appointment.address, "18 Boulevard de la Santé, 75003 Paris");
}
