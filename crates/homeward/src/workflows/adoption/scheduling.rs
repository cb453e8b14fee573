use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

/// The fixed daily visit schedule: nine one-hour slots, identical for home
/// and shelter visits.
pub const DAILY_SLOTS: [&str; 9] = [
    "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00",
];

const FIRST_SLOT_HOUR: u32 = 9;
const LAST_SLOT_HOUR: u32 = 17;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotWindowError {
    #[error("visit date must be later than today")]
    TooEarly,
    #[error("visit date must be within {0} days")]
    TooFar(i64),
    #[error("visits run on the hour between 09:00 and 17:00")]
    OffSchedule,
}

/// Slot label for an hour of day, if that hour is on the schedule.
pub fn label_for_hour(hour: u32) -> Option<&'static str> {
    if (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR).contains(&hour) {
        Some(DAILY_SLOTS[(hour - FIRST_SLOT_HOUR) as usize])
    } else {
        None
    }
}

/// Complement of the booked hours against the fixed schedule, ascending.
/// A fully booked day yields an empty list, never an error.
pub fn open_slots(booked_hours: &[u32]) -> Vec<&'static str> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
        .filter(|hour| !booked_hours.contains(hour))
        .filter_map(label_for_hour)
        .collect()
}

/// Availability lookups take a bare date: strictly after today, at most
/// `window_days` ahead.
pub fn validate_visit_date(
    date: NaiveDate,
    today: NaiveDate,
    window_days: i64,
) -> Result<(), SlotWindowError> {
    if date <= today {
        return Err(SlotWindowError::TooEarly);
    }
    if date > today + Duration::days(window_days) {
        return Err(SlotWindowError::TooFar(window_days));
    }
    Ok(())
}

/// Booking commits check the full timestamp. The past bound allows a small
/// clock-skew tolerance instead of exact equality, and the hour must land on
/// a schedule slot.
pub fn validate_visit_timestamp(
    visit_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window_days: i64,
    tolerance_minutes: i64,
) -> Result<(), SlotWindowError> {
    if visit_at < now - Duration::minutes(tolerance_minutes) {
        return Err(SlotWindowError::TooEarly);
    }
    if visit_at > now + Duration::days(window_days) {
        return Err(SlotWindowError::TooFar(window_days));
    }
    if label_for_hour(visit_at.hour()).is_none() {
        return Err(SlotWindowError::OffSchedule);
    }
    Ok(())
}
