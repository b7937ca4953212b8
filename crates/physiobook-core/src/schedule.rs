//! Appointment date and time-slot helpers.
//!
//! The booking screen offers the next week of dates and half-hour slots
//! during clinic hours; slots already in the past are never offered, and
//! a booking request for a past time is rejected before it reaches the
//! server.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Number of days offered for booking, starting today
pub const BOOKING_WINDOW_DAYS: i64 = 7;

/// First bookable slot of the day
pub const FIRST_SLOT_HOUR: u32 = 8;

/// No slots start at or after this hour
pub const LAST_SLOT_HOUR: u32 = 20;

/// Slot spacing in minutes
pub const SLOT_INTERVAL_MINUTES: u32 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Cannot book an appointment in the past")]
    InPast,

    #[error("Appointments are only available between 8:00 and 20:00")]
    OutsideHours,
}

/// The dates offered for booking: today plus the following days of the
/// window.
pub fn upcoming_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..BOOKING_WINDOW_DAYS)
        .map(|offset| today + Duration::days(offset))
        .collect()
}

/// Candidate slots for `date`, skipping any that `now` has already
/// passed. A date fully in the past yields no slots.
pub fn available_slots(date: NaiveDate, now: NaiveDateTime) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let mut minutes = FIRST_SLOT_HOUR * 60;
    let end = LAST_SLOT_HOUR * 60;

    while minutes <= end {
        if let Some(time) = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0) {
            let candidate = date.and_time(time);
            if candidate > now {
                slots.push(time);
            }
        }
        minutes += SLOT_INTERVAL_MINUTES;
    }

    slots
}

/// Validate a chosen appointment start before submitting it.
pub fn validate_appointment_time(start: NaiveDateTime, now: NaiveDateTime) -> Result<(), ScheduleError> {
    if start <= now {
        return Err(ScheduleError::InPast);
    }
    let hour = start.hour();
    if hour < FIRST_SLOT_HOUR || hour > LAST_SLOT_HOUR || (hour == LAST_SLOT_HOUR && start.minute() > 0)
    {
        return Err(ScheduleError::OutsideHours);
    }
    Ok(())
}
