use chrono::{NaiveDate, NaiveDateTime, Timelike};

use super::error::AttendanceError;

/// Hour (local time) after which today's attendance can no longer be edited.
pub const DEFAULT_LOCK_HOUR: u32 = 17; // 5:00 PM

/// Day-lock rule, pure in (date, now):
/// past days are always locked, today locks at the cutoff hour, future days
/// are never locked.
pub fn is_locked(date: NaiveDate, now: NaiveDateTime, lock_hour: u32) -> bool {
    let today = now.date();
    if date < today {
        return true;
    }
    date == today && now.hour() >= lock_hour
}

/// Gate used by every mutation path. Locked writes are rejected with an
/// error, never silently dropped.
pub fn ensure_unlocked(
    date: NaiveDate,
    now: NaiveDateTime,
    lock_hour: u32,
) -> Result<(), AttendanceError> {
    let today = now.date();
    if date < today {
        return Err(AttendanceError::LockedDay {
            reason: "Cannot modify attendance for past days".to_string(),
        });
    }
    if date == today && now.hour() >= lock_hour {
        return Err(AttendanceError::LockedDay {
            reason: format!("Day is locked after {}:00", lock_hour),
        });
    }
    Ok(())
}
