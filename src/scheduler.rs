//! Monthly distribution trigger.
//!
//! A single fixed job: once per calendar month, at a configured wall-clock
//! time in a configured UTC offset, run the batch send for every registered
//! tenant. Firings missed while the process was down are not replayed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

use crate::dispatch::Dispatcher;

/// Fire-time description: `day` of month (clamped to the month's length),
/// hour and minute, in the zone given by `utc_offset_minutes`.
#[derive(Debug, Clone, Copy)]
pub struct MonthlySchedule {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub utc_offset_minutes: i32,
}

impl MonthlySchedule {
    /// Field-range check. An out-of-range day or time never resolves to a
    /// fire time, so `next_fire_after` would scan months without end;
    /// configuration loading rejects such schedules up front.
    pub fn is_valid(&self) -> bool {
        (1..=31).contains(&self.day)
            && self.hour <= 23
            && self.minute <= 59
            && self
                .utc_offset_minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .is_some()
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }

    /// First fire time strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let offset = self.offset();
        let now = now.with_timezone(&offset);

        let mut year = now.year();
        let mut month = now.month();
        loop {
            if let Some(candidate) = self.fire_time_in(year, month, offset) {
                if candidate > now {
                    return candidate;
                }
            }
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
    }

    fn fire_time_in(
        &self,
        year: i32,
        month: u32,
        offset: FixedOffset,
    ) -> Option<DateTime<FixedOffset>> {
        let day = self.day.min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, 0))
            .and_then(|dt| dt.and_local_timezone(offset).single())
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Start the long-running trigger task. Each firing uses the firing day as
/// the reference date and logs the per-tenant outcome.
pub fn spawn(schedule: MonthlySchedule, dispatcher: Arc<Dispatcher>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now().with_timezone(&schedule.offset());
            let next = schedule.next_fire_after(now);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            log::info!("next scheduled invoice batch at {next}");
            tokio::time::sleep(wait).await;

            let reference = Utc::now().with_timezone(&schedule.offset()).date_naive();
            log::info!("scheduled invoice batch firing for {reference}");
            let results = dispatcher.send_all(reference).await;
            for result in &results {
                match &result.error {
                    None => log::info!("scheduled send ok: {}", result.tenant),
                    Some(e) => log::error!("scheduled send failed: {}: {e}", result.tenant),
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(day: u32, hour: u32, minute: u32) -> MonthlySchedule {
        MonthlySchedule {
            day,
            hour,
            minute,
            utc_offset_minutes: 0,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_out_of_range_fields_are_rejected() {
        assert!(!schedule(0, 9, 0).is_valid());
        assert!(!schedule(32, 9, 0).is_valid());
        assert!(!schedule(1, 24, 0).is_valid());
        assert!(!schedule(1, 9, 60).is_valid());
        let bad_offset = MonthlySchedule {
            day: 1,
            hour: 9,
            minute: 0,
            utc_offset_minutes: 24 * 60,
        };
        assert!(!bad_offset.is_valid());
        assert!(schedule(31, 23, 59).is_valid());
    }

    #[test]
    fn test_fires_later_same_month() {
        let next = schedule(1, 9, 0).next_fire_after(at(2026, 3, 1, 8, 59));
        assert_eq!(next, at(2026, 3, 1, 9, 0));
    }

    #[test]
    fn test_rolls_to_next_month_once_passed() {
        let next = schedule(1, 9, 0).next_fire_after(at(2026, 3, 1, 9, 0));
        assert_eq!(next, at(2026, 4, 1, 9, 0));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let next = schedule(1, 9, 0).next_fire_after(at(2025, 12, 15, 0, 0));
        assert_eq!(next, at(2026, 1, 1, 9, 0));
    }

    #[test]
    fn test_day_clamped_to_short_months() {
        let next = schedule(31, 9, 0).next_fire_after(at(2026, 4, 1, 0, 0));
        assert_eq!(next, at(2026, 4, 30, 9, 0));
    }

    #[test]
    fn test_offset_is_respected() {
        let ist = MonthlySchedule {
            day: 1,
            hour: 9,
            minute: 30,
            utc_offset_minutes: 330,
        };
        let now_utc = Utc
            .with_ymd_and_hms(2026, 2, 1, 3, 0, 0)
            .unwrap()
            .with_timezone(&ist.offset());
        // 03:00 UTC is 08:30 IST, so the 09:30 IST firing is still ahead.
        let next = ist.next_fire_after(now_utc);
        assert_eq!(next.naive_local(), at(2026, 2, 1, 9, 30).naive_utc());
    }
}
