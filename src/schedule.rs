use crate::config::Config;
use crate::error::{PlannerError, PlannerResult};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// What happens when a batch is larger than the posting-hour list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOverflow {
    /// Repeat the hour list on the target date (several videos per hour).
    #[default]
    SameDay,
    /// Continue the hour list on the following day(s).
    NextDay,
}

/// Assigns publish instants from a fixed list of local posting hours.
#[derive(Debug, Clone)]
pub struct ScheduleManager {
    tz: Tz,
    posting_hours: Vec<u32>,
    overflow: SlotOverflow,
}

impl ScheduleManager {
    pub fn new(timezone: &str, posting_hours: Vec<u32>) -> PlannerResult<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| PlannerError::UnknownTimezone(timezone.to_string()))?;

        if posting_hours.is_empty() {
            return Err(PlannerError::EmptyPostingHours);
        }
        if let Some(bad) = posting_hours.iter().find(|h| **h > 23) {
            return Err(PlannerError::InvalidPostingHour(*bad));
        }

        Ok(Self {
            tz,
            posting_hours,
            overflow: SlotOverflow::SameDay,
        })
    }

    pub fn from_config(cfg: &Config) -> PlannerResult<Self> {
        Ok(Self::new(&cfg.timezone, cfg.posting_hours.clone())?.with_overflow(cfg.slot_overflow))
    }

    pub fn with_overflow(mut self, overflow: SlotOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn posting_hours(&self) -> &[u32] {
        &self.posting_hours
    }

    /// `count` publish instants for `target_date`.
    ///
    /// Slot `i` uses `posting_hours[i % len]` at minute zero. With
    /// [`SlotOverflow::SameDay`] every slot lands on `target_date`; with
    /// [`SlotOverflow::NextDay`] each full pass over the hour list moves one day on.
    pub fn get_daily_slots(
        &self,
        target_date: NaiveDate,
        count: usize,
    ) -> PlannerResult<Vec<DateTime<Tz>>> {
        if count == 0 {
            return Err(PlannerError::InvalidCount {
                what: "count",
                value: count,
            });
        }

        let per_day = self.posting_hours.len();
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            let hour = self.posting_hours[i % per_day];
            let date = match self.overflow {
                SlotOverflow::SameDay => target_date,
                SlotOverflow::NextDay => target_date
                    .checked_add_days(Days::new((i / per_day) as u64))
                    .ok_or_else(|| {
                        PlannerError::InvalidConfig(format!("date overflow after {target_date}"))
                    })?,
            };
            let naive = date
                .and_hms_opt(hour, 0, 0)
                .ok_or(PlannerError::InvalidPostingHour(hour))?;
            slots.push(self.localize(naive));
        }

        Ok(slots)
    }

    // Ambiguous (fall-back) times take the earlier instant; times inside a
    // spring-forward gap move one hour later.
    fn localize(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .unwrap_or_else(|| self.tz.from_utc_datetime(&naive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, Timelike};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hours_cycle_on_the_same_date() {
        let sched = ScheduleManager::new("Europe/London", vec![11, 14, 18]).unwrap();
        let target = date(2026, 6, 15);
        let slots = sched.get_daily_slots(target, 5).unwrap();

        let hours: Vec<u32> = slots.iter().map(|s| s.hour()).collect();
        assert_eq!(hours, vec![11, 14, 18, 11, 14]);
        assert!(slots.iter().all(|s| s.date_naive() == target));
        assert!(slots.iter().all(|s| s.minute() == 0 && s.second() == 0));
    }

    #[test]
    fn fewer_slots_than_hours_uses_the_prefix() {
        let sched = ScheduleManager::new("Europe/London", vec![11, 14, 18, 20, 22]).unwrap();
        let slots = sched.get_daily_slots(date(2026, 6, 15), 2).unwrap();
        let hours: Vec<u32> = slots.iter().map(|s| s.hour()).collect();
        assert_eq!(hours, vec![11, 14]);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let sched = ScheduleManager::new("America/New_York", vec![9, 21]).unwrap();
        let a = sched.get_daily_slots(date(2026, 11, 2), 7).unwrap();
        let b = sched.get_daily_slots(date(2026, 11, 2), 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].timezone(), Tz::America__New_York);
    }

    #[test]
    fn slots_carry_the_local_offset() {
        let sched = ScheduleManager::new("America/New_York", vec![11]).unwrap();
        let slot = sched.get_daily_slots(date(2026, 1, 10), 1).unwrap()[0];
        assert_eq!(slot.offset().fix().local_minus_utc(), -5 * 3600);
        assert_eq!(slot.to_rfc3339(), "2026-01-10T11:00:00-05:00");
    }

    #[test]
    fn unknown_timezone_fails_fast() {
        let err = ScheduleManager::new("Not/AZone", vec![11]).unwrap_err();
        assert!(matches!(err, PlannerError::UnknownTimezone(ref tz) if tz == "Not/AZone"));
    }

    #[test]
    fn bad_hours_are_rejected() {
        assert!(matches!(
            ScheduleManager::new("UTC", vec![]),
            Err(PlannerError::EmptyPostingHours)
        ));
        assert!(matches!(
            ScheduleManager::new("UTC", vec![8, 30]),
            Err(PlannerError::InvalidPostingHour(30))
        ));
    }

    #[test]
    fn zero_count_is_a_config_error() {
        let sched = ScheduleManager::new("UTC", vec![11]).unwrap();
        assert!(matches!(
            sched.get_daily_slots(date(2026, 6, 15), 0),
            Err(PlannerError::InvalidCount { .. })
        ));
    }

    #[test]
    fn next_day_overflow_rolls_the_date() {
        let sched = ScheduleManager::new("UTC", vec![11, 14])
            .unwrap()
            .with_overflow(SlotOverflow::NextDay);
        let slots = sched.get_daily_slots(date(2026, 12, 31), 5).unwrap();
        let days: Vec<NaiveDate> = slots.iter().map(|s| s.date_naive()).collect();
        assert_eq!(
            days,
            vec![
                date(2026, 12, 31),
                date(2026, 12, 31),
                date(2027, 1, 1),
                date(2027, 1, 1),
                date(2027, 1, 2),
            ]
        );
        assert_eq!(slots[4].hour(), 11);
    }

    #[test]
    fn spring_forward_gap_moves_later() {
        // 01:00 does not exist in London on 2026-03-29.
        let sched = ScheduleManager::new("Europe/London", vec![1]).unwrap();
        let slot = sched.get_daily_slots(date(2026, 3, 29), 1).unwrap()[0];
        assert_eq!(slot.hour(), 2);
        assert_eq!(slot.offset().fix().local_minus_utc(), 3600);
    }

    #[test]
    fn fall_back_ambiguity_takes_earlier_instant() {
        // 01:00 happens twice in London on 2026-10-25.
        let sched = ScheduleManager::new("Europe/London", vec![1]).unwrap();
        let slot = sched.get_daily_slots(date(2026, 10, 25), 1).unwrap()[0];
        assert_eq!(slot.hour(), 1);
        assert_eq!(slot.offset().fix().local_minus_utc(), 3600);
    }
}
