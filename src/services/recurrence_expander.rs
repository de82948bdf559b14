use std::collections::VecDeque;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::trace;

use crate::models::recurrence::{Cadence, OrdinalWeekday, RecurrencePlan};

/// Expands recurrence plans into concrete calendar dates.
pub struct RecurrenceExpander;

impl RecurrenceExpander {
    /// Lazy, finite sequence of the dates in `[from, to]` matched by `plan`.
    ///
    /// Periods are counted from `anchor`; dates before the anchor never match and
    /// `repeat_occurrences` counts from the anchor, not from `from`. Cloning the
    /// returned iterator restarts nothing: clone before consuming to replay.
    pub fn expand(
        plan: &RecurrencePlan,
        anchor: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Occurrences<'_> {
        trace!(
            target: "planner::recurrence",
            frequency = ?plan.frequency,
            %anchor,
            %from,
            %to,
            "expanding recurrence"
        );
        let mut occurrences = Occurrences {
            plan,
            cadence: plan.cadence(),
            interval: plan.interval.max(1) as i64,
            anchor,
            from,
            to,
            period: 0,
            emitted: 0,
            buffer: VecDeque::new(),
            done: false,
        };
        occurrences.period = occurrences.first_useful_period();
        occurrences
    }

    pub fn dates_between(
        plan: &RecurrencePlan,
        anchor: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<NaiveDate> {
        Self::expand(plan, anchor, from, to).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    plan: &'a RecurrencePlan,
    cadence: Option<Cadence>,
    interval: i64,
    anchor: NaiveDate,
    from: NaiveDate,
    to: NaiveDate,
    period: i64,
    emitted: u32,
    buffer: VecDeque<NaiveDate>,
    done: bool,
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            if let Some(date) = self.buffer.pop_front() {
                if date > self.to || self.past_end_date(date) || self.count_reached() {
                    self.finish();
                    return None;
                }
                self.emitted += 1;
                if date < self.from {
                    continue;
                }
                return Some(date);
            }

            if self.done {
                return None;
            }
            self.fill_next_period();
        }
    }
}

impl Occurrences<'_> {
    fn finish(&mut self) {
        self.done = true;
        self.buffer.clear();
    }

    fn past_end_date(&self, date: NaiveDate) -> bool {
        matches!(self.plan.repeat_end_date, Some(end) if date > end)
    }

    fn count_reached(&self) -> bool {
        matches!(self.plan.repeat_occurrences, Some(count) if self.emitted >= count)
    }

    /// Skips whole periods that end before `from`. Only legal without a count,
    /// since counted rules must observe every earlier occurrence.
    fn first_useful_period(&self) -> i64 {
        if self.plan.repeat_occurrences.is_some() || self.from <= self.anchor {
            return 0;
        }
        let periods = match self.cadence {
            None => return 0,
            Some(Cadence::Daily) => (self.from - self.anchor).num_days(),
            Some(Cadence::Weekly) => {
                (week_start(self.from) - week_start(self.anchor)).num_days() / 7
            }
            Some(Cadence::Monthly) => month_index(self.from) - month_index(self.anchor),
            Some(Cadence::Yearly) => (self.from.year() - self.anchor.year()) as i64,
        };
        (periods / self.interval).max(0)
    }

    fn fill_next_period(&mut self) {
        let Some(cadence) = self.cadence else {
            // Non-repeating: the anchor is the single occurrence.
            if self.period == 0 {
                self.buffer.push_back(self.anchor);
                self.period = 1;
            } else {
                self.done = true;
            }
            return;
        };

        let step = self.period * self.interval;
        self.period += 1;

        let (period_start, mut candidates) = match cadence {
            Cadence::Daily => {
                let day = self.anchor + Duration::days(step);
                (day, vec![day])
            }
            Cadence::Weekly => {
                let start = week_start(self.anchor) + Duration::weeks(step);
                (start, self.weekly_candidates(start))
            }
            Cadence::Monthly => {
                let (year, month) = month_from_index(month_index(self.anchor) + step);
                match NaiveDate::from_ymd_opt(year, month, 1) {
                    Some(start) => (start, self.monthly_candidates(year, month)),
                    None => {
                        self.done = true;
                        return;
                    }
                }
            }
            Cadence::Yearly => {
                let year = self.anchor.year() + step as i32;
                match NaiveDate::from_ymd_opt(year, 1, 1) {
                    Some(start) => (start, self.yearly_candidates(year)),
                    None => {
                        self.done = true;
                        return;
                    }
                }
            }
        };

        if period_start > self.to || self.past_end_date(period_start) {
            self.done = true;
            return;
        }

        candidates.retain(|date| *date >= self.anchor);
        self.buffer.extend(candidates);
    }

    fn weekly_candidates(&self, monday: NaiveDate) -> Vec<NaiveDate> {
        let days: Vec<Weekday> = if self.plan.selected_days.is_empty() {
            vec![self.anchor.weekday()]
        } else {
            self.plan.selected_days.clone()
        };
        let dates = days
            .into_iter()
            .map(|day| monday + Duration::days(day.num_days_from_monday() as i64))
            .collect();
        apply_set_pos(sorted_unique(dates), &self.plan.set_pos)
    }

    fn monthly_candidates(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        let dates = self.dates_in_month(year, month);
        apply_set_pos(sorted_unique(dates), &self.plan.set_pos)
    }

    fn yearly_candidates(&self, year: i32) -> Vec<NaiveDate> {
        let months: Vec<u32> = if self.plan.months_of_year.is_empty() {
            vec![self.anchor.month()]
        } else {
            self.plan.months_of_year.clone()
        };
        let dates = months
            .into_iter()
            .flat_map(|month| self.dates_in_month(year, month))
            .collect();
        apply_set_pos(sorted_unique(dates), &self.plan.set_pos)
    }

    /// Ordinal weekdays win over days of month; with neither, the anchor's day.
    fn dates_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        if !self.plan.ordinals_of_weekdays.is_empty() {
            return self
                .plan
                .ordinals_of_weekdays
                .iter()
                .flat_map(|entry| ordinal_weekday_dates(year, month, entry))
                .collect();
        }
        if !self.plan.days_of_month.is_empty() {
            return self
                .plan
                .days_of_month
                .iter()
                .filter_map(|day| clamped_month_day(year, month, *day as i32))
                .collect();
        }
        clamped_month_day(year, month, self.anchor.day() as i32)
            .into_iter()
            .collect()
    }
}

fn sorted_unique(mut dates: Vec<NaiveDate>) -> Vec<NaiveDate> {
    dates.sort();
    dates.dedup();
    dates
}

/// Selects 1-based positions (negative from the end) out of one period's matches.
fn apply_set_pos(dates: Vec<NaiveDate>, positions: &[i32]) -> Vec<NaiveDate> {
    if positions.is_empty() || dates.is_empty() {
        return dates;
    }
    let len = dates.len() as i32;
    let selected = positions
        .iter()
        .filter_map(|position| {
            let idx = if *position > 0 {
                position - 1
            } else {
                len + position
            };
            (0..len).contains(&idx).then(|| dates[idx as usize])
        })
        .collect();
    sorted_unique(selected)
}

fn ordinal_weekday_dates(year: i32, month: u32, entry: &OrdinalWeekday) -> Vec<NaiveDate> {
    let Some(last_day) = last_day_of_month(year, month) else {
        return Vec::new();
    };
    let matches: Vec<NaiveDate> = (1..=last_day)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .filter(|date| date.weekday() == entry.weekday)
        .collect();

    match entry.ordinal {
        0 => matches,
        ordinal if ordinal > 0 => matches
            .get(ordinal as usize - 1)
            .copied()
            .into_iter()
            .collect(),
        ordinal => {
            let idx = matches.len() as i32 + ordinal as i32;
            if idx < 0 {
                Vec::new()
            } else {
                matches.get(idx as usize).copied().into_iter().collect()
            }
        }
    }
}

/// Positive days past the month's end clamp to its last day; negative days count
/// back from the end and clamp to the 1st.
fn clamped_month_day(year: i32, month: u32, day: i32) -> Option<NaiveDate> {
    let last_day = last_day_of_month(year, month)? as i32;
    let resolved = if day > 0 {
        day.min(last_day)
    } else {
        (last_day + day + 1).max(1)
    };
    NaiveDate::from_ymd_opt(year, month, resolved as u32)
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn month_from_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}
