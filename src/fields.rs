//! Calendar primitives adapter: read, bound and adjust a single calendar
//! field on a civil datetime.
//!
//! Adjustments operate on local datetimes only; zone resolution is a
//! separate, final step in the cursor engine. Week-numbered fields follow
//! the locale's [`WeekFields`]: days before the first week of a month or
//! year that is at least `min_days` long fall in week 0.

use jiff::civil::{Date, DateTime};
use jiff::Span;

use crate::expr::{Field, WeekFields};

/// Lowest year the engine iterates over.
pub const MIN_YEAR: i32 = 1970;
/// Highest year the engine iterates over; exhausting it ends iteration.
pub const MAX_YEAR: i32 = 2099;

/// Current value of `field` at `t`.
pub fn value(field: Field, t: DateTime, wf: WeekFields) -> i32 {
    let d = t.date();
    match field {
        Field::Second => t.second() as i32,
        Field::Minute => t.minute() as i32,
        Field::Hour => t.hour() as i32,
        Field::DayOfWeek => wf.day_number(d.weekday()),
        Field::WeekOfMonth => {
            let day = d.day() as i32;
            let offset = week_offset(day, wf.day_number(d.weekday()), wf.min_days as i32);
            compute_week(offset, day)
        }
        Field::WeekOfYear => {
            let doy = d.day_of_year() as i32;
            let offset = week_offset(doy, wf.day_number(d.weekday()), wf.min_days as i32);
            compute_week(offset, doy)
        }
        Field::DayOfMonth => d.day() as i32,
        Field::DayOfQuarter => {
            d.day_of_year() as i32 - quarter_first_doy(quarter(d), leap(d)) + 1
        }
        Field::QuarterOfYear => quarter(d),
        Field::DayOfYear => d.day_of_year() as i32,
        Field::Month => d.month() as i32,
        Field::Year => d.year() as i32,
    }
}

/// Valid range of `field` at `t`, inclusive.
///
/// Day-of-week here is always the plain `(1, 7)`; the week-bucket
/// restriction lives in [`day_of_week_bounds`].
pub fn bounds(field: Field, t: DateTime, wf: WeekFields) -> (i32, i32) {
    let d = t.date();
    match field {
        Field::Second | Field::Minute => (0, 59),
        Field::Hour => (0, 23),
        Field::DayOfWeek => (1, 7),
        Field::WeekOfMonth => {
            let offset = week_offset(
                d.day() as i32,
                wf.day_number(d.weekday()),
                wf.min_days as i32,
            );
            (
                compute_week(offset, 1),
                compute_week(offset, d.days_in_month() as i32),
            )
        }
        Field::WeekOfYear => {
            let offset = week_offset(
                d.day_of_year() as i32,
                wf.day_number(d.weekday()),
                wf.min_days as i32,
            );
            (
                compute_week(offset, 1),
                compute_week(offset, d.days_in_year() as i32),
            )
        }
        Field::DayOfMonth => (1, d.days_in_month() as i32),
        Field::DayOfQuarter => {
            let q = quarter(d);
            (1, quarter_first_doy(q + 1, leap(d)) - quarter_first_doy(q, leap(d)))
        }
        Field::QuarterOfYear => (1, 4),
        Field::DayOfYear => (1, d.days_in_year() as i32),
        Field::Month => (1, 12),
        Field::Year => (MIN_YEAR, MAX_YEAR),
    }
}

/// Time-agnostic range of `field`, for plan-time validation and board
/// tie-breaking.
pub fn static_bounds(field: Field) -> (i32, i32) {
    match field {
        Field::Second | Field::Minute => (0, 59),
        Field::Hour => (0, 23),
        Field::DayOfWeek => (1, 7),
        Field::WeekOfMonth => (0, 6),
        Field::WeekOfYear => (0, 54),
        Field::DayOfMonth => (1, 31),
        Field::DayOfQuarter => (1, 92),
        Field::QuarterOfYear => (1, 4),
        Field::DayOfYear => (1, 366),
        Field::Month => (1, 12),
        Field::Year => (MIN_YEAR, MAX_YEAR),
    }
}

/// Set `field` to `v` at `t`, returning the adjusted local datetime.
///
/// `v` must lie in the field's bounds at `t`. Setting a coarser field
/// clamps the day when the target month is shorter (setting February on
/// January 31 yields February 28). Week fields snap the day of week so the
/// result stays inside the month or year bucket being iterated.
pub fn adjust(field: Field, v: i32, t: DateTime, wf: WeekFields) -> Option<DateTime> {
    let d = t.date();
    match field {
        Field::Second => with_time(t, t.hour() as i32, t.minute() as i32, v),
        Field::Minute => with_time(t, t.hour() as i32, v, t.second() as i32),
        Field::Hour => with_time(t, v, t.minute() as i32, t.second() as i32),
        Field::DayOfWeek => add_days(t, v - value(Field::DayOfWeek, t, wf)),
        Field::WeekOfMonth | Field::WeekOfYear => week_adjust(field, v, t, wf),
        Field::DayOfMonth => {
            let date = Date::new(d.year(), d.month(), v as i8).ok()?;
            Some(date.to_datetime(t.time()))
        }
        Field::DayOfQuarter => {
            let doy = quarter_first_doy(quarter(d), leap(d)) + v - 1;
            adjust(Field::DayOfYear, doy, t, wf)
        }
        Field::QuarterOfYear => {
            let month = d.month() as i32 + (v - quarter(d)) * 3;
            with_month_of_year(t, d.year() as i32, month)
        }
        Field::DayOfYear => {
            let start = Date::new(d.year(), 1, 1).ok()?;
            let date = start.checked_add(Span::new().days((v - 1) as i64)).ok()?;
            Some(date.to_datetime(t.time()))
        }
        Field::Month => with_month_of_year(t, d.year() as i32, v),
        Field::Year => with_month_of_year(t, v, d.month() as i32),
    }
}

/// Day-of-week range within the current week bucket, restricted to the
/// month (for week-of-month) or year (for week-of-year) being iterated.
///
/// In the bucket's first week only the tail of the week starting at the
/// month's or year's first day is admissible; in its last week only the
/// head up to the last day. With no week field in play the range is the
/// full week.
pub fn day_of_week_bounds(
    week_field: Option<Field>,
    t: DateTime,
    wf: WeekFields,
) -> (i32, i32) {
    let field = match week_field {
        Some(f) => f,
        None => return (1, 7),
    };
    let (wmin, wmax) = bounds(field, t, wf);
    let cur = value(field, t, wf);
    let d = t.date();
    if cur == wmin {
        let first = match field {
            Field::WeekOfMonth => d.first_of_month(),
            _ => d.first_of_year(),
        };
        (wf.day_number(first.weekday()), 7)
    } else if cur == wmax {
        let last = match field {
            Field::WeekOfMonth => d.last_of_month(),
            _ => d.last_of_year(),
        };
        (1, wf.day_number(last.weekday()))
    } else {
        (1, 7)
    }
}

/// Set a week field to `v`, snapping the day of week so the result stays
/// inside the month/year bucket: the bucket's first (possibly partial)
/// week snaps to the week's last day, the last week to its first day, and
/// full weeks to whichever end faces the direction of travel.
fn week_adjust(field: Field, v: i32, t: DateTime, wf: WeekFields) -> Option<DateTime> {
    let cur = value(field, t, wf);
    let (wmin, wmax) = bounds(field, t, wf);
    let shifted = add_days(t, (v - cur) * 7)?;
    let target = if v == wmin {
        7
    } else if v == wmax {
        1
    } else if v > cur {
        1
    } else {
        7
    };
    add_days(shifted, target - value(Field::DayOfWeek, shifted, wf))
}

fn with_time(t: DateTime, hour: i32, minute: i32, second: i32) -> Option<DateTime> {
    let time = jiff::civil::Time::new(hour as i8, minute as i8, second as i8, 0).ok()?;
    Some(t.date().to_datetime(time))
}

/// Set year and month, clamping the day into the target month.
fn with_month_of_year(t: DateTime, year: i32, month: i32) -> Option<DateTime> {
    let first = Date::new(year as i16, month as i8, 1).ok()?;
    let day = (t.day() as i8).min(first.days_in_month());
    let date = Date::new(year as i16, month as i8, day).ok()?;
    Some(date.to_datetime(t.time()))
}

fn add_days(t: DateTime, days: i32) -> Option<DateTime> {
    t.checked_add(Span::new().days(days as i64)).ok()
}

fn quarter(d: Date) -> i32 {
    (d.month() as i32 - 1) / 3 + 1
}

fn leap(d: Date) -> bool {
    d.days_in_year() == 366
}

/// Day of year on which quarter `q` starts; `q == 5` is one past year end.
fn quarter_first_doy(q: i32, leap: bool) -> i32 {
    let base = match q {
        1 => 1,
        2 => 91,
        3 => 182,
        4 => 274,
        _ => 366,
    };
    base + if leap && q > 1 { 1 } else { 0 }
}

// The week numbering of java.time's WeekFields: weeks run from the
// locale's first day, and the first partial week of a bucket counts as
// week 1 only when it has at least `min_days` days; otherwise it is
// week 0.
fn week_offset(day: i32, dow: i32, min_days: i32) -> i32 {
    let week_start = (day - dow).rem_euclid(7);
    if week_start + 1 > min_days {
        7 - week_start
    } else {
        -week_start
    }
}

fn compute_week(offset: i32, day: i32) -> i32 {
    (7 + offset + (day - 1)) / 7
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Weekday;

    fn dt(y: i16, m: i8, d: i8, h: i8, min: i8, s: i8) -> DateTime {
        Date::new(y, m, d)
            .unwrap()
            .to_datetime(jiff::civil::Time::new(h, min, s, 0).unwrap())
    }

    const ISO: WeekFields = WeekFields::ISO;
    const US: WeekFields = WeekFields::SUNDAY_START;

    #[test]
    fn week_of_month_iso() {
        // January 2021 starts on a Friday: Jan 1-3 form a short week 0.
        assert_eq!(value(Field::WeekOfMonth, dt(2021, 1, 1, 0, 0, 0), ISO), 0);
        assert_eq!(value(Field::WeekOfMonth, dt(2021, 1, 4, 0, 0, 0), ISO), 1);
        assert_eq!(value(Field::WeekOfMonth, dt(2021, 1, 31, 0, 0, 0), ISO), 4);
        assert_eq!(bounds(Field::WeekOfMonth, dt(2021, 1, 15, 0, 0, 0), ISO), (0, 4));
    }

    #[test]
    fn week_of_month_sunday_start() {
        // With one-day first weeks, Jan 1-2 2021 already count as week 1.
        assert_eq!(value(Field::WeekOfMonth, dt(2021, 1, 1, 0, 0, 0), US), 1);
        assert_eq!(value(Field::WeekOfMonth, dt(2021, 1, 3, 0, 0, 0), US), 2);
        assert_eq!(bounds(Field::WeekOfMonth, dt(2021, 1, 15, 0, 0, 0), US), (1, 6));
    }

    #[test]
    fn week_of_year_bounds() {
        assert_eq!(value(Field::WeekOfYear, dt(2021, 1, 1, 0, 0, 0), ISO), 0);
        assert_eq!(value(Field::WeekOfYear, dt(2021, 12, 31, 0, 0, 0), ISO), 52);
        assert_eq!(bounds(Field::WeekOfYear, dt(2021, 6, 16, 0, 0, 0), ISO), (0, 52));
        // 2024 starts on a Monday: no week 0.
        assert_eq!(value(Field::WeekOfYear, dt(2024, 1, 1, 0, 0, 0), ISO), 1);
    }

    #[test]
    fn day_of_week_localized() {
        let wed = dt(2021, 6, 16, 12, 0, 0);
        assert_eq!(value(Field::DayOfWeek, wed, ISO), 3);
        assert_eq!(value(Field::DayOfWeek, wed, US), 4);
        let sun = dt(2021, 6, 20, 0, 0, 0);
        assert_eq!(value(Field::DayOfWeek, sun, ISO), 7);
        assert_eq!(value(Field::DayOfWeek, sun, US), 1);
    }

    #[test]
    fn day_of_week_bounds_at_month_edges() {
        // First (partial) week of January 2021: Friday through Sunday.
        let jan2 = dt(2021, 1, 2, 0, 0, 0);
        assert_eq!(
            day_of_week_bounds(Some(Field::WeekOfMonth), jan2, ISO),
            (5, 7)
        );
        // Last week of January 2021 is full: Monday Jan 25 - Sunday Jan 31.
        let jan29 = dt(2021, 1, 29, 0, 0, 0);
        assert_eq!(
            day_of_week_bounds(Some(Field::WeekOfMonth), jan29, ISO),
            (1, 7)
        );
        // Last week of June 2021 ends on Wednesday June 30.
        let jun29 = dt(2021, 6, 29, 0, 0, 0);
        assert_eq!(
            day_of_week_bounds(Some(Field::WeekOfMonth), jun29, ISO),
            (1, 3)
        );
        // No week field: unrestricted.
        assert_eq!(day_of_week_bounds(None, jan2, ISO), (1, 7));
    }

    #[test]
    fn week_adjust_stays_in_month() {
        // From week 3 of January 2021 down to the partial week 0: snaps to
        // Sunday Jan 3, not into December.
        let t = dt(2021, 1, 20, 6, 30, 0);
        let adjusted = adjust(Field::WeekOfMonth, 0, t, ISO).unwrap();
        assert_eq!(adjusted.date(), Date::new(2021, 1, 3).unwrap());
        assert_eq!(adjusted.time(), t.time());

        // Up to the last week: snaps to Monday Jan 25.
        let adjusted = adjust(Field::WeekOfMonth, 4, t, ISO).unwrap();
        assert_eq!(adjusted.date(), Date::new(2021, 1, 25).unwrap());
    }

    #[test]
    fn week_adjust_year_boundary() {
        // Week 52 of 2021 ends on Friday Dec 31; moving the week-of-year to
        // its max must not cross into January 2022.
        let t = dt(2021, 12, 1, 0, 0, 0);
        let adjusted = adjust(Field::WeekOfYear, 52, t, ISO).unwrap();
        assert_eq!(adjusted.date().year(), 2021);
        assert_eq!(value(Field::WeekOfYear, adjusted, ISO), 52);
    }

    #[test]
    fn month_adjust_clamps_day() {
        let jan31 = dt(2021, 1, 31, 8, 0, 0);
        assert_eq!(
            adjust(Field::Month, 2, jan31, ISO).unwrap().date(),
            Date::new(2021, 2, 28).unwrap()
        );
        let leap_day = dt(2024, 2, 29, 0, 0, 0);
        assert_eq!(
            adjust(Field::Year, 2025, leap_day, ISO).unwrap().date(),
            Date::new(2025, 2, 28).unwrap()
        );
    }

    #[test]
    fn quarter_fields() {
        let t = dt(2021, 5, 15, 0, 0, 0);
        assert_eq!(value(Field::QuarterOfYear, t, ISO), 2);
        assert_eq!(value(Field::DayOfQuarter, t, ISO), 45);
        assert_eq!(bounds(Field::DayOfQuarter, t, ISO), (1, 91));
        // Leap year shifts the start of Q2 by one day.
        let t = dt(2024, 4, 1, 0, 0, 0);
        assert_eq!(value(Field::DayOfQuarter, t, ISO), 1);
        assert_eq!(bounds(Field::DayOfQuarter, dt(2024, 1, 1, 0, 0, 0), ISO), (1, 91));
    }

    #[test]
    fn quarter_adjust() {
        let t = dt(2021, 5, 31, 12, 0, 0);
        // Q2 -> Q1 keeps the position in the quarter, clamping the day.
        let adjusted = adjust(Field::QuarterOfYear, 1, t, ISO).unwrap();
        assert_eq!(adjusted.date(), Date::new(2021, 2, 28).unwrap());
        let adjusted = adjust(Field::DayOfQuarter, 1, t, ISO).unwrap();
        assert_eq!(adjusted.date(), Date::new(2021, 4, 1).unwrap());
    }

    #[test]
    fn day_adjusts_preserve_time() {
        let t = dt(2021, 7, 7, 9, 41, 27);
        let adjusted = adjust(Field::DayOfYear, 1, t, ISO).unwrap();
        assert_eq!(adjusted.date(), Date::new(2021, 1, 1).unwrap());
        assert_eq!(adjusted.time(), t.time());
        let adjusted = adjust(Field::DayOfWeek, 1, t, ISO).unwrap();
        assert_eq!(adjusted.date(), Date::new(2021, 7, 5).unwrap());
        assert_eq!(adjusted.time(), t.time());
    }

    #[test]
    fn first_day_numbering_consistency() {
        // Saturday-first locales place Saturday at 1.
        let sat_first = WeekFields {
            first_day: Weekday::Saturday,
            min_days: 1,
        };
        let sat = dt(2021, 6, 19, 0, 0, 0);
        assert_eq!(value(Field::DayOfWeek, sat, sat_first), 1);
        assert_eq!(value(Field::DayOfWeek, dt(2021, 6, 18, 0, 0, 0), sat_first), 7);
    }
}
