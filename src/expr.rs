//! Expression surface: calendar fields, field expressions and the
//! [`Recurrence`] builder.

use std::collections::BTreeMap;

/// A calendar field a recurrence expression can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Second,
    Minute,
    Hour,
    DayOfWeek,
    WeekOfMonth,
    WeekOfYear,
    DayOfMonth,
    DayOfQuarter,
    QuarterOfYear,
    DayOfYear,
    Month,
    Year,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfWeek => "day-of-week",
            Self::WeekOfMonth => "week-of-month",
            Self::WeekOfYear => "week-of-year",
            Self::DayOfMonth => "day-of-month",
            Self::DayOfQuarter => "day-of-quarter",
            Self::QuarterOfYear => "quarter-of-year",
            Self::DayOfYear => "day-of-year",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn from_name(s: &str) -> Option<Field> {
        match s {
            "second" => Some(Self::Second),
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day-of-week" => Some(Self::DayOfWeek),
            "week-of-month" => Some(Self::WeekOfMonth),
            "week-of-year" => Some(Self::WeekOfYear),
            "day-of-month" => Some(Self::DayOfMonth),
            "day-of-quarter" => Some(Self::DayOfQuarter),
            "quarter-of-year" => Some(Self::QuarterOfYear),
            "day-of-year" => Some(Self::DayOfYear),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

/// A field expression.
///
/// Negative integers count from the end of the field's domain: `-1` is the
/// last valid value at the date under consideration (`Spec::value(-1)` on
/// day-of-month is the last day of the month), `-2` the one before it, and
/// so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    /// Every value of the field (`*`).
    All,
    /// An arithmetic progression over a sub-range of the field.
    /// A missing bound defaults to the field's bound at the date under
    /// consideration; a missing step defaults to 1.
    Range {
        min: Option<i32>,
        max: Option<i32>,
        step: Option<i32>,
    },
    /// An explicit enumeration (`+`). Items may be values, names, or nested
    /// ranges, and are merged into one sorted set.
    List(Vec<Spec>),
    /// A single value.
    Value(i32),
    /// A named value: a weekday (`"mon"`..`"sun"`, resolved against the
    /// recurrence's week fields) or a month (`"jan"`..`"dec"`).
    Name(String),
}

impl Spec {
    /// Every value (`*`).
    pub fn all() -> Spec {
        Spec::All
    }

    /// Every `n`-th value from the field's minimum (`*/n` in cron terms).
    pub fn step(n: i32) -> Spec {
        Spec::Range {
            min: None,
            max: None,
            step: Some(n),
        }
    }

    /// All values from `min` through `max` inclusive.
    pub fn span(min: i32, max: i32) -> Spec {
        Spec::Range {
            min: Some(min),
            max: Some(max),
            step: None,
        }
    }

    /// Every `step`-th value from `min` through `max`.
    pub fn range(min: i32, max: i32, step: i32) -> Spec {
        Spec::Range {
            min: Some(min),
            max: Some(max),
            step: Some(step),
        }
    }

    /// A single value.
    pub fn value(v: i32) -> Spec {
        Spec::Value(v)
    }

    /// A named weekday or month.
    pub fn name(s: impl Into<String>) -> Spec {
        Spec::Name(s.into())
    }

    /// An enumeration of arbitrary sub-expressions.
    pub fn list(items: impl IntoIterator<Item = Spec>) -> Spec {
        Spec::List(items.into_iter().collect())
    }

    /// An enumeration of plain values.
    pub fn values(items: impl IntoIterator<Item = i32>) -> Spec {
        Spec::List(items.into_iter().map(Spec::Value).collect())
    }

    /// An enumeration of named values.
    pub fn names<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Spec {
        Spec::List(items.into_iter().map(|s| Spec::Name(s.into())).collect())
    }
}

impl From<i32> for Spec {
    fn from(v: i32) -> Spec {
        Spec::Value(v)
    }
}

impl From<&str> for Spec {
    fn from(s: &str) -> Spec {
        match s {
            "*" => Spec::All,
            _ => Spec::Name(s.to_string()),
        }
    }
}

/// A structured calendar recurrence expression: a mapping from fields to
/// field expressions, plus locale options.
///
/// # Examples
///
/// ```
/// use cadence::{Field, Recurrence, Spec};
///
/// // At minute 0 and 30 of hours 9 through 17, Monday through Friday.
/// let rec = Recurrence::new()
///     .with(Field::Minute, Spec::step(30))
///     .with(Field::Hour, Spec::span(9, 17))
///     .with(Field::DayOfWeek, Spec::names(["mon", "tue", "wed", "thu", "fri"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recurrence {
    pub(crate) fields: BTreeMap<Field, Spec>,
    pub(crate) locale: Option<String>,
    pub(crate) week_fields: Option<WeekFields>,
}

impl Recurrence {
    pub fn new() -> Recurrence {
        Recurrence::default()
    }

    /// Constrain `field` to `spec`, replacing any previous constraint on it.
    pub fn with(mut self, field: Field, spec: impl Into<Spec>) -> Recurrence {
        self.fields.insert(field, spec.into());
        self
    }

    /// Resolve week fields (and weekday names) from a BCP-47 language tag,
    /// e.g. `"en-us"` for Sunday-first weeks. Ignored when explicit week
    /// fields are also set.
    pub fn locale(mut self, tag: impl Into<String>) -> Recurrence {
        self.locale = Some(tag.into());
        self
    }

    /// Set week fields explicitly, overriding any locale.
    pub fn week_fields(mut self, wf: WeekFields) -> Recurrence {
        self.week_fields = Some(wf);
        self
    }

    /// The spec for `field`, if constrained.
    pub fn get(&self, field: Field) -> Option<&Spec> {
        self.fields.get(&field)
    }

    pub(crate) fn resolved_week_fields(&self) -> WeekFields {
        if let Some(wf) = self.week_fields {
            wf
        } else if let Some(tag) = &self.locale {
            WeekFields::of_locale(tag)
        } else {
            WeekFields::ISO
        }
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "mon",
            Self::Tuesday => "tue",
            Self::Wednesday => "wed",
            Self::Thursday => "thu",
            Self::Friday => "fri",
            Self::Saturday => "sat",
            Self::Sunday => "sun",
        }
    }

    pub fn to_jiff(self) -> jiff::civil::Weekday {
        match self {
            Self::Monday => jiff::civil::Weekday::Monday,
            Self::Tuesday => jiff::civil::Weekday::Tuesday,
            Self::Wednesday => jiff::civil::Weekday::Wednesday,
            Self::Thursday => jiff::civil::Weekday::Thursday,
            Self::Friday => jiff::civil::Weekday::Friday,
            Self::Saturday => jiff::civil::Weekday::Saturday,
            Self::Sunday => jiff::civil::Weekday::Sunday,
        }
    }

    pub fn from_jiff(wd: jiff::civil::Weekday) -> Self {
        match wd {
            jiff::civil::Weekday::Monday => Self::Monday,
            jiff::civil::Weekday::Tuesday => Self::Tuesday,
            jiff::civil::Weekday::Wednesday => Self::Wednesday,
            jiff::civil::Weekday::Thursday => Self::Thursday,
            jiff::civil::Weekday::Friday => Self::Friday,
            jiff::civil::Weekday::Saturday => Self::Saturday,
            jiff::civil::Weekday::Sunday => Self::Sunday,
        }
    }

    /// ISO 8601 day number: Monday=1, Sunday=7.
    pub fn number(self) -> u8 {
        match self {
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
            Self::Sunday => 7,
        }
    }
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Monday),
        "tuesday" | "tue" => Some(Weekday::Tuesday),
        "wednesday" | "wed" => Some(Weekday::Wednesday),
        "thursday" | "thu" => Some(Weekday::Thursday),
        "friday" | "fri" => Some(Weekday::Friday),
        "saturday" | "sat" => Some(Weekday::Saturday),
        "sunday" | "sun" => Some(Weekday::Sunday),
        _ => None,
    }
}

pub fn parse_month(s: &str) -> Option<i32> {
    match s.to_lowercase().as_str() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

/// Locale-dependent definition of the week: which day starts it, and how
/// many days of the first partial week of a month or year are required for
/// it to count as week 1 (days before that fall in week 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekFields {
    pub first_day: Weekday,
    pub min_days: u8,
}

// CLDR week-data, keyed by region. Regions absent from every list start
// their weeks on Monday with a one-day first week.
const FIRST_DAY_SUN: &[&str] = &[
    "AG", "AS", "AU", "BD", "BR", "BS", "BT", "BW", "BZ", "CA", "CN", "CO", "DM", "DO", "ET",
    "GT", "GU", "HK", "HN", "ID", "IL", "IN", "JM", "JP", "KE", "KH", "KR", "LA", "MH", "MM",
    "MO", "MT", "MX", "MZ", "NI", "NP", "PA", "PE", "PH", "PK", "PR", "PY", "SA", "SG", "SV",
    "TH", "TT", "TW", "UM", "US", "VE", "VI", "WS", "YE", "ZA", "ZW",
];
const FIRST_DAY_SAT: &[&str] = &[
    "AE", "AF", "BH", "DJ", "DZ", "EG", "IQ", "IR", "JO", "KW", "LY", "OM", "QA", "SD", "SY",
];
const FIRST_DAY_FRI: &[&str] = &["MV"];
const MIN_DAYS_FOUR: &[&str] = &[
    "AD", "AN", "AT", "AX", "BE", "BG", "CH", "CZ", "DE", "DK", "EE", "ES", "FI", "FJ", "FO",
    "FR", "GB", "GF", "GG", "GI", "GP", "GR", "HU", "IE", "IM", "IS", "IT", "JE", "LI", "LT",
    "LU", "MC", "MQ", "NL", "NO", "PL", "PT", "RE", "RU", "SE", "SJ", "SK", "SM", "VA",
];

impl WeekFields {
    /// ISO 8601 weeks: Monday-first, four-day first week.
    pub const ISO: WeekFields = WeekFields {
        first_day: Weekday::Monday,
        min_days: 4,
    };

    /// Sunday-first, one-day first week (the United States convention).
    pub const SUNDAY_START: WeekFields = WeekFields {
        first_day: Weekday::Sunday,
        min_days: 1,
    };

    /// Week fields for a BCP-47 language tag, looked up by region subtag.
    /// Tags without a region subtag resolve to [`WeekFields::ISO`].
    pub fn of_locale(tag: &str) -> WeekFields {
        let region = match locale_region(tag) {
            Some(r) => r,
            None => return WeekFields::ISO,
        };
        let contains = |list: &[&str]| list.iter().any(|r| *r == region);
        let first_day = if contains(FIRST_DAY_SUN) {
            Weekday::Sunday
        } else if contains(FIRST_DAY_SAT) {
            Weekday::Saturday
        } else if contains(FIRST_DAY_FRI) {
            Weekday::Friday
        } else {
            Weekday::Monday
        };
        let min_days = if contains(MIN_DAYS_FOUR) { 4 } else { 1 };
        WeekFields { first_day, min_days }
    }

    /// The localized number of a day of the week, in `1..=7` with
    /// `first_day` mapping to 1.
    pub fn day_number(&self, wd: jiff::civil::Weekday) -> i32 {
        let iso = wd.to_monday_one_offset() as i32;
        let first = self.first_day.number() as i32;
        (iso - first).rem_euclid(7) + 1
    }

    /// The localized number of a named weekday.
    pub fn weekday_number(&self, wd: Weekday) -> i32 {
        self.day_number(wd.to_jiff())
    }
}

fn locale_region(tag: &str) -> Option<String> {
    tag.split(['-', '_'])
        .skip(1)
        .find(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|part| part.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_week_fields() {
        assert_eq!(WeekFields::of_locale("en-us"), WeekFields::SUNDAY_START);
        assert_eq!(
            WeekFields::of_locale("en-be"),
            WeekFields {
                first_day: Weekday::Monday,
                min_days: 4
            }
        );
        assert_eq!(WeekFields::of_locale("fr_FR"), WeekFields::ISO);
        assert_eq!(
            WeekFields::of_locale("ar-EG").first_day,
            Weekday::Saturday
        );
        // No region: ISO.
        assert_eq!(WeekFields::of_locale("en"), WeekFields::ISO);
    }

    #[test]
    fn localized_day_numbers() {
        let iso = WeekFields::ISO;
        assert_eq!(iso.weekday_number(Weekday::Monday), 1);
        assert_eq!(iso.weekday_number(Weekday::Sunday), 7);

        let us = WeekFields::SUNDAY_START;
        assert_eq!(us.weekday_number(Weekday::Sunday), 1);
        assert_eq!(us.weekday_number(Weekday::Monday), 2);
        assert_eq!(us.weekday_number(Weekday::Saturday), 7);
    }

    #[test]
    fn spec_constructors() {
        assert_eq!(
            Spec::step(12),
            Spec::Range {
                min: None,
                max: None,
                step: Some(12)
            }
        );
        assert_eq!(
            Spec::span(9, 17),
            Spec::Range {
                min: Some(9),
                max: Some(17),
                step: None
            }
        );
        assert_eq!(
            Spec::names(["mon", "wed"]),
            Spec::List(vec![Spec::Name("mon".into()), Spec::Name("wed".into())])
        );
        assert_eq!(Spec::from("*"), Spec::All);
        assert_eq!(Spec::from("thu"), Spec::Name("thu".into()));
        assert_eq!(Spec::from(-1), Spec::Value(-1));
    }

    #[test]
    fn recurrence_builder_replaces() {
        let rec = Recurrence::new()
            .with(Field::Hour, Spec::value(9))
            .with(Field::Hour, Spec::value(12));
        assert_eq!(rec.get(Field::Hour), Some(&Spec::Value(12)));
        assert_eq!(rec.get(Field::Minute), None);
    }
}
