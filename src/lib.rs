//! cadence — bidirectional time-point iteration over structured calendar
//! recurrence expressions.
//!
//! A [`Recurrence`] constrains calendar fields (second through year,
//! including week-numbered fields); a [`Cursor`] walks the instants
//! matching it, forward and backward, in an IANA time zone. Instants that
//! a daylight-saving gap swallows fire once at the gap's exit; local times
//! that exist twice resolve to the earlier offset.
//!
//! # Examples
//!
//! ```
//! use cadence::{Cursor, Field, Recurrence, Spec};
//!
//! // Every 12th hour on Mondays and Wednesdays.
//! let rec = Recurrence::new()
//!     .with(Field::Hour, Spec::step(12))
//!     .with(Field::DayOfWeek, Spec::names(["mon", "wed"]));
//!
//! let start: jiff::Zoned = "2021-06-16T11:15:30+02:00[Europe/Brussels]".parse().unwrap();
//! let cursor = Cursor::new(&rec, &start).unwrap();
//! let next = cursor.next().unwrap();
//! assert_eq!(next.current().to_string(), "2021-06-16T12:00:00+02:00[Europe/Brussels]");
//! ```

pub mod cursor;
pub mod error;
pub mod expr;

mod display;
mod fields;
mod plan;
mod scalar;

pub use cursor::{Cursor, Misalignment};
pub use error::RecurrenceError;
pub use expr::{parse_month, parse_weekday, Field, Recurrence, Spec, WeekFields, Weekday};

use jiff::Zoned;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// --- Recurrence convenience methods ---

impl Recurrence {
    /// A lazy iterator over the matching instants strictly after `from`.
    ///
    /// Unbounded for any expression that keeps matching; limit it with the
    /// usual iterator adapters.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence::{Field, Recurrence, Spec};
    ///
    /// let rec = Recurrence::new().with(Field::Hour, Spec::value(9));
    /// let from: jiff::Zoned = "2021-06-16T00:00:00+02:00[Europe/Brussels]".parse().unwrap();
    /// let three: Vec<_> = rec.points(&from).unwrap().take(3).collect();
    /// assert_eq!(three[0].to_string(), "2021-06-16T09:00:00+02:00[Europe/Brussels]");
    /// assert_eq!(three[2].to_string(), "2021-06-18T09:00:00+02:00[Europe/Brussels]");
    /// ```
    pub fn points(&self, from: &Zoned) -> Result<Points, RecurrenceError> {
        Ok(Points {
            cursor: Some(Cursor::new(self, from)?),
            end: None,
        })
    }

    /// The matching instants in `(from, to]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence::{Field, Recurrence, Spec};
    ///
    /// let rec = Recurrence::new().with(Field::Hour, Spec::value(9));
    /// let from: jiff::Zoned = "2021-06-16T00:00:00+02:00[Europe/Brussels]".parse().unwrap();
    /// let to: jiff::Zoned = "2021-06-18T12:00:00+02:00[Europe/Brussels]".parse().unwrap();
    /// assert_eq!(rec.between(&from, &to).unwrap().count(), 3);
    /// ```
    pub fn between(&self, from: &Zoned, to: &Zoned) -> Result<Points, RecurrenceError> {
        Ok(Points {
            cursor: Some(Cursor::new(self, from)?),
            end: Some(to.clone()),
        })
    }

    /// Whether `at` satisfies this expression (or is the exit of a DST gap
    /// that swallowed a matching instant).
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence::{Field, Recurrence, Spec};
    ///
    /// let rec = Recurrence::new().with(Field::Hour, Spec::value(9));
    /// let on: jiff::Zoned = "2021-06-16T09:00:00+02:00[Europe/Brussels]".parse().unwrap();
    /// assert!(rec.matches(&on).unwrap());
    /// let off: jiff::Zoned = "2021-06-16T10:00:00+02:00[Europe/Brussels]".parse().unwrap();
    /// assert!(!rec.matches(&off).unwrap());
    /// ```
    pub fn matches(&self, at: &Zoned) -> Result<bool, RecurrenceError> {
        Ok(Cursor::new(self, at)?.is_valid())
    }
}

/// Lazy forward iterator returned by [`Recurrence::points`] and
/// [`Recurrence::between`].
#[derive(Debug, Clone)]
pub struct Points {
    cursor: Option<Cursor>,
    end: Option<Zoned>,
}

impl Iterator for Points {
    type Item = Zoned;

    fn next(&mut self) -> Option<Zoned> {
        let cursor = self.cursor.take()?;
        let advanced = cursor.next()?;
        if let Some(end) = &self.end {
            if advanced.current() > end {
                return None;
            }
        }
        let point = advanced.current().clone();
        self.cursor = Some(advanced);
        Some(point)
    }
}

// --- Serde ---

/// The serialized form mirrors the map shape of the expression surface:
/// field names map to `"*"`, integers, names, `["*", min?, max?, step?]`
/// range vectors (one argument means a step, two mean min and max), or
/// `["+", item, …]` enumerations. `locale` and `week-fields` ride along as
/// extra keys, so a `Recurrence` round-trips through JSON unchanged.
#[cfg(feature = "serde")]
impl Serialize for Spec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        match self {
            Spec::All => serializer.serialize_str("*"),
            Spec::Value(v) => serializer.serialize_i32(*v),
            Spec::Name(name) => serializer.serialize_str(name),
            Spec::Range { min, max, step } => {
                let args: Vec<Option<i32>> = match (min, max, step) {
                    (None, None, Some(step)) => vec![Some(*step)],
                    (min, max, None) => vec![*min, *max],
                    (min, max, step) => vec![*min, *max, *step],
                };
                let mut seq = serializer.serialize_seq(Some(args.len() + 1))?;
                seq.serialize_element("*")?;
                for arg in args {
                    seq.serialize_element(&arg)?;
                }
                seq.end()
            }
            Spec::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len() + 1))?;
                seq.serialize_element("+")?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Spec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{self, SeqAccess, Visitor};
        use std::fmt;

        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = Spec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field expression: \"*\", an integer, a name, or a tagged vector")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Spec, E> {
                i32::try_from(v)
                    .map(Spec::Value)
                    .map_err(|_| E::custom("field value out of range"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Spec, E> {
                i32::try_from(v)
                    .map(Spec::Value)
                    .map_err(|_| E::custom("field value out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Spec, E> {
                Ok(match v {
                    "*" => Spec::All,
                    "+" => Spec::List(Vec::new()),
                    _ => Spec::Name(v.to_string()),
                })
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Spec, A::Error> {
                match seq.next_element::<Spec>()? {
                    None => Ok(Spec::List(Vec::new())),
                    // `["*", …]`: one argument is a step, two are min and
                    // max, three are min, max and step.
                    Some(Spec::All) => {
                        let mut args: Vec<Option<i32>> = Vec::new();
                        loop {
                            match seq.next_element::<Option<i32>>() {
                                Ok(Some(arg)) => args.push(arg),
                                Ok(None) => break,
                                Err(_) => {
                                    return Err(serde::de::Error::custom(
                                        "invalid range: arguments must be integers or null",
                                    ))
                                }
                            }
                            if args.len() > 3 {
                                return Err(serde::de::Error::custom(
                                    "invalid range: at most three arguments",
                                ));
                            }
                        }
                        Ok(match args.len() {
                            0 => Spec::Range {
                                min: None,
                                max: None,
                                step: None,
                            },
                            1 => Spec::Range {
                                min: None,
                                max: None,
                                step: args[0],
                            },
                            2 => Spec::Range {
                                min: args[0],
                                max: args[1],
                                step: None,
                            },
                            _ => Spec::Range {
                                min: args[0],
                                max: args[1],
                                step: args[2],
                            },
                        })
                    }
                    // `["+", …]`: an explicit enumeration.
                    Some(Spec::List(head)) if head.is_empty() => {
                        let mut items = Vec::new();
                        while let Some(item) = seq.next_element::<Spec>()? {
                            items.push(item);
                        }
                        Ok(Spec::List(items))
                    }
                    // Untagged sequences enumerate plain items.
                    Some(first) => {
                        let mut items = vec![first];
                        while let Some(item) = seq.next_element::<Spec>()? {
                            items.push(item);
                        }
                        Ok(Spec::List(items))
                    }
                }
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

#[cfg(feature = "serde")]
impl Serialize for WeekFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        if *self == WeekFields::ISO {
            serializer.serialize_str("iso")
        } else if *self == WeekFields::SUNDAY_START {
            serializer.serialize_str("sunday-start")
        } else {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("first-day", self.first_day.as_str())?;
            map.serialize_entry("min-days", &self.min_days)?;
            map.end()
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for WeekFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{self, MapAccess, Visitor};
        use std::fmt;

        struct WeekFieldsVisitor;

        impl<'de> Visitor<'de> for WeekFieldsVisitor {
            type Value = WeekFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"iso\", \"sunday-start\", or {first-day, min-days}")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<WeekFields, E> {
                match v {
                    "iso" => Ok(WeekFields::ISO),
                    "sunday-start" => Ok(WeekFields::SUNDAY_START),
                    _ => Err(E::custom(format!("unknown week fields: {v}"))),
                }
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<WeekFields, A::Error> {
                let mut first_day = None;
                let mut min_days = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "first-day" => {
                            let name: String = map.next_value()?;
                            first_day = Some(parse_weekday(&name).ok_or_else(|| {
                                de::Error::custom(format!("unknown weekday: {name}"))
                            })?);
                        }
                        "min-days" => min_days = Some(map.next_value::<u8>()?),
                        other => {
                            return Err(de::Error::custom(format!(
                                "unknown week fields key: {other}"
                            )))
                        }
                    }
                }
                Ok(WeekFields {
                    first_day: first_day
                        .ok_or_else(|| de::Error::custom("missing first-day"))?,
                    min_days: min_days.unwrap_or(1),
                })
            }
        }

        deserializer.deserialize_any(WeekFieldsVisitor)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Recurrence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        for (field, spec) in &self.fields {
            map.serialize_entry(field.as_str(), spec)?;
        }
        if let Some(locale) = &self.locale {
            map.serialize_entry("locale", locale)?;
        }
        if let Some(wf) = &self.week_fields {
            map.serialize_entry("week-fields", wf)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Recurrence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{self, MapAccess, Visitor};
        use std::fmt;

        struct RecurrenceVisitor;

        impl<'de> Visitor<'de> for RecurrenceVisitor {
            type Value = Recurrence;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to field expressions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Recurrence, A::Error> {
                let mut rec = Recurrence::new();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "locale" => rec.locale = Some(map.next_value()?),
                        "week-fields" => rec.week_fields = Some(map.next_value()?),
                        name => match Field::from_name(name) {
                            Some(field) => {
                                rec.fields.insert(field, map.next_value()?);
                            }
                            None => {
                                return Err(de::Error::custom(format!(
                                    "unknown field key: {name}"
                                )))
                            }
                        },
                    }
                }
                Ok(rec)
            }
        }

        deserializer.deserialize_map(RecurrenceVisitor)
    }
}
