//! Compact text rendering of recurrence expressions.

use std::fmt;

use crate::expr::{Field, Recurrence, Spec, WeekFields, Weekday};

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::All => f.write_str("*"),
            Spec::Value(v) => write!(f, "{v}"),
            Spec::Name(name) => f.write_str(name),
            Spec::Range { min, max, step } => {
                match (min, max) {
                    (None, None) => f.write_str("*")?,
                    (lo, hi) => {
                        match lo {
                            Some(v) => write!(f, "{v}")?,
                            None => f.write_str("*")?,
                        }
                        f.write_str("-")?;
                        match hi {
                            Some(v) => write!(f, "{v}")?,
                            None => f.write_str("*")?,
                        }
                    }
                }
                if let Some(s) = step {
                    write!(f, "/{s}")?;
                }
                Ok(())
            }
            Spec::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WeekFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == WeekFields::ISO {
            f.write_str("iso")
        } else if *self == WeekFields::SUNDAY_START {
            f.write_str("sunday-start")
        } else {
            write!(f, "first-day {}, min-days {}", self.first_day, self.min_days)
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut sep = "";
        for (field, spec) in &self.fields {
            write!(f, "{sep}{field}: {spec}")?;
            sep = ", ";
        }
        if let Some(locale) = &self.locale {
            write!(f, "{sep}locale: {locale}")?;
            sep = ", ";
        }
        if let Some(wf) = &self.week_fields {
            write!(f, "{sep}week-fields: {wf}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_rendering() {
        assert_eq!(Spec::All.to_string(), "*");
        assert_eq!(Spec::step(12).to_string(), "*/12");
        assert_eq!(Spec::span(9, 17).to_string(), "9-17");
        assert_eq!(Spec::range(0, 59, 30).to_string(), "0-59/30");
        assert_eq!(Spec::value(-1).to_string(), "-1");
        assert_eq!(Spec::names(["mon", "wed"]).to_string(), "[mon, wed]");
        assert_eq!(
            Spec::list([Spec::value(1), Spec::span(10, 16)]).to_string(),
            "[1, 10-16]"
        );
    }

    #[test]
    fn recurrence_rendering() {
        let rec = Recurrence::new()
            .with(Field::Hour, Spec::step(12))
            .with(Field::DayOfWeek, Spec::names(["mon", "wed"]))
            .locale("en-be");
        assert_eq!(
            rec.to_string(),
            "{hour: */12, day-of-week: [mon, wed], locale: en-be}"
        );
    }

    #[test]
    fn week_fields_rendering() {
        assert_eq!(WeekFields::ISO.to_string(), "iso");
        assert_eq!(WeekFields::SUNDAY_START.to_string(), "sunday-start");
        let custom = WeekFields {
            first_day: Weekday::Saturday,
            min_days: 1,
        };
        assert_eq!(custom.to_string(), "first-day sat, min-days 1");
    }
}
