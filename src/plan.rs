//! Recurrence normalization: desugar field expressions, resolve named
//! values, pick the board of jointly-iterable fields, and build the
//! residual mask.
//!
//! A board is a chain of fields, smallest unit first, where each field's
//! carry lands in the next one up, ending at the year. Fields of the
//! expression that fit no chain together with the board become the mask: a
//! date predicate checked after every candidate the board produces.

use std::collections::BTreeMap;

use jiff::civil::DateTime;

use crate::error::RecurrenceError;
use crate::expr::{parse_month, parse_weekday, Field, Recurrence, Spec, WeekFields};
use crate::fields;
use crate::scalar::{EnumIter, RangeIter, Scalar};

/// Every total chain from sub-day units up to the year.
const BOARDS: [&[Field]; 5] = [
    &[
        Field::Second,
        Field::Minute,
        Field::Hour,
        Field::DayOfYear,
        Field::Year,
    ],
    &[
        Field::Second,
        Field::Minute,
        Field::Hour,
        Field::DayOfQuarter,
        Field::QuarterOfYear,
        Field::Year,
    ],
    &[
        Field::Second,
        Field::Minute,
        Field::Hour,
        Field::DayOfMonth,
        Field::Month,
        Field::Year,
    ],
    &[
        Field::Second,
        Field::Minute,
        Field::Hour,
        Field::DayOfWeek,
        Field::WeekOfYear,
        Field::Year,
    ],
    &[
        Field::Second,
        Field::Minute,
        Field::Hour,
        Field::DayOfWeek,
        Field::WeekOfMonth,
        Field::Month,
        Field::Year,
    ],
];

/// A desugared field expression: names resolved, nesting flattened,
/// from-end offsets still symbolic (they depend on the date's bounds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormSpec {
    Range {
        min: Option<i32>,
        max: Option<i32>,
        step: Option<i32>,
    },
    Values(Vec<NormItem>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormItem {
    Value(i32),
    Range {
        min: Option<i32>,
        max: Option<i32>,
        step: Option<i32>,
    },
}

/// A concrete integer domain: a spec clipped against a field's bounds at a
/// particular date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domain {
    Range { min: i32, max: i32, step: i32 },
    Values(Vec<i32>),
}

/// From-end offsets address backwards from the bound: `-1` is `max`.
fn from_end(v: i32, max: i32) -> i32 {
    if v < 0 {
        max + 1 + v
    } else {
        v
    }
}

impl NormSpec {
    /// Clip to the domain `[min, max]`. An enumeration drops values outside
    /// the domain; an explicitly empty enumeration means "the first value".
    pub fn clip(&self, min: i32, max: i32) -> Domain {
        match self {
            NormSpec::Range {
                min: lo,
                max: hi,
                step,
            } => Domain::Range {
                min: from_end(lo.unwrap_or(min), max).max(min),
                max: from_end(hi.unwrap_or(max), max).min(max),
                step: step.unwrap_or(1),
            },
            NormSpec::Values(items) => {
                if items.is_empty() {
                    return Domain::Values(vec![min]);
                }
                let mut vals = Vec::new();
                for item in items {
                    match *item {
                        NormItem::Value(v) => {
                            let v = from_end(v, max);
                            if (min..=max).contains(&v) {
                                vals.push(v);
                            }
                        }
                        NormItem::Range {
                            min: lo,
                            max: hi,
                            step,
                        } => {
                            let lo = from_end(lo.unwrap_or(min), max).max(min);
                            let hi = from_end(hi.unwrap_or(max), max).min(max);
                            let step = step.unwrap_or(1);
                            let mut v = lo;
                            while v <= hi {
                                vals.push(v);
                                v += step;
                            }
                        }
                    }
                }
                vals.sort_unstable();
                vals.dedup();
                Domain::Values(vals)
            }
        }
    }
}

impl Domain {
    pub fn cardinality(&self) -> i64 {
        match self {
            Domain::Range { min, max, step } => {
                if max >= min {
                    ((max - min) / step + 1) as i64
                } else {
                    0
                }
            }
            Domain::Values(vals) => vals.len() as i64,
        }
    }

    /// A scalar iterator over this domain seeded at `v`.
    pub fn seed(&self, v: i32) -> Scalar {
        match self {
            Domain::Range { min, max, step } => {
                Scalar::Range(RangeIter::seed(*min, *max, *step, v))
            }
            Domain::Values(vals) => Scalar::Enum(EnumIter::seed(vals.clone(), v)),
        }
    }

    pub fn contains(&self, v: i32) -> bool {
        match self {
            Domain::Range { min, max, step } => {
                *min <= v && v <= *max && (v - min) % step == 0
            }
            Domain::Values(vals) => vals.binary_search(&v).is_ok(),
        }
    }
}

fn resolve_name(field: Field, name: &str, wf: WeekFields) -> Option<i32> {
    match field {
        Field::DayOfWeek => parse_weekday(name).map(|wd| wf.weekday_number(wd)),
        Field::Month => parse_month(name),
        _ => None,
    }
}

fn desugar(field: Field, spec: &Spec, wf: WeekFields) -> Result<NormSpec, RecurrenceError> {
    match spec {
        Spec::All => Ok(NormSpec::Range {
            min: None,
            max: None,
            step: None,
        }),
        Spec::Range { min, max, step } => Ok(NormSpec::Range {
            min: *min,
            max: *max,
            step: *step,
        }),
        Spec::Value(v) => Ok(NormSpec::Values(vec![NormItem::Value(*v)])),
        Spec::Name(name) => match resolve_name(field, name, wf) {
            Some(v) => Ok(NormSpec::Values(vec![NormItem::Value(v)])),
            None => Err(RecurrenceError::invalid_field(field, spec)),
        },
        Spec::List(items) => {
            let mut out = Vec::new();
            flatten(field, items, wf, &mut out)?;
            Ok(NormSpec::Values(out))
        }
    }
}

fn flatten(
    field: Field,
    items: &[Spec],
    wf: WeekFields,
    out: &mut Vec<NormItem>,
) -> Result<(), RecurrenceError> {
    for item in items {
        match item {
            Spec::Value(v) => out.push(NormItem::Value(*v)),
            Spec::Name(name) => match resolve_name(field, name, wf) {
                Some(v) => out.push(NormItem::Value(v)),
                None => return Err(RecurrenceError::invalid_enumeration(field, item)),
            },
            Spec::Range { min, max, step } => out.push(NormItem::Range {
                min: *min,
                max: *max,
                step: *step,
            }),
            Spec::All => out.push(NormItem::Range {
                min: None,
                max: None,
                step: None,
            }),
            Spec::List(inner) => flatten(field, inner, wf, out).map_err(|e| match e {
                RecurrenceError::InvalidEnumeration { .. } => {
                    RecurrenceError::invalid_sub_field(field, item)
                }
                other => other,
            })?,
        }
    }
    Ok(())
}

/// Reject expressions that can never produce a value anywhere: non-positive
/// steps, ranges empty against the field's widest domain, enumerations
/// whose every item falls outside it.
fn validate(field: Field, norm: &NormSpec, orig: &Spec) -> Result<(), RecurrenceError> {
    let (lo, hi) = fields::static_bounds(field);
    match norm {
        NormSpec::Range { step, .. } => {
            if step.unwrap_or(1) <= 0 {
                return Err(RecurrenceError::range_step(field, orig));
            }
            if let Domain::Range { min, max, .. } = norm.clip(lo, hi) {
                if min > max {
                    return Err(RecurrenceError::range_step(field, orig));
                }
            }
            Ok(())
        }
        NormSpec::Values(items) => {
            for item in items {
                if let NormItem::Range { step, .. } = item {
                    if step.unwrap_or(1) <= 0 {
                        return Err(RecurrenceError::range_step(field, orig));
                    }
                }
            }
            if !items.is_empty() && norm.clip(lo, hi).cardinality() == 0 {
                return Err(RecurrenceError::invalid_enumeration(field, orig));
            }
            Ok(())
        }
    }
}

fn choose_board(norm: &BTreeMap<Field, NormSpec>) -> &'static [Field] {
    let count = |board: &[Field]| board.iter().filter(|f| norm.contains_key(f)).count();
    let weight = |board: &[Field]| -> i64 {
        board
            .iter()
            .filter_map(|f| {
                let (lo, hi) = fields::static_bounds(*f);
                norm.get(f).map(|n| n.clip(lo, hi).cardinality())
            })
            .sum()
    };
    let best = BOARDS.iter().map(|b| count(b)).max().unwrap_or(0);
    BOARDS
        .iter()
        .filter(|b| count(b) == best)
        .min_by_key(|b| weight(b))
        .copied()
        .unwrap_or(BOARDS[2])
}

/// An executable recurrence: the chosen board with a desugared spec per
/// slot (smallest unit first), the residual mask, and the resolved week
/// definition. Immutable; shared by every cursor stepped from it.
#[derive(Debug, Clone)]
pub struct Plan {
    pub board: &'static [Field],
    pub week_field: Option<Field>,
    pub specs: Vec<NormSpec>,
    pub mask: Vec<(Field, NormSpec)>,
    pub week_fields: WeekFields,
    pub locale: Option<String>,
}

impl Plan {
    pub fn build(rec: &Recurrence) -> Result<Plan, RecurrenceError> {
        let wf = rec.resolved_week_fields();

        let mut norm = BTreeMap::new();
        for (field, spec) in &rec.fields {
            let n = desugar(*field, spec, wf)?;
            validate(*field, &n, spec)?;
            norm.insert(*field, n);
        }

        let board = choose_board(&norm);
        let first_client = board.iter().position(|f| norm.contains_key(f));

        // Fields the client left out: below the smallest constrained field
        // they pin to the first value, above it they recur over the full
        // span. The year always recurs.
        let specs = board
            .iter()
            .enumerate()
            .map(|(slot, f)| match norm.get(f) {
                Some(n) => n.clone(),
                None => {
                    let full = *f == Field::Year
                        || first_client.map_or(false, |fc| slot > fc);
                    if full {
                        NormSpec::Range {
                            min: None,
                            max: None,
                            step: None,
                        }
                    } else {
                        NormSpec::Values(Vec::new())
                    }
                }
            })
            .collect();

        let mask = norm
            .iter()
            .filter(|(f, _)| !board.contains(f))
            .map(|(f, n)| (*f, n.clone()))
            .collect();

        let week_field = board
            .iter()
            .copied()
            .find(|f| matches!(f, Field::WeekOfMonth | Field::WeekOfYear));

        Ok(Plan {
            board,
            week_field,
            specs,
            mask,
            week_fields: wf,
            locale: rec.locale.clone(),
        })
    }

    /// The residual predicate: every mask field's value at `t` must belong
    /// to its clipped domain.
    pub fn satisfies_mask(&self, t: DateTime) -> bool {
        self.mask.iter().all(|(field, spec)| {
            let (lo, hi) = fields::bounds(*field, t, self.week_fields);
            spec.clip(lo, hi)
                .contains(fields::value(*field, t, self.week_fields))
        })
    }

    /// Clipped domain of the spec at board `slot` for the date `t`.
    pub fn domain_at(&self, slot: usize, t: DateTime) -> Domain {
        let field = self.board[slot];
        let (lo, hi) = if field == Field::DayOfWeek {
            fields::day_of_week_bounds(self.week_field, t, self.week_fields)
        } else {
            fields::bounds(field, t, self.week_fields)
        };
        self.specs[slot].clip(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::Date;

    fn plan(rec: &Recurrence) -> Plan {
        Plan::build(rec).expect("valid recurrence")
    }

    fn dt(y: i16, m: i8, d: i8) -> DateTime {
        Date::new(y, m, d)
            .unwrap()
            .to_datetime(jiff::civil::Time::midnight())
    }

    #[test]
    fn board_follows_constrained_fields() {
        let p = plan(
            &Recurrence::new()
                .with(Field::Minute, Spec::step(30))
                .with(Field::Hour, Spec::values([1, 2, 4]))
                .with(Field::DayOfMonth, 28)
                .with(Field::Month, Spec::values([3, 10])),
        );
        assert_eq!(
            p.board,
            &[
                Field::Second,
                Field::Minute,
                Field::Hour,
                Field::DayOfMonth,
                Field::Month,
                Field::Year
            ]
        );
        assert!(p.mask.is_empty());
    }

    #[test]
    fn day_of_week_selects_a_week_board() {
        let p = plan(
            &Recurrence::new()
                .with(Field::Hour, Spec::step(12))
                .with(Field::DayOfWeek, Spec::names(["mon", "wed"])),
        );
        assert_eq!(
            p.board,
            &[
                Field::Second,
                Field::Minute,
                Field::Hour,
                Field::DayOfWeek,
                Field::WeekOfYear,
                Field::Year
            ]
        );
        assert_eq!(p.week_field, Some(Field::WeekOfYear));
    }

    #[test]
    fn unchainable_fields_become_the_mask() {
        // day-of-week and day-of-year share no board; the cheaper
        // day-of-week side wins the board and day-of-year is masked.
        let p = plan(
            &Recurrence::new()
                .with(Field::DayOfWeek, "sun")
                .with(Field::DayOfYear, Spec::span(1, 7)),
        );
        assert!(p.board.contains(&Field::DayOfWeek));
        assert_eq!(p.mask.len(), 1);
        assert_eq!(p.mask[0].0, Field::DayOfYear);
    }

    #[test]
    fn missing_fields_pin_below_and_recur_above() {
        let p = plan(&Recurrence::new().with(Field::DayOfMonth, 1));
        // second/minute/hour pin to their first value
        for slot in 0..3 {
            assert_eq!(p.specs[slot], NormSpec::Values(Vec::new()));
        }
        // month and year recur over the full span
        for slot in [4, 5] {
            assert_eq!(
                p.specs[slot],
                NormSpec::Range {
                    min: None,
                    max: None,
                    step: None
                }
            );
        }
    }

    #[test]
    fn empty_expression_recurs_yearly() {
        let p = plan(&Recurrence::new());
        assert_eq!(p.board, BOARDS[0]);
        let year_slot = p.board.len() - 1;
        assert!(matches!(p.specs[year_slot], NormSpec::Range { .. }));
        assert_eq!(p.specs[0], NormSpec::Values(Vec::new()));
    }

    #[test]
    fn locale_resolves_weekday_numbers() {
        let p = plan(
            &Recurrence::new()
                .with(Field::DayOfWeek, "sun")
                .locale("en-us"),
        );
        let slot = p
            .board
            .iter()
            .position(|f| *f == Field::DayOfWeek)
            .expect("on board");
        assert_eq!(p.specs[slot], NormSpec::Values(vec![NormItem::Value(1)]));

        let p = plan(&Recurrence::new().with(Field::DayOfWeek, "sun"));
        let slot = p
            .board
            .iter()
            .position(|f| *f == Field::DayOfWeek)
            .expect("on board");
        assert_eq!(p.specs[slot], NormSpec::Values(vec![NormItem::Value(7)]));
    }

    #[test]
    fn clip_resolves_from_end_offsets() {
        let spec = NormSpec::Range {
            min: Some(-7),
            max: Some(-1),
            step: None,
        };
        assert_eq!(
            spec.clip(1, 28),
            Domain::Range {
                min: 22,
                max: 28,
                step: 1
            }
        );
        let last = NormSpec::Values(vec![NormItem::Value(-1)]);
        assert_eq!(last.clip(1, 29), Domain::Values(vec![29]));
        assert_eq!(last.clip(1, 28), Domain::Values(vec![28]));
    }

    #[test]
    fn clip_drops_out_of_domain_values() {
        let spec = NormSpec::Values(vec![NormItem::Value(31), NormItem::Value(15)]);
        assert_eq!(spec.clip(1, 30), Domain::Values(vec![15]));
        assert_eq!(spec.clip(1, 31), Domain::Values(vec![15, 31]));
    }

    #[test]
    fn empty_enumeration_means_first_value() {
        let spec = NormSpec::Values(Vec::new());
        assert_eq!(spec.clip(0, 59), Domain::Values(vec![0]));
    }

    #[test]
    fn nested_ranges_inline_into_enumerations() {
        let spec = NormSpec::Values(vec![
            NormItem::Value(1),
            NormItem::Range {
                min: Some(10),
                max: Some(16),
                step: Some(3),
            },
        ]);
        assert_eq!(spec.clip(0, 59), Domain::Values(vec![1, 10, 13, 16]));
    }

    #[test]
    fn rejects_non_positive_step() {
        let err = Plan::build(&Recurrence::new().with(
            Field::Minute,
            Spec::Range {
                min: None,
                max: None,
                step: Some(0),
            },
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            RecurrenceError::RangeStepMustBePositive { field: Field::Minute, .. }
        ));
    }

    #[test]
    fn rejects_empty_range() {
        let err = Plan::build(&Recurrence::new().with(Field::Hour, Spec::span(20, 5)))
            .unwrap_err();
        assert!(matches!(
            err,
            RecurrenceError::RangeStepMustBePositive { field: Field::Hour, .. }
        ));
    }

    #[test]
    fn rejects_unknown_names() {
        let err = Plan::build(&Recurrence::new().with(Field::DayOfWeek, "someday"))
            .unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidField { .. }));

        let err = Plan::build(&Recurrence::new().with(Field::Hour, "mon")).unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidField { .. }));

        let err = Plan::build(
            &Recurrence::new().with(Field::DayOfWeek, Spec::names(["mon", "noday"])),
        )
        .unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidEnumeration { .. }));
    }

    #[test]
    fn rejects_bad_nested_enumeration() {
        let err = Plan::build(&Recurrence::new().with(
            Field::DayOfWeek,
            Spec::list([Spec::list([Spec::name("noday")])]),
        ))
        .unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidSubField { .. }));
    }

    #[test]
    fn rejects_impossible_enumeration() {
        let err = Plan::build(&Recurrence::new().with(Field::Hour, Spec::values([99])))
            .unwrap_err();
        assert!(matches!(err, RecurrenceError::InvalidEnumeration { .. }));
    }

    #[test]
    fn mask_predicate() {
        // day-of-week (one value) wins the board; day-of-month becomes the
        // mask.
        let p = plan(
            &Recurrence::new()
                .with(Field::DayOfMonth, Spec::span(-7, -1))
                .with(Field::DayOfWeek, "thu"),
        );
        assert!(p.board.contains(&Field::DayOfWeek));
        assert_eq!(p.mask.len(), 1);
        assert_eq!(p.mask[0].0, Field::DayOfMonth);
        // 2021-06-24 is in the last seven days of June.
        assert!(p.satisfies_mask(dt(2021, 6, 24)));
        // 2021-06-17 is not.
        assert!(!p.satisfies_mask(dt(2021, 6, 17)));
        // The mask does not test day-of-week; that is the board's job.
        assert!(p.satisfies_mask(dt(2021, 6, 25)));
    }
}
