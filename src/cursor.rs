//! The cursor engine: the board's field iterators driven as a
//! carry-propagating odometer over local datetimes, with zone resolution
//! and DST gap handling as the final step of every advance.

use std::sync::Arc;

use jiff::civil::DateTime;
use jiff::tz::{AmbiguousOffset, TimeZone};
use jiff::{Timestamp, Zoned};

use crate::error::RecurrenceError;
use crate::expr::{Recurrence, WeekFields};
use crate::fields;
use crate::plan::Plan;
use crate::scalar::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// One field's position on the board: a scalar iterator over the field's
/// clipped domain, tied to a board slot. Advancing it adjusts the field on
/// a local datetime.
#[derive(Debug, Clone)]
struct FieldIter {
    slot: usize,
    scalar: Scalar,
}

impl FieldIter {
    /// Rebuild at `t`: recompute bounds, clip the spec, seed the scalar at
    /// the field's current value.
    fn reset(slot: usize, plan: &Plan, t: DateTime) -> FieldIter {
        let field = plan.board[slot];
        let seed = fields::value(field, t, plan.week_fields);
        FieldIter {
            slot,
            scalar: plan.domain_at(slot, t).seed(seed),
        }
    }

    /// Whether the seed value was on the domain; positions produced by
    /// advancing always are.
    fn aligned(&self) -> bool {
        self.scalar.aligned()
    }

    fn advance(&self, plan: &Plan, t: DateTime, dir: Direction) -> Option<(FieldIter, DateTime)> {
        let scalar = match dir {
            Direction::Forward => self.scalar.next(),
            Direction::Backward => self.scalar.prev(),
        }?;
        self.apply(plan, scalar, t)
    }

    /// Park at the edge of the domain facing the direction of travel.
    fn seed_edge(&self, plan: &Plan, t: DateTime, dir: Direction) -> Option<(FieldIter, DateTime)> {
        let scalar = match dir {
            Direction::Forward => self.scalar.first(),
            Direction::Backward => self.scalar.last(),
        }?;
        self.apply(plan, scalar, t)
    }

    fn apply(&self, plan: &Plan, scalar: Scalar, t: DateTime) -> Option<(FieldIter, DateTime)> {
        let field = plan.board[self.slot];
        let t = fields::adjust(field, scalar.current(), t, plan.week_fields)?;
        Some((
            FieldIter {
                slot: self.slot,
                scalar,
            },
            t,
        ))
    }
}

/// The carry-propagating walk over the board's iterators.
struct Odometer<'a> {
    plan: &'a Plan,
    dir: Direction,
}

impl Odometer<'_> {
    /// Advance the iterator at `slot`; on exhaustion carry into the next
    /// field up, on success reseed everything below. `None` when the carry
    /// runs off the top of the board: there are no more points.
    fn step(&self, slot: usize, its: &mut [FieldIter], t: DateTime) -> Option<DateTime> {
        if slot == its.len() {
            return None;
        }
        match its[slot].advance(self.plan, t, self.dir) {
            Some((it, t)) => {
                its[slot] = it;
                self.reseed_below(slot, its, t)
            }
            None => self.step(slot + 1, its, t),
        }
    }

    fn reseed_below(&self, slot: usize, its: &mut [FieldIter], t: DateTime) -> Option<DateTime> {
        if slot == 0 {
            return Some(t);
        }
        self.reseed(slot - 1, its, t)
    }

    /// Rebuild the iterator at `slot` on the new `t` and park it at the
    /// near edge. A domain empty at this date carries upward.
    fn reseed(&self, slot: usize, its: &mut [FieldIter], t: DateTime) -> Option<DateTime> {
        let fresh = FieldIter::reset(slot, self.plan, t);
        match fresh.seed_edge(self.plan, t, self.dir) {
            Some((it, t)) => {
                its[slot] = it;
                self.reseed_below(slot, its, t)
            }
            None => {
                its[slot] = fresh;
                self.step(slot, its, t)
            }
        }
    }

    /// From the highest field down, give every misaligned iterator one
    /// step; the step itself reseeds all smaller fields.
    fn align(&self, its: &mut [FieldIter], t: DateTime) -> Option<DateTime> {
        let mut t = t;
        for slot in (0..its.len()).rev() {
            if !its[slot].aligned() {
                t = self.step(slot, its, t)?;
            }
        }
        Some(t)
    }
}

/// A local candidate resolved against the zone's rules.
#[derive(Debug)]
enum Resolved {
    Normal(Zoned),
    Gap(GapInfo),
}

#[derive(Debug)]
struct GapInfo {
    /// First valid instant after the gap.
    exit: Zoned,
    exit_civil: DateTime,
    /// Local time one second before the gap opens.
    before_civil: DateTime,
}

/// Resolve a local datetime to an instant. Ambiguous (folded) local times
/// take the earlier offset; local times inside a DST gap report the gap's
/// boundaries instead.
fn resolve(tz: &TimeZone, t: DateTime) -> Option<Resolved> {
    match tz.to_ambiguous_zoned(t).offset() {
        AmbiguousOffset::Unambiguous { offset } | AmbiguousOffset::Fold { before: offset, .. } => {
            let ts = offset.to_timestamp(t).ok()?;
            Some(Resolved::Normal(ts.to_zoned(tz.clone())))
        }
        AmbiguousOffset::Gap { before, .. } => {
            // An in-gap local time interpreted with the pre-gap offset
            // lands at or after the transition instant.
            let inside = before.to_timestamp(t).ok()?;
            let bound = Timestamp::from_second(inside.as_second() + 1).ok()?;
            let transition = tz.preceding(bound).next()?.timestamp();
            let exit = transition.to_zoned(tz.clone());
            let before_ts = Timestamp::from_second(transition.as_second() - 1).ok()?;
            Some(Resolved::Gap(GapInfo {
                exit_civil: exit.datetime(),
                before_civil: before_ts.to_zoned(tz.clone()).datetime(),
                exit,
            }))
        }
    }
}

/// Why a cursor's instant does not satisfy its expression exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misalignment {
    /// The cursor was created at an instant the expression does not match.
    /// The first step in either direction realigns.
    Init,
    /// The instant is the exit of a DST gap that swallowed one or more
    /// scheduled points; it counts as a valid firing.
    Gap,
}

/// A position in the sequence of instants matching a recurrence.
///
/// A cursor is an immutable value: [`next`](Cursor::next) and
/// [`prev`](Cursor::prev) return a new cursor and never mutate. The heavy
/// normalized expression is shared between the cursors stepped from it.
///
/// # Examples
///
/// ```
/// use cadence::{Cursor, Field, Recurrence, Spec};
///
/// let rec = Recurrence::new()
///     .with(Field::Hour, Spec::value(9))
///     .with(Field::DayOfWeek, "mon");
/// let start: jiff::Zoned = "2021-06-16T00:00:00+02:00[Europe/Brussels]".parse().unwrap();
/// let cursor = Cursor::new(&rec, &start).unwrap();
/// let next = cursor.next().unwrap();
/// assert_eq!(next.current().to_string(), "2021-06-21T09:00:00+02:00[Europe/Brussels]");
/// let back = next.prev().unwrap();
/// assert_eq!(back.current().to_string(), "2021-06-14T09:00:00+02:00[Europe/Brussels]");
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    plan: Arc<Plan>,
    iters: Vec<FieldIter>,
    current: Zoned,
    misalignment: Option<Misalignment>,
}

impl Cursor {
    /// Build a cursor positioned at `at`.
    ///
    /// The cursor is valid right away only if `at` satisfies the
    /// expression (or is the exit of a DST gap that swallowed a scheduled
    /// point); otherwise it reports a [`Misalignment`] and the first
    /// `next`/`prev` realigns.
    pub fn new(rec: &Recurrence, at: &Zoned) -> Result<Cursor, RecurrenceError> {
        Ok(Cursor::seeded(Arc::new(Plan::build(rec)?), at))
    }

    pub(crate) fn seeded(plan: Arc<Plan>, at: &Zoned) -> Cursor {
        let civil = at.datetime();
        let iters = (0..plan.board.len())
            .map(|slot| FieldIter::reset(slot, &plan, civil))
            .collect::<Vec<_>>();
        let aligned =
            iters.iter().all(|it| it.aligned()) && plan.satisfies_mask(civil);
        let mut cursor = Cursor {
            plan,
            iters,
            current: at.clone(),
            misalignment: None,
        };
        if !aligned {
            cursor.misalignment = Some(Misalignment::Init);
            if cursor.is_gap_exit_firing() {
                cursor.misalignment = Some(Misalignment::Gap);
            }
        }
        cursor
    }

    /// The cursor's absolute instant.
    pub fn current(&self) -> &Zoned {
        &self.current
    }

    /// `false` only for a freshly created cursor whose instant does not
    /// match the expression. Gap-collapsed firings are valid.
    pub fn is_valid(&self) -> bool {
        !matches!(self.misalignment, Some(Misalignment::Init))
    }

    pub fn misalignment(&self) -> Option<Misalignment> {
        self.misalignment
    }

    pub fn week_fields(&self) -> WeekFields {
        self.plan.week_fields
    }

    /// The locale tag the recurrence was built with, if any.
    pub fn locale(&self) -> Option<&str> {
        self.plan.locale.as_deref()
    }

    /// The next matching instant, strictly after this one. `None` when the
    /// expression has no further points before the end of the supported
    /// year range.
    pub fn next(&self) -> Option<Cursor> {
        self.step(Direction::Forward)
    }

    /// The previous matching instant, strictly before this one.
    pub fn prev(&self) -> Option<Cursor> {
        self.step(Direction::Backward)
    }

    fn step(&self, dir: Direction) -> Option<Cursor> {
        let odo = Odometer {
            plan: &*self.plan,
            dir,
        };
        let tz = self.current.time_zone();
        let mut its = self.iters.clone();
        let mut civil = self.current.datetime();
        let mut realign = self.misalignment.is_some();
        loop {
            civil = if realign {
                realign = false;
                odo.align(&mut its, civil)?
            } else {
                odo.step(0, &mut its, civil)?
            };
            match resolve(tz, civil)? {
                Resolved::Normal(z) => {
                    if self.plan.satisfies_mask(civil) {
                        return Some(self.emit(its, z, None));
                    }
                }
                Resolved::Gap(gap) => {
                    if gap.exit.timestamp() == self.current.timestamp() {
                        // Already standing on the gap's far edge: hop
                        // across and realign from the other side.
                        civil = match dir {
                            Direction::Forward => gap.exit_civil,
                            Direction::Backward => gap.before_civil,
                        };
                        reset_all(&self.plan, &mut its, civil);
                        let all_aligned = its.iter().all(|it| it.aligned());
                        if dir == Direction::Backward
                            && all_aligned
                            && self.plan.satisfies_mask(civil)
                        {
                            // The last scheduled instant before the gap.
                            if let Some(Resolved::Normal(z)) = resolve(tz, civil) {
                                return Some(self.emit(its, z, None));
                            }
                        }
                        realign = !all_aligned;
                    } else {
                        // A point scheduled inside the gap fires once, at
                        // the gap's exit.
                        civil = gap.exit_civil;
                        reset_all(&self.plan, &mut its, civil);
                        if self.plan.satisfies_mask(civil) {
                            let tag = if its.iter().all(|it| it.aligned()) {
                                None
                            } else {
                                Some(Misalignment::Gap)
                            };
                            return Some(self.emit(its, gap.exit, tag));
                        }
                        // Collapse date fails the mask: keep stepping.
                    }
                }
            }
        }
    }

    fn emit(&self, iters: Vec<FieldIter>, z: Zoned, misalignment: Option<Misalignment>) -> Cursor {
        Cursor {
            plan: Arc::clone(&self.plan),
            iters,
            current: z,
            misalignment,
        }
    }

    /// True when `current` sits exactly on the exit of a DST gap and the
    /// expression fired inside the gap: stepping back and forward again
    /// lands exactly here.
    fn is_gap_exit_firing(&self) -> bool {
        let tz = self.current.time_zone();
        let ts = self.current.timestamp();
        let just_before = match Timestamp::from_second(ts.as_second() - 1) {
            Ok(t) => t,
            Err(_) => return false,
        };
        let transition = match tz.following(just_before).next() {
            Some(t) => t,
            None => return false,
        };
        if transition.timestamp() != ts || transition.offset() <= tz.to_offset(just_before) {
            return false;
        }
        let back = match self.step(Direction::Backward) {
            Some(c) => c,
            None => return false,
        };
        match back.step(Direction::Forward) {
            Some(again) => again.current.timestamp() == ts,
            None => false,
        }
    }
}

fn reset_all(plan: &Plan, its: &mut [FieldIter], t: DateTime) {
    for slot in 0..its.len() {
        its[slot] = FieldIter::reset(slot, plan, t);
    }
}
