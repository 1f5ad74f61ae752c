//! Bidirectional iterators over integer domains: arithmetic progressions
//! and sorted enumerations. Calendar-agnostic; every advance returns a new
//! value.

/// An iterator position inside an arithmetic progression
/// `min, min+step, …, max`.
///
/// `current` lies outside the progression only right after seeding at an
/// arbitrary value; `seed_aligned` records whether the seed was on the
/// grid. After any advance the position is on the grid and `seed_aligned`
/// is `None` ("unknown", treated as aligned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeIter {
    min: i32,
    max: i32,
    step: i32,
    current: i32,
    prev: Option<i32>,
    next: Option<i32>,
    seed_aligned: Option<bool>,
}

impl RangeIter {
    /// Seed at `v`, which may lie anywhere relative to the domain.
    pub fn seed(min: i32, max: i32, step: i32, v: i32) -> RangeIter {
        // Highest value on the grid.
        let max = if max >= min {
            max - (max - min).rem_euclid(step)
        } else {
            max
        };
        let (prev, next, aligned) = if min > max {
            (None, None, false)
        } else if v < min {
            (None, Some(min), false)
        } else if v > max {
            (Some(max), None, false)
        } else {
            let p = v - (v - min).rem_euclid(step);
            let aligned = p == v;
            let prev = if aligned {
                (p - step >= min).then(|| p - step)
            } else {
                Some(p)
            };
            let next = (p + step <= max).then(|| p + step);
            (prev, next, aligned)
        };
        RangeIter {
            min,
            max,
            step,
            current: v,
            prev,
            next,
            seed_aligned: Some(aligned),
        }
    }

    /// The lowest position of the domain, if the domain is non-empty.
    pub fn first(&self) -> Option<RangeIter> {
        (self.min <= self.max).then(|| self.at(self.min))
    }

    /// The highest position of the domain, if the domain is non-empty.
    pub fn last(&self) -> Option<RangeIter> {
        (self.min <= self.max).then(|| self.at(self.max))
    }

    pub fn next(&self) -> Option<RangeIter> {
        self.next.map(|n| self.at(n))
    }

    pub fn prev(&self) -> Option<RangeIter> {
        self.prev.map(|p| self.at(p))
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn seed_aligned(&self) -> Option<bool> {
        self.seed_aligned
    }

    /// Position at an on-grid value `v`.
    fn at(&self, v: i32) -> RangeIter {
        RangeIter {
            current: v,
            prev: (v - self.step >= self.min).then(|| v - self.step),
            next: (v + self.step <= self.max).then(|| v + self.step),
            seed_aligned: None,
            ..*self
        }
    }
}

/// An iterator position inside a sorted set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumIter {
    values: Vec<i32>,
    current: i32,
    prev: Option<i32>,
    next: Option<i32>,
    seed_aligned: Option<bool>,
}

impl EnumIter {
    /// Seed at `v`. `values` must be sorted and deduplicated.
    pub fn seed(values: Vec<i32>, v: i32) -> EnumIter {
        let (prev, next, aligned) = match values.binary_search(&v) {
            Ok(i) => (
                i.checked_sub(1).map(|j| values[j]),
                values.get(i + 1).copied(),
                true,
            ),
            Err(i) => (
                i.checked_sub(1).map(|j| values[j]),
                values.get(i).copied(),
                false,
            ),
        };
        EnumIter {
            values,
            current: v,
            prev,
            next,
            seed_aligned: Some(aligned),
        }
    }

    pub fn first(&self) -> Option<EnumIter> {
        let v = *self.values.first()?;
        Some(self.at(v))
    }

    pub fn last(&self) -> Option<EnumIter> {
        let v = *self.values.last()?;
        Some(self.at(v))
    }

    pub fn next(&self) -> Option<EnumIter> {
        self.next.map(|n| self.at(n))
    }

    pub fn prev(&self) -> Option<EnumIter> {
        self.prev.map(|p| self.at(p))
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn seed_aligned(&self) -> Option<bool> {
        self.seed_aligned
    }

    /// Position at a member value `v`.
    fn at(&self, v: i32) -> EnumIter {
        // `v` always comes from the set itself.
        let i = match self.values.binary_search(&v) {
            Ok(i) => i,
            Err(i) => i,
        };
        EnumIter {
            values: self.values.clone(),
            current: v,
            prev: i.checked_sub(1).map(|j| self.values[j]),
            next: self.values.get(i + 1).copied(),
            seed_aligned: None,
        }
    }
}

/// Either scalar iterator variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Range(RangeIter),
    Enum(EnumIter),
}

impl Scalar {
    pub fn current(&self) -> i32 {
        match self {
            Self::Range(r) => r.current(),
            Self::Enum(e) => e.current(),
        }
    }

    /// Whether the seed position was on the domain. `None` after any
    /// advance, which counts as aligned.
    pub fn aligned(&self) -> bool {
        let seed = match self {
            Self::Range(r) => r.seed_aligned(),
            Self::Enum(e) => e.seed_aligned(),
        };
        seed != Some(false)
    }

    pub fn first(&self) -> Option<Scalar> {
        match self {
            Self::Range(r) => r.first().map(Self::Range),
            Self::Enum(e) => e.first().map(Self::Enum),
        }
    }

    pub fn last(&self) -> Option<Scalar> {
        match self {
            Self::Range(r) => r.last().map(Self::Range),
            Self::Enum(e) => e.last().map(Self::Enum),
        }
    }

    pub fn next(&self) -> Option<Scalar> {
        match self {
            Self::Range(r) => r.next().map(Self::Range),
            Self::Enum(e) => e.next().map(Self::Enum),
        }
    }

    pub fn prev(&self) -> Option<Scalar> {
        match self {
            Self::Range(r) => r.prev().map(Self::Range),
            Self::Enum(e) => e.prev().map(Self::Enum),
        }
    }
}
