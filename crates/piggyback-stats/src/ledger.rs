//! Column statistics ledger
//!
//! One [`ColumnStatistic`] per result position. Fields are filled either by
//! observing tuple values or by facts derived from filter predicates. A field
//! that is [`Tracked::Final`] is never touched by observation again.

use crate::exhausted;
use piggyback_common::{ColumnDescriptor, Result, Scalar, TableId, ValueKind};
use piggyback_containers::{hash_int, hash_str, HashSet64};

/// State of one ledger field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tracked<T> {
    #[default]
    Unknown,
    /// Best value seen so far; observation may still change it
    Provisional(T),
    /// Certain for the rest of this execution
    Final(T),
}

impl<T> Tracked<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Tracked::Unknown => None,
            Tracked::Provisional(v) | Tracked::Final(v) => Some(v),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Tracked::Final(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Tracked::Unknown)
    }
}

/// One observed, non-null value
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    Int(i64),
    /// Canonical text form of a decimal or text value
    Canonical(&'a str),
}

/// What an observation changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOutcome {
    /// A value new to the column's distinct set was inserted
    pub inserted: bool,
    /// The distinct count became final with this observation
    pub distinct_finalized: bool,
}

/// Statistics of one result column
#[derive(Debug, Clone)]
pub struct ColumnStatistic {
    pub descriptor: ColumnDescriptor,
    pub distinct: Tracked<u64>,
    pub min: Tracked<Scalar>,
    pub max: Tracked<Scalar>,
    /// Only ever set by an equality fact
    pub most_frequent: Option<Scalar>,
    /// Upper bound on the distinct values still to be seen
    distinct_ceiling: Option<u64>,
    observed: Option<HashSet64>,
}

impl ColumnStatistic {
    fn new(descriptor: ColumnDescriptor) -> Self {
        Self {
            descriptor,
            distinct: Tracked::Unknown,
            min: Tracked::Unknown,
            max: Tracked::Unknown,
            most_frequent: None,
            distinct_ceiling: None,
            observed: None,
        }
    }

    /// Distinct count, min and max are all final
    pub fn is_settled(&self) -> bool {
        self.distinct.is_final() && self.min.is_final() && self.max.is_final()
    }

    pub fn distinct_ceiling(&self) -> Option<u64> {
        self.distinct_ceiling
    }

    /// Number of values held in the distinct-value set
    pub fn observed_len(&self) -> usize {
        self.observed.as_ref().map_or(0, HashSet64::len)
    }

    fn reset(&mut self) {
        if let Tracked::Final(count) = self.distinct {
            self.distinct_ceiling = Some(count);
        }
        self.distinct = Tracked::Unknown;
        self.min = Tracked::Unknown;
        self.max = Tracked::Unknown;
        self.most_frequent = None;
        self.observed = None;
    }
}

/// Per-position column statistics of one result set
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    columns: Vec<Option<ColumnStatistic>>,
}

impl Ledger {
    pub fn new(column_count: usize) -> Self {
        Self {
            columns: vec![None; column_count],
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Register the column at `descriptor.position`. Registering an already
    /// registered position does nothing.
    pub fn register_column(&mut self, descriptor: &ColumnDescriptor) -> bool {
        match self.columns.get_mut(descriptor.position) {
            Some(slot @ None) => {
                *slot = Some(ColumnStatistic::new(descriptor.clone()));
                true
            }
            Some(Some(_)) => false,
            None => {
                tracing::warn!(
                    "Column '{}' has position {} beyond {} result columns",
                    descriptor.name,
                    descriptor.position,
                    self.columns.len()
                );
                false
            }
        }
    }

    pub fn get(&self, position: usize) -> Option<&ColumnStatistic> {
        self.columns.get(position).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, position: usize) -> Option<&mut ColumnStatistic> {
        self.columns.get_mut(position).and_then(Option::as_mut)
    }

    /// Registered columns in result order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnStatistic> {
        self.columns.iter().flatten()
    }

    pub fn is_settled(&self, position: usize) -> bool {
        self.get(position).is_some_and(ColumnStatistic::is_settled)
    }

    /// Final distinct count per position, `None` where not final
    pub fn final_distinct_counts(&self) -> Vec<Option<u64>> {
        self.columns
            .iter()
            .map(|c| match c.as_ref().map(|c| &c.distinct) {
                Some(Tracked::Final(count)) => Some(*count),
                _ => None,
            })
            .collect()
    }

    /// Feed one observed value of the column at `position`.
    pub fn observe(
        &mut self,
        position: usize,
        value: Observation<'_>,
        initial_set_bits: u32,
    ) -> Result<ObserveOutcome> {
        let mut outcome = ObserveOutcome::default();
        let Some(stat) = self.get_mut(position) else {
            tracing::warn!("Observed a value for unregistered column {}", position);
            return Ok(outcome);
        };

        if !stat.distinct.is_final() {
            if stat.observed.is_none() {
                stat.observed = Some(HashSet64::with_bits(initial_set_bits).map_err(exhausted)?);
            }
            let Some(set) = stat.observed.as_mut() else {
                return Ok(outcome);
            };
            let key = match value {
                Observation::Int(v) => hash_int(v),
                Observation::Canonical(s) => hash_str(s),
            };
            outcome.inserted = set.add(key).map_err(exhausted)?;

            let count = set.len() as u64;
            match stat.distinct_ceiling {
                Some(ceiling) if count >= ceiling => {
                    stat.distinct = Tracked::Final(count);
                    stat.observed = None;
                    outcome.distinct_finalized = true;
                    tracing::debug!(
                        "Distinct count of '{}' reached its ceiling {}",
                        stat.descriptor.name,
                        ceiling
                    );
                }
                _ => stat.distinct = Tracked::Provisional(count),
            }
        }

        if let (Observation::Int(v), ValueKind::Integer) = (value, stat.descriptor.kind) {
            let lower = match stat.min.value() {
                Some(Scalar::Int(min)) => v < *min,
                _ => stat.min.is_unknown(),
            };
            if lower && !stat.min.is_final() {
                stat.min = Tracked::Provisional(Scalar::Int(v));
            }
            let higher = match stat.max.value() {
                Some(Scalar::Int(max)) => v > *max,
                _ => stat.max.is_unknown(),
            };
            if higher && !stat.max.is_final() {
                stat.max = Tracked::Provisional(Scalar::Int(v));
            }
        }

        Ok(outcome)
    }

    /// An equality filter pins the column to a single value.
    pub fn apply_equality_fact(&mut self, descriptor: &ColumnDescriptor, constant: Scalar) {
        self.register_column(descriptor);
        let Some(stat) = self.get_mut(descriptor.position) else {
            return;
        };
        stat.distinct = Tracked::Final(1);
        stat.min = Tracked::Final(constant.clone());
        stat.max = Tracked::Final(constant.clone());
        stat.most_frequent = Some(constant);
        stat.observed = None;
    }

    /// A range filter fixes one bound. Exclusive integer bounds are moved
    /// one step inwards.
    pub fn apply_range_fact(
        &mut self,
        descriptor: &ColumnDescriptor,
        constant: Scalar,
        lower_bound: bool,
        inclusive: bool,
    ) {
        let integer_column = descriptor.kind == ValueKind::Integer;
        let bound = match (constant, inclusive, lower_bound) {
            (Scalar::Int(v), false, true) if integer_column => v.checked_add(1).map(Scalar::Int),
            (Scalar::Int(v), false, false) if integer_column => v.checked_sub(1).map(Scalar::Int),
            (constant, _, _) => Some(constant),
        };
        let Some(bound) = bound else {
            tracing::debug!("Range bound on '{}' overflows, ignored", descriptor.name);
            return;
        };

        self.register_column(descriptor);
        let Some(stat) = self.get_mut(descriptor.position) else {
            return;
        };
        if lower_bound {
            stat.min = Tracked::Final(bound);
        } else {
            stat.max = Tracked::Final(bound);
        }
    }

    /// Forget everything known about the columns of `table`. A final distinct
    /// count is kept as the ceiling for later observation. Returns the number
    /// of columns reset.
    pub fn invalidate(&mut self, table: TableId) -> usize {
        let mut reset = 0;
        for stat in self.columns.iter_mut().flatten() {
            if stat.descriptor.table == Some(table) {
                stat.reset();
                reset += 1;
            }
        }
        reset
    }

    /// Like [`Ledger::invalidate`], but also drops the ceilings. Used when the
    /// table is scanned under a new filter.
    pub fn reset(&mut self, table: TableId) -> usize {
        let reset = self.invalidate(table);
        for stat in self.columns.iter_mut().flatten() {
            if stat.descriptor.table == Some(table) {
                stat.distinct_ceiling = None;
            }
        }
        reset
    }

    /// Drop all value containers
    pub fn release(&mut self) {
        for stat in self.columns.iter_mut().flatten() {
            stat.observed = None;
        }
    }
}
