//! Aggregation of grouped values
//!
//! The numeric path reduces finite numbers to one number. The general path
//! reduces arbitrary cells to a display string and is used for stat cards and
//! non-numeric fields. Neither path errors: an empty group yields `0` or `"—"`.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tileboard_ir::{format_number, AggregateMethod, Cell};

/// Display value of an empty general aggregation.
pub const EMPTY_DISPLAY: &str = "—";

/// Distinct values shown before the remainder is summarized.
pub const DISTINCT_DISPLAY_LIMIT: usize = 30;

/// Map key for value equality; `-0.0` and `0.0` are the same value.
fn number_key(v: f64) -> u64 {
    (v + 0.0).to_bits()
}

/// Reduce numbers to one number. Non-finite inputs are ignored; empty input is 0.
pub fn aggregate(values: &[f64], method: AggregateMethod) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return 0.0;
    }

    match method.normalized() {
        AggregateMethod::Raw => finite[0],
        AggregateMethod::Count => finite.len() as f64,
        AggregateMethod::Sum => finite.iter().sum(),
        AggregateMethod::Min => finite.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateMethod::Max => finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateMethod::Mean | AggregateMethod::Avg => {
            finite.iter().sum::<f64>() / finite.len() as f64
        }
        AggregateMethod::Median => median(finite),
        AggregateMethod::Mode => mode_by(&finite, |v| number_key(*v)),
        AggregateMethod::Distinct => {
            finite.iter().map(|v| number_key(*v)).collect::<HashSet<_>>().len() as f64
        }
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Most frequent value. Ties go to the value seen first in a left-to-right scan.
fn mode_by<T: Clone, K: Eq + std::hash::Hash>(values: &[T], key: impl Fn(&T) -> K) -> T {
    let mut counts: HashMap<K, usize> = HashMap::new();
    let mut order: Vec<(K, &T)> = Vec::new();
    for v in values {
        let k = key(v);
        let count = counts.entry(key(v)).or_insert(0);
        if *count == 0 {
            order.push((k, v));
        }
        *count += 1;
    }

    let mut winner = &values[0];
    let mut best = 0;
    for (k, v) in &order {
        let count = counts.get(k).copied().unwrap_or(0);
        if count > best {
            winner = v;
            best = count;
        }
    }
    winner.clone()
}

/// Shown and truncated parts of a distinct-values listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinctValues {
    pub shown: Vec<String>,
    pub remaining: usize,
}

impl fmt::Display for DistinctValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shown.join(", "))?;
        if self.remaining > 0 {
            write!(f, " (+{} more)", self.remaining)?;
        }
        Ok(())
    }
}

fn defined_texts(cells: &[Cell<'_>]) -> Vec<String> {
    cells
        .iter()
        .filter(|c| !c.is_blank())
        .filter_map(|c| c.text().map(|t| t.into_owned()))
        .collect()
}

/// Sorted unique display values of the non-blank cells, capped for display.
pub fn distinct_values(cells: &[Cell<'_>]) -> DistinctValues {
    let unique: BTreeSet<String> = defined_texts(cells).into_iter().collect();
    let remaining = unique.len().saturating_sub(DISTINCT_DISPLAY_LIMIT);
    DistinctValues {
        shown: unique.into_iter().take(DISTINCT_DISPLAY_LIMIT).collect(),
        remaining,
    }
}

/// Reduce cells to a display string.
pub fn aggregate_general(cells: &[Cell<'_>], method: AggregateMethod) -> String {
    let defined: Vec<&Cell<'_>> = cells.iter().filter(|c| !c.is_blank()).collect();
    if defined.is_empty() {
        return EMPTY_DISPLAY.to_string();
    }

    match method.normalized() {
        AggregateMethod::Count => defined.len().to_string(),
        AggregateMethod::Distinct => distinct_values(cells).to_string(),
        AggregateMethod::Mode => {
            let texts = defined_texts(cells);
            mode_by(&texts, |t| t.clone())
        }
        other => {
            let nums: Vec<f64> = defined.iter().filter_map(|c| c.number()).collect();
            if nums.is_empty() {
                EMPTY_DISPLAY.to_string()
            } else {
                format_number(aggregate(&nums, other))
            }
        }
    }
}

/// Series value of one group for a chart point.
///
/// `count` and `distinct` look at every non-blank cell, `raw` takes the first
/// row as-is, and the remaining methods use the cells that hold numbers.
pub fn aggregate_cells(cells: &[Cell<'_>], method: AggregateMethod) -> f64 {
    match method.normalized() {
        AggregateMethod::Count => cells.iter().filter(|c| !c.is_blank()).count() as f64,
        AggregateMethod::Distinct => {
            defined_texts(cells).into_iter().collect::<HashSet<_>>().len() as f64
        }
        AggregateMethod::Raw => cells.first().and_then(Cell::number).unwrap_or(0.0),
        other => {
            let nums: Vec<f64> = cells.iter().filter_map(Cell::number).collect();
            aggregate(&nums, other)
        }
    }
}
