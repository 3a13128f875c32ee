//! Row filtering for the two filter dialects
//!
//! Global filters fail OPEN: a comparison that cannot be parsed keeps the row.
//! Tile filters fail CLOSED: a comparison that cannot be parsed drops the row.
//! Both reject rows whose field is missing or null. Saved dashboards depend on
//! this asymmetry, so the two evaluators share no comparison code.

use chrono::{NaiveDateTime, NaiveTime};
use tileboard_ir::{
    parse_number, parse_timestamp, GlobalFilter, GlobalFilterOperator, Row, TileFilter,
    TileFilterOperator, Widget,
};

/// Global filters scoped to one table.
pub struct GlobalFilterEvaluator<'a> {
    scoped: Vec<&'a GlobalFilter>,
}

impl<'a> GlobalFilterEvaluator<'a> {
    /// Keep the filters scoped to `table`; filters with an empty field are inert.
    pub fn new(filters: &'a [GlobalFilter], table: &str) -> Self {
        Self {
            scoped: filters.iter().filter(|f| f.applies_to(table)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scoped.is_empty()
    }

    pub fn accepts(&self, row: &Row) -> bool {
        self.scoped.iter().all(|f| Self::evaluate(f, row))
    }

    pub fn filter<'r, I>(&self, rows: I) -> Vec<&'r Row>
    where
        I: IntoIterator<Item = &'r Row>,
    {
        rows.into_iter().filter(|r| self.accepts(r)).collect()
    }

    pub fn evaluate(filter: &GlobalFilter, row: &Row) -> bool {
        let Some(text) = row.cell(&filter.field).text() else {
            return false;
        };
        let value = filter.value.as_deref().unwrap_or("");

        match filter.operator {
            GlobalFilterOperator::Eq => text.to_lowercase() == value.to_lowercase(),
            GlobalFilterOperator::Contains => text.to_lowercase().contains(&value.to_lowercase()),
            GlobalFilterOperator::Gte => compare_open(&text, value).map_or(true, |o| o.is_ge()),
            GlobalFilterOperator::Lte => compare_open(&text, value).map_or(true, |o| o.is_le()),
            GlobalFilterOperator::Between => between_open(filter, &text),
        }
    }
}

/// Numeric comparison first, then dates. `None` when neither side pair parses.
fn compare_open(text: &str, bound: &str) -> Option<std::cmp::Ordering> {
    if let (Some(n), Some(b)) = (parse_number(text), parse_number(bound)) {
        return n.partial_cmp(&b);
    }
    match (parse_timestamp(text), parse_timestamp(bound)) {
        (Some(t), Some(b)) => Some(t.cmp(&b)),
        _ => None,
    }
}

fn end_of_day(t: NaiveDateTime) -> NaiveDateTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).map_or(t, |eod| t.date().and_time(eod))
}

fn between_open(filter: &GlobalFilter, text: &str) -> bool {
    let start_value = filter.start_value.as_deref().and_then(parse_number);
    let end_value = filter.end_value.as_deref().and_then(parse_number);
    if start_value.is_some() || end_value.is_some() {
        if let Some(n) = parse_number(text) {
            return start_value.map_or(true, |lo| n >= lo) && end_value.map_or(true, |hi| n <= hi);
        }
    }

    let Some(t) = parse_timestamp(text) else {
        return true;
    };
    if let Some(start) = filter.start_date.as_deref().and_then(parse_timestamp) {
        if t < start {
            return false;
        }
    }
    if let Some(end) = filter.end_date.as_deref().and_then(parse_timestamp) {
        if t > end_of_day(end) {
            return false;
        }
    }
    true
}

/// Active filters of one tile.
pub struct TileFilterEvaluator<'a> {
    active: Vec<&'a TileFilter>,
}

impl<'a> TileFilterEvaluator<'a> {
    pub fn new(filters: &'a [TileFilter]) -> Self {
        Self {
            active: filters.iter().filter(|f| f.is_active()).collect(),
        }
    }

    pub fn for_widget(widget: &'a Widget) -> Self {
        Self {
            active: widget.active_filters().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn accepts(&self, row: &Row) -> bool {
        self.active.iter().all(|f| Self::evaluate(f, row))
    }

    pub fn filter<'r, I>(&self, rows: I) -> Vec<&'r Row>
    where
        I: IntoIterator<Item = &'r Row>,
    {
        rows.into_iter().filter(|r| self.accepts(r)).collect()
    }

    pub fn evaluate(filter: &TileFilter, row: &Row) -> bool {
        let Some(text) = row.cell(&filter.field).text() else {
            return false;
        };
        let text = text.as_ref();
        let value = filter.value.as_deref().unwrap_or("");
        let values = filter.values.as_deref().unwrap_or(&[]);

        match filter.operator {
            TileFilterOperator::Eq => text == value,
            TileFilterOperator::Neq => text != value,
            TileFilterOperator::Contains => text.to_lowercase().contains(&value.to_lowercase()),
            TileFilterOperator::NotContains => !text.to_lowercase().contains(&value.to_lowercase()),
            TileFilterOperator::In => values.iter().any(|v| v == text),
            TileFilterOperator::NotIn => !values.iter().any(|v| v == text),
            TileFilterOperator::Gt => numbers_closed(text, value).is_some_and(|(n, c)| n > c),
            TileFilterOperator::Lt => numbers_closed(text, value).is_some_and(|(n, c)| n < c),
            TileFilterOperator::Gte => numbers_closed(text, value).is_some_and(|(n, c)| n >= c),
            TileFilterOperator::Lte => numbers_closed(text, value).is_some_and(|(n, c)| n <= c),
            TileFilterOperator::Between => {
                parse_number(text).is_some_and(|n| within_closed(n, filter, parse_number))
            }
            TileFilterOperator::Before => dates_closed(text, value).is_some_and(|(d, c)| d < c),
            TileFilterOperator::After => dates_closed(text, value).is_some_and(|(d, c)| d > c),
            TileFilterOperator::DateBetween => {
                parse_timestamp(text).is_some_and(|d| within_closed(d, filter, parse_timestamp))
            }
        }
    }
}

fn numbers_closed(text: &str, bound: &str) -> Option<(f64, f64)> {
    Some((parse_number(text)?, parse_number(bound)?))
}

fn dates_closed(text: &str, bound: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    Some((parse_timestamp(text)?, parse_timestamp(bound)?))
}

/// Blank bounds leave their side open; a bound that does not parse rejects.
fn within_closed<T: PartialOrd>(v: T, filter: &TileFilter, parse: fn(&str) -> Option<T>) -> bool {
    let bound = |b: Option<&str>| -> Result<Option<T>, ()> {
        match b.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => parse(s).map(Some).ok_or(()),
        }
    };
    match (bound(filter.min.as_deref()), bound(filter.max.as_deref())) {
        (Ok(lo), Ok(hi)) => {
            lo.as_ref().map_or(true, |lo| v >= *lo) && hi.as_ref().map_or(true, |hi| v <= *hi)
        }
        _ => false,
    }
}

/// Rows of `table` that pass every global filter scoped to it.
pub fn apply_global_filters<'r>(
    rows: &'r [Row],
    table: &str,
    filters: &[GlobalFilter],
) -> Vec<&'r Row> {
    GlobalFilterEvaluator::new(filters, table).filter(rows)
}

/// Rows that pass every active tile filter.
pub fn apply_tile_filters<'r>(rows: &'r [Row], filters: &[TileFilter]) -> Vec<&'r Row> {
    TileFilterEvaluator::new(filters).filter(rows)
}
