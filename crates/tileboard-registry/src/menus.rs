//! Aggregate and tile-filter operator menus offered per column kind

use tileboard_ir::{AggregateMethod, ColumnKind, TileFilterOperator};

const NUMBER_AGGREGATES: &[AggregateMethod] = &[
    AggregateMethod::Count,
    AggregateMethod::Sum,
    AggregateMethod::Mean,
    AggregateMethod::Avg,
    AggregateMethod::Min,
    AggregateMethod::Max,
    AggregateMethod::Median,
    AggregateMethod::Mode,
    AggregateMethod::Distinct,
];

const DATE_AGGREGATES: &[AggregateMethod] = &[
    AggregateMethod::Count,
    AggregateMethod::Min,
    AggregateMethod::Max,
    AggregateMethod::Mode,
    AggregateMethod::Distinct,
];

const CATEGORICAL_AGGREGATES: &[AggregateMethod] =
    &[AggregateMethod::Count, AggregateMethod::Mode, AggregateMethod::Distinct];

pub fn aggregates_for_kind(kind: ColumnKind) -> &'static [AggregateMethod] {
    match kind {
        ColumnKind::Number => NUMBER_AGGREGATES,
        ColumnKind::Date => DATE_AGGREGATES,
        ColumnKind::Boolean | ColumnKind::String => CATEGORICAL_AGGREGATES,
    }
}

/// Stat-card default when a variable has no explicit aggregate.
pub fn default_aggregate_for_kind(kind: ColumnKind) -> AggregateMethod {
    match kind {
        ColumnKind::Number => AggregateMethod::Mean,
        _ => AggregateMethod::Distinct,
    }
}

/// Metric default when a variable is promoted to a series.
pub fn metric_aggregate_for_kind(kind: ColumnKind) -> AggregateMethod {
    match kind {
        ColumnKind::Number => AggregateMethod::Sum,
        _ => AggregateMethod::Count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorOption {
    pub operator: TileFilterOperator,
    pub label: &'static str,
}

const fn op(operator: TileFilterOperator, label: &'static str) -> OperatorOption {
    OperatorOption { operator, label }
}

const QUANTITATIVE_OPS: &[OperatorOption] = &[
    op(TileFilterOperator::Eq, "="),
    op(TileFilterOperator::Neq, "≠"),
    op(TileFilterOperator::Gt, ">"),
    op(TileFilterOperator::Lt, "<"),
    op(TileFilterOperator::Gte, "≥"),
    op(TileFilterOperator::Lte, "≤"),
    op(TileFilterOperator::Between, "between"),
];

const DATE_OPS: &[OperatorOption] = &[
    op(TileFilterOperator::Eq, "equals"),
    op(TileFilterOperator::Before, "before"),
    op(TileFilterOperator::After, "after"),
    op(TileFilterOperator::DateBetween, "between"),
];

const BOOLEAN_OPS: &[OperatorOption] = &[
    op(TileFilterOperator::Eq, "equals"),
    op(TileFilterOperator::Neq, "not equals"),
];

const CATEGORICAL_OPS: &[OperatorOption] = &[
    op(TileFilterOperator::Eq, "equals"),
    op(TileFilterOperator::Neq, "not equals"),
    op(TileFilterOperator::In, "is one of"),
    op(TileFilterOperator::NotIn, "is not one of"),
    op(TileFilterOperator::Contains, "contains"),
    op(TileFilterOperator::NotContains, "does not contain"),
];

pub fn operators_for_kind(kind: ColumnKind) -> &'static [OperatorOption] {
    match kind {
        ColumnKind::Number => QUANTITATIVE_OPS,
        ColumnKind::Date => DATE_OPS,
        ColumnKind::Boolean => BOOLEAN_OPS,
        ColumnKind::String => CATEGORICAL_OPS,
    }
}

pub fn default_operator_for_kind(kind: ColumnKind) -> TileFilterOperator {
    match kind {
        ColumnKind::Number => TileFilterOperator::Gte,
        ColumnKind::Date => TileFilterOperator::After,
        _ => TileFilterOperator::Eq,
    }
}
