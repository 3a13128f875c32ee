//! Chart-type suggestion
//!
//! A selection of fields is reduced to a [`KindSignature`], and each signature
//! maps to one fixed, ordered list of chart types. The table below is the whole
//! rule set; nothing else influences the suggestion.

use tileboard_ir::{kind_of, ChartType, ColumnKind, ColumnSchema};

use ChartType::*;

/// Always offered, and the whole answer when nothing is selected.
pub const BASELINE: &[ChartType] = &[Note, StatCard, Table];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindSignature {
    Empty,
    /// One field names a latitude and another a longitude.
    Geo,
    DateAndNumber,
    StringAndNumber,
    /// Numbers only, at least three of them.
    ManyNumbers,
    TwoNumbers,
    OneNumber,
    NoNumbers,
}

const SUGGESTIONS: &[(KindSignature, &[ChartType])] = &[
    (KindSignature::Empty, BASELINE),
    (KindSignature::Geo, &[Map, Note, StatCard, Table]),
    (
        KindSignature::DateAndNumber,
        &[StatCard, Line, Area, StackedArea, Bar, GroupedBar, StackedBar, Histogram, BoxPlot, Note, Table],
    ),
    (
        KindSignature::StringAndNumber,
        &[StatCard, Bar, GroupedBar, StackedBar, Histogram, Violin, Pie, BoxPlot, Sunburst, Radar, Note, Table],
    ),
    (
        KindSignature::ManyNumbers,
        &[
            StatCard, Heatmap, Bubble, Scatter, ScatterMatrix, BoxPlot, Radar, Histogram, Violin, Line, Bar, Note,
            Table,
        ],
    ),
    (
        KindSignature::TwoNumbers,
        &[StatCard, Histogram, Violin, Scatter, Bubble, ScatterMatrix, BoxPlot, Line, Bar, Note, Table],
    ),
    (KindSignature::OneNumber, &[StatCard, Histogram, Violin, BoxPlot, Bar, Note, Table]),
    (KindSignature::NoNumbers, &[StatCard, Note, Table, Bar, GroupedBar, Pie, Sunburst]),
];

fn is_latitude(name: &str) -> bool {
    name.to_lowercase().contains("lat")
}

fn is_longitude(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("lng") || lower.contains("lon")
}

/// True when two different selected fields name a latitude and a longitude.
pub fn has_geo_pair(names: &[&str]) -> bool {
    names.iter().enumerate().any(|(i, lat)| {
        is_latitude(lat)
            && names
                .iter()
                .enumerate()
                .any(|(j, lng)| i != j && is_longitude(lng))
    })
}

impl KindSignature {
    pub fn classify(kinds: &[ColumnKind], names: &[&str]) -> Self {
        if kinds.is_empty() {
            return KindSignature::Empty;
        }
        if has_geo_pair(names) {
            return KindSignature::Geo;
        }
        let has = |k: ColumnKind| kinds.contains(&k);
        let numeric = kinds.iter().filter(|k| **k == ColumnKind::Number).count();
        match (has(ColumnKind::Date), has(ColumnKind::String), numeric) {
            (_, _, 0) => KindSignature::NoNumbers,
            (true, _, _) => KindSignature::DateAndNumber,
            (false, true, _) => KindSignature::StringAndNumber,
            (false, false, n) if n >= 3 => KindSignature::ManyNumbers,
            (false, false, 2) => KindSignature::TwoNumbers,
            _ => KindSignature::OneNumber,
        }
    }

    pub fn charts(&self) -> &'static [ChartType] {
        SUGGESTIONS
            .iter()
            .find(|(sig, _)| sig == self)
            .map_or(BASELINE, |(_, charts)| charts)
    }
}

/// Ordered chart types legal for the selected kinds and field names.
pub fn suggest_types(kinds: &[ColumnKind], names: &[&str]) -> Vec<ChartType> {
    KindSignature::classify(kinds, names).charts().to_vec()
}

/// Resolve kinds from a schema, skipping unknown names, then suggest.
pub fn suggest_for_columns<S: AsRef<str>>(selected: &[S], columns: &[ColumnSchema]) -> Vec<ChartType> {
    let names: Vec<&str> = selected.iter().map(AsRef::as_ref).collect();
    let kinds: Vec<ColumnKind> = names.iter().filter_map(|n| kind_of(columns, n)).collect();
    suggest_types(&kinds, &names)
}
