//! Normalization contract over generated legacy and current documents
//!
//! Run with: cargo test --package tileboard-ir --test normalize

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use tileboard_ir::{normalize_document, DocumentVersion, Visualization};

fn widget_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["bar", "line", "stat_card", "map", "note", "heatmap"]),
        prop::option::of(prop::sample::select(vec!["count", "price", ""])),
        any::<bool>(),
        prop::option::of((0u32..12, 0u32..20)),
        prop::option::of(prop::sample::select(vec![1u32, 2, 3])),
        prop::option::of(prop::sample::select(vec!["sm", "md", "lg"])),
    )
        .prop_map(|(chart, y_field, has_metric, flat, tile_w, tile_h)| {
            let mut w = Map::new();
            w.insert("id".into(), json!(format!("w-{chart}")));
            w.insert("title".into(), json!(chart));
            w.insert("table".into(), json!("t"));
            w.insert("chartType".into(), json!(chart));
            if let Some(y) = y_field {
                w.insert("yField".into(), json!(y));
            }
            if has_metric {
                w.insert("metrics".into(), json!([{"field": "price", "aggregate": "mean"}]));
            }
            if let Some((x, y)) = flat {
                w.insert("layoutX".into(), json!(x));
                w.insert("layoutY".into(), json!(y));
            }
            if let Some(tw) = tile_w {
                w.insert("tileWidth".into(), json!(tw));
            }
            if let Some(th) = tile_h {
                w.insert("tileHeight".into(), json!(th));
            }
            Value::Object(w)
        })
}

fn document_strategy() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(widget_strategy(), 0..4),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(widgets, enveloped, legacy_filter)| {
            // widget ids only need to be unique for deserialization
            let widgets: Vec<Value> = widgets
                .into_iter()
                .enumerate()
                .map(|(i, mut w)| {
                    w["id"] = json!(format!("w-{i}"));
                    w
                })
                .collect();
            let mut inner = Map::new();
            inner.insert("widgets".into(), Value::Array(widgets));
            if legacy_filter {
                inner.insert(
                    "globalFilter".into(),
                    json!({"table": "t", "dateField": "d", "startDate": "2024-01-01", "endDate": "2024-01-31"}),
                );
            }
            let mut doc = Map::new();
            doc.insert("id".into(), json!("v"));
            doc.insert("name".into(), json!("generated"));
            if enveloped {
                doc.insert("config".into(), Value::Object(inner));
            } else {
                doc.extend(inner);
            }
            Value::Object(doc)
        })
}

proptest! {
    #[test]
    fn normalization_is_idempotent(doc in document_strategy()) {
        let once = normalize_document(doc).unwrap();
        let twice = normalize_document(once.clone()).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(DocumentVersion::detect(&once), DocumentVersion::Current);
    }

    #[test]
    fn normalized_documents_deserialize(doc in document_strategy()) {
        let vis = Visualization::from_document(doc).unwrap();
        for w in &vis.widgets {
            prop_assert!(w.layout.w > 0 && w.layout.h > 0);
        }
        prop_assert!(vis.global_filters.len() <= 1);
    }
}

#[test]
fn test_enveloped_legacy_document_loads() {
    let vis = Visualization::from_document(json!({
        "id": "vis-9",
        "name": "Field season",
        "createdAt": "2023-05-01T12:00:00Z",
        "config": {
            "widgets": [{
                "id": "w-1",
                "title": "Counts by site",
                "table": "t",
                "chartType": "bar",
                "xField": "site",
                "yField": "count",
                "layoutX": 6,
                "layoutY": 2
            }],
            "globalFilter": {
                "table": "t",
                "dateField": "d",
                "startDate": "2024-01-01",
                "endDate": "2024-01-31"
            }
        }
    }))
    .unwrap();

    assert_eq!(vis.widgets.len(), 1);
    let w = &vis.widgets[0];
    assert_eq!(w.metrics.len(), 1);
    assert_eq!(w.metrics[0].field, "count");
    assert_eq!(w.metrics[0].aggregate.as_str(), "sum");
    assert_eq!((w.layout.x, w.layout.y, w.layout.w, w.layout.h), (6, 2, 6, 4));

    assert_eq!(vis.global_filters.len(), 1);
    assert_eq!(vis.global_filters[0].id, "legacy-filter");
    assert_eq!(vis.global_filters[0].field, "d");
    assert_eq!(vis.global_filters[0].end_date.as_deref(), Some("2024-01-31"));
}

#[test]
fn test_unknown_legacy_keys_pass_through() {
    let doc = json!({
        "id": "v",
        "name": "n",
        "theme": "dark",
        "widgets": [],
        "globalFilters": []
    });
    assert_eq!(normalize_document(doc.clone()).unwrap(), doc);
    assert!(Visualization::from_document(doc).is_ok());
}
