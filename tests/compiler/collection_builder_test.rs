//! Tests for the collection statement builder.

#[path = "../common/mod.rs"]
mod common;

use common::{actors, genre, schema, seeded_store, studio, title, INCEPTION, INTERSTELLAR};
use insta::assert_snapshot;
use mediaql::compiler::{
    AliasKey, AliasNamespace, AttributeRefs, CollectionMode, CollectionStatementBuilder,
    CompiledPredicate, CompilerOptions,
};
use mediaql::error::QueryError;
use mediaql::model::{Filter, Value};
use mediaql::schema::{AspectId, Cardinality};
use mediaql::store::SqlStore;

#[test]
fn test_one_to_many_correlated() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&genre()).unwrap());
    let predicate = CompiledPredicate::empty();

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build(CollectionMode::Correlated)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT T0.ITEM_ID A0, T0.VALUE A1 FROM GENRE_VALUES T0 ORDER BY T0.ITEM_ID, T0.VALUE_ORDER");
    assert_eq!(stmt.item_id_alias.as_deref(), Some("A0"));
    assert_eq!(stmt.value_alias, "A1");
    assert_eq!(stmt.attribute, attr);
}

#[test]
fn test_many_to_many_correlated() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&actors()).unwrap());
    let predicate = CompiledPredicate::empty();

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build(CollectionMode::Correlated)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT T0.ITEM_ID A0, T1.VALUE A1 FROM NM_VIDEO_ACTORS T0 INNER JOIN V_VIDEO_ACTORS T1 ON T1.VALUE_ID = T0.VALUE_ID ORDER BY T0.ITEM_ID, T0.VALUE_ORDER");
}

#[test]
fn test_necessary_aspects_and_filter_are_joined() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&genre()).unwrap());
    let predicate = CompiledPredicate::compile(
        Some(&Filter::like(title(), "Incep%")),
        &schema,
        &mut refs,
        &CompilerOptions::default(),
    )
    .unwrap();
    let necessary = [AspectId::from("video")];

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .necessary(&necessary)
        .build(CollectionMode::Correlated)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT T0.ITEM_ID A0, T0.VALUE A1 FROM GENRE_VALUES T0 INNER JOIN M_VIDEO T1 ON T1.ITEM_ID = T0.ITEM_ID WHERE T1.TITLE LIKE ? ORDER BY T0.ITEM_ID, T0.VALUE_ORDER");
    assert_eq!(stmt.params, vec![Value::from("Incep%")]);

    let mut store = seeded_store();
    let mut tx = store.begin().unwrap();
    let rows = tx.query(&stmt.sql, &stmt.params).unwrap();
    let pairs: Vec<(String, String)> = rows
        .iter()
        .map(|row| {
            (
                row.get("A0").and_then(Value::as_text).unwrap().to_string(),
                row.get("A1").and_then(Value::as_text).unwrap().to_string(),
            )
        })
        .collect();
    // Stored order, not alphabetical.
    assert_eq!(
        pairs,
        vec![
            (INCEPTION.to_string(), "Sci-Fi".to_string()),
            (INCEPTION.to_string(), "Thriller".to_string()),
        ]
    );
}

#[test]
fn test_filter_only_attributes_are_left_outer_joined() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&actors()).unwrap());
    let predicate = CompiledPredicate::compile(
        Some(&Filter::eq(studio(), "Paramount")),
        &schema,
        &mut refs,
        &CompilerOptions::default(),
    )
    .unwrap();

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build(CollectionMode::Correlated)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT T0.ITEM_ID A0, T1.VALUE A1 FROM NM_VIDEO_ACTORS T0 INNER JOIN V_VIDEO_ACTORS T1 ON T1.VALUE_ID = T0.VALUE_ID LEFT OUTER JOIN M_VIDEO T2 ON T2.ITEM_ID = T0.ITEM_ID LEFT OUTER JOIN V_VIDEO_STUDIO T3 ON T3.VALUE_ID = T2.STUDIO WHERE T3.VALUE = ? ORDER BY T0.ITEM_ID, T0.VALUE_ORDER");

    let mut store = seeded_store();
    let mut tx = store.begin().unwrap();
    let rows = tx.query(&stmt.sql, &stmt.params).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("A0"),
        Some(&Value::Text(INTERSTELLAR.to_string()))
    );
    assert_eq!(rows[0].get("A1"), Some(&Value::from("McConaughey")));
}

#[test]
fn test_collection_filter_correlates_with_collection_table() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&actors()).unwrap());
    let predicate = CompiledPredicate::compile(
        Some(&Filter::eq(genre(), "Thriller")),
        &schema,
        &mut refs,
        &CompilerOptions::default(),
    )
    .unwrap();

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build(CollectionMode::Distinct)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT DISTINCT T1.VALUE A0 FROM NM_VIDEO_ACTORS T0 INNER JOIN V_VIDEO_ACTORS T1 ON T1.VALUE_ID = T0.VALUE_ID WHERE EXISTS(SELECT VAL.ITEM_ID FROM GENRE_VALUES VAL WHERE VAL.ITEM_ID = T0.ITEM_ID AND VAL.VALUE = ?) ORDER BY T1.VALUE");
    assert!(stmt.item_id_alias.is_none());
}

#[test]
fn test_grouped_counts_items_per_value() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&genre()).unwrap());
    let predicate = CompiledPredicate::empty();

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build(CollectionMode::Grouped)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT COUNT(T1.A0) A2, T1.A1 A1 FROM (SELECT DISTINCT T0.ITEM_ID A0, T0.VALUE A1 FROM GENRE_VALUES T0) T1 GROUP BY T1.A1 ORDER BY T1.A1");
    assert_eq!(stmt.count_alias.as_deref(), Some("A2"));

    let mut store = seeded_store();
    let mut tx = store.begin().unwrap();
    let rows = tx.query(&stmt.sql, &stmt.params).unwrap();
    let counts: Vec<(Value, Value)> = rows
        .iter()
        .map(|row| (row.get("A1").cloned().unwrap(), row.get("A2").cloned().unwrap()))
        .collect();
    assert_eq!(
        counts,
        vec![
            (Value::from("Documentary"), Value::Int(1)),
            (Value::from("Sci-Fi"), Value::Int(2)),
            (Value::from("Thriller"), Value::Int(1)),
        ]
    );
}

#[test]
fn test_nested_statement_continues_parent_aliases() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&genre()).unwrap());
    let predicate = CompiledPredicate::empty();

    let mut aliases = AliasNamespace::new();
    assert_eq!(aliases.get_or_create(AliasKey::Derived, "T"), "T0");

    let stmt = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build_in(CollectionMode::Correlated, &mut aliases)
        .unwrap();

    assert_snapshot!(stmt.sql, @"SELECT T1.ITEM_ID A0, T1.VALUE A1 FROM GENRE_VALUES T1 ORDER BY T1.ITEM_ID, T1.VALUE_ORDER");
}

#[test]
fn test_bounded_attribute_is_rejected() {
    let schema = schema();
    let mut refs = AttributeRefs::new();
    let attr = refs.add(schema.attribute(&studio()).unwrap());
    let predicate = CompiledPredicate::empty();

    let err = CollectionStatementBuilder::new(&schema, &refs, &predicate, attr)
        .build(CollectionMode::Correlated)
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::UnsupportedCardinality {
            cardinality: Cardinality::ManyToOne,
            ..
        }
    ));
}
