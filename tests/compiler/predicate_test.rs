//! Tests for filter compilation and binding.

#[path = "../common/mod.rs"]
mod common;

use std::collections::HashMap;

use common::{actors, genre, schema, studio, title, year};
use mediaql::compiler::{
    AliasNamespace, AttributeJoinPlanner, AttributeRefs, BoundPredicate, ColumnRef,
    CompiledPredicate, CompilerOptions, LogicalTable, PredicatePart, StatementTables,
};
use mediaql::error::QueryError;
use mediaql::model::{AttributePath, Filter, RelationalOperator, Value};
use mediaql::schema::SchemaSnapshot;
use mediaql::sql::{Dialect, JoinType};

// =============================================================================
// Helpers
// =============================================================================

fn compile(
    schema: &SchemaSnapshot,
    filter: &Filter,
    options: &CompilerOptions,
) -> Result<(CompiledPredicate, AttributeRefs), QueryError> {
    let mut refs = AttributeRefs::new();
    let predicate = CompiledPredicate::compile(Some(filter), schema, &mut refs, options)?;
    Ok((predicate, refs))
}

/// Bind against a statement over `M_VIDEO T0`, joining whatever the
/// predicate's attributes need.
fn bind_on_video(filter: &Filter, options: &CompilerOptions) -> Result<BoundPredicate, QueryError> {
    let schema = schema();
    let (predicate, refs) = compile(&schema, filter, options)?;

    let mut aliases = AliasNamespace::new();
    let mut tables = StatementTables::new();
    let base = tables.add_base(&mut aliases, LogicalTable::AspectMain("video".into()), "M_VIDEO");
    let anchor = ColumnRef::new(base, "ITEM_ID");

    let planner = AttributeJoinPlanner::new(&schema, &refs);
    let mut resolved = HashMap::new();
    for attr in predicate.attributes() {
        planner.resolve(
            attr,
            &mut aliases,
            &mut tables,
            &mut resolved,
            JoinType::LeftOuter,
            &anchor,
        )?;
    }
    predicate.bind(&resolved, &tables, &tables.qualify(&anchor))
}

fn render(filter: &Filter) -> BoundPredicate {
    bind_on_video(filter, &CompilerOptions::default()).unwrap()
}

// =============================================================================
// Bounded attributes
// =============================================================================

#[test]
fn test_inline_equality() {
    let bound = render(&Filter::eq(title(), "Inception"));
    assert_eq!(bound.sql, "T0.TITLE = ?");
    assert_eq!(bound.params, vec![Value::from("Inception")]);
}

#[test]
fn test_relational_operators() {
    let bound = render(&Filter::and(vec![
        Filter::compare(year(), RelationalOperator::Ge, 2000i64),
        Filter::compare(year(), RelationalOperator::Ne, 2005i64),
    ]));
    assert_eq!(bound.sql, "(T0.YEAR >= ? AND T0.YEAR <> ?)");
    assert_eq!(bound.params, vec![Value::Int(2000), Value::Int(2005)]);
}

#[test]
fn test_many_to_one_compares_value_table() {
    let bound = render(&Filter::eq(studio(), "Warner"));
    assert_eq!(bound.sql, "T1.VALUE = ?");
}

#[test]
fn test_bounded_is_empty_is_null() {
    let bound = render(&Filter::or(vec![
        Filter::is_empty(title()),
        Filter::is_empty(studio()),
    ]));
    assert_eq!(bound.sql, "(T0.TITLE IS NULL OR T1.VALUE IS NULL)");
    assert!(bound.params.is_empty());
}

#[test]
fn test_like_with_escape() {
    let bound = render(&Filter::like(title(), "50!%%").with_escape('!'));
    assert_eq!(bound.sql, "T0.TITLE LIKE ? ESCAPE '!'");
    assert_eq!(bound.params, vec![Value::from("50!%%")]);
}

#[test]
fn test_like_ignore_case() {
    let bound = render(&Filter::like_ignore_case(title(), "incep%", '!'));
    assert_eq!(bound.sql, "UPPER(T0.TITLE) LIKE UPPER(?) ESCAPE '!'");
}

#[test]
fn test_between_and_in() {
    let bound = render(&Filter::and(vec![
        Filter::between(year(), 2000i64, 2010i64),
        Filter::is_in(title(), vec![Value::from("Inception"), Value::from("Heat")]),
    ]));
    assert_eq!(bound.sql, "(T0.YEAR BETWEEN ? AND ? AND T0.TITLE IN (?, ?))");
    assert_eq!(bound.params.len(), 4);
}

#[test]
fn test_negation() {
    let bound = render(&Filter::not(Filter::eq(title(), "Heat")));
    assert_eq!(bound.sql, "NOT (T0.TITLE = ?)");
}

// =============================================================================
// Collection attributes
// =============================================================================

#[test]
fn test_one_to_many_is_empty_not_exists() {
    let schema = schema();
    let (predicate, _) = compile(
        &schema,
        &Filter::is_empty(genre()),
        &CompilerOptions::default(),
    )
    .unwrap();

    assert_eq!(
        predicate.parts(),
        &[
            PredicatePart::Sql(
                "NOT EXISTS(SELECT VAL.ITEM_ID FROM GENRE_VALUES VAL WHERE VAL.ITEM_ID = ".into()
            ),
            PredicatePart::Anchor,
            PredicatePart::Sql(" )".into()),
        ]
    );
    assert_eq!(predicate.attributes().count(), 0);

    let bound = render(&Filter::is_empty(genre()));
    assert_eq!(
        bound.sql,
        "NOT EXISTS(SELECT VAL.ITEM_ID FROM GENRE_VALUES VAL WHERE VAL.ITEM_ID = T0.ITEM_ID )"
    );
}

#[test]
fn test_one_to_many_comparison_exists() {
    let bound = render(&Filter::eq(genre(), "Sci-Fi"));
    assert_eq!(
        bound.sql,
        "EXISTS(SELECT VAL.ITEM_ID FROM GENRE_VALUES VAL WHERE VAL.ITEM_ID = T0.ITEM_ID AND VAL.VALUE = ?)"
    );
    assert_eq!(bound.params, vec![Value::from("Sci-Fi")]);
}

#[test]
fn test_many_to_many_comparison_exists() {
    let bound = render(&Filter::eq(actors(), "Page"));
    assert_eq!(
        bound.sql,
        "EXISTS(SELECT NM.ITEM_ID FROM NM_VIDEO_ACTORS NM INNER JOIN V_VIDEO_ACTORS VAL ON NM.VALUE_ID = VAL.VALUE_ID WHERE NM.ITEM_ID = T0.ITEM_ID AND VAL.VALUE = ?)"
    );
}

#[test]
fn test_many_to_many_is_empty() {
    let bound = render(&Filter::is_empty(actors()));
    assert_eq!(
        bound.sql,
        "NOT EXISTS(SELECT NM.ITEM_ID FROM NM_VIDEO_ACTORS NM INNER JOIN V_VIDEO_ACTORS VAL ON NM.VALUE_ID = VAL.VALUE_ID WHERE NM.ITEM_ID = T0.ITEM_ID )"
    );
}

#[test]
fn test_anchor_follows_the_binding_statement() {
    let schema = schema();
    let (predicate, _) = compile(
        &schema,
        &Filter::eq(genre(), "Sci-Fi"),
        &CompilerOptions::default(),
    )
    .unwrap();
    let tables = StatementTables::new();

    let primary = predicate
        .bind(&HashMap::new(), &tables, &mediaql::sql::QualifiedColumn::new("T0", "ITEM_ID"))
        .unwrap();
    let collection = predicate
        .bind(&HashMap::new(), &tables, &mediaql::sql::QualifiedColumn::new("T3", "ITEM_ID"))
        .unwrap();

    assert!(primary.sql.contains("VAL.ITEM_ID = T0.ITEM_ID"));
    assert!(collection.sql.contains("VAL.ITEM_ID = T3.ITEM_ID"));
    assert_eq!(primary.params, collection.params);
}

// =============================================================================
// Determinism and errors
// =============================================================================

#[test]
fn test_compile_is_deterministic() {
    let schema = schema();
    let filter = Filter::and(vec![
        Filter::like(title(), "Incep%"),
        Filter::not(Filter::is_empty(genre())),
        Filter::is_in(year(), vec![Value::Int(2010), Value::Int(2014)]),
    ]);
    let options = CompilerOptions::default();

    let (first, _) = compile(&schema, &filter, &options).unwrap();
    let (second, _) = compile(&schema, &filter, &options).unwrap();
    assert_eq!(first.parts(), second.parts());
    assert_eq!(first.params(), second.params());
}

#[test]
fn test_empty_in_list_is_structural_error() {
    let err = bind_on_video(&Filter::is_in(title(), vec![]), &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, QueryError::EmptyInList(_)));
    assert!(err.is_structural());
}

#[test]
fn test_similar_to_depends_on_dialect() {
    let filter = Filter::similar_to(title(), "(Incep|Inter)%");

    let err = bind_on_video(&filter, &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedOperator { .. }));

    let bound = bind_on_video(&filter, &CompilerOptions::with_dialect(Dialect::Postgres)).unwrap();
    assert_eq!(bound.sql, "T0.TITLE SIMILAR TO ?");
}

#[test]
fn test_unknown_attribute_is_schema_error() {
    let err = bind_on_video(
        &Filter::eq(AttributePath::new("video", "Director"), "Nolan"),
        &CompilerOptions::default(),
    )
    .unwrap_err();
    assert!(err.is_schema_error());

    let err = bind_on_video(
        &Filter::eq(AttributePath::new("audio", "Artist"), "Nolan"),
        &CompilerOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::UnknownAspect(_)));
}

#[test]
fn test_bind_fails_for_unjoined_attribute() {
    let schema = schema();
    let (predicate, _) = compile(
        &schema,
        &Filter::eq(title(), "Inception"),
        &CompilerOptions::default(),
    )
    .unwrap();

    let err = predicate
        .bind(
            &HashMap::new(),
            &StatementTables::new(),
            &mediaql::sql::QualifiedColumn::new("T0", "ITEM_ID"),
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::UnresolvedAttribute(path) if path == title()));
}

#[test]
fn test_invalid_filter_value() {
    let err = bind_on_video(&Filter::eq(year(), "next year"), &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, QueryError::InvalidFilterValue { .. }));
}
