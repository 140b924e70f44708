//! End-to-end item queries against an in-memory SQLite store.

#[path = "../common/mod.rs"]
mod common;

use common::{
    actors, genre, seeded_store, shared_schema, studio, title, year, DOCUMENTARY, INCENDIES,
    INCEPTION, INTERSTELLAR,
};
use insta::assert_snapshot;
use mediaql::compiler::CompilerOptions;
use mediaql::model::{AttributeValue, Filter, MediaItem, MediaItemQuery, SortSpec, Value};
use mediaql::query::CompiledItemQuery;
use mediaql::MediaLibrary;
use uuid::Uuid;

// =============================================================================
// Helpers
// =============================================================================

fn compile(query: &MediaItemQuery) -> CompiledItemQuery {
    CompiledItemQuery::compile(shared_schema(), query, &CompilerOptions::default()).unwrap()
}

fn find(items: &[MediaItem], id: Uuid) -> &MediaItem {
    items.iter().find(|item| item.id == id).unwrap()
}

fn texts(values: &[Value]) -> Vec<&str> {
    values.iter().map(|v| v.as_text().unwrap()).collect()
}

// =============================================================================
// Video with genres
// =============================================================================

/// Necessary video, optional genre, filtered by title, selecting Title and
/// Genre.
fn title_and_genre_query(pattern: &str) -> MediaItemQuery {
    MediaItemQuery::new()
        .necessary("video")
        .optional("genre")
        .filter(Filter::like(title(), pattern))
        .select(title())
        .select(genre())
}

#[test]
fn test_one_collection_statement_and_one_primary() {
    let statements = compile(&title_and_genre_query("Incep%")).explain().unwrap();

    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].label, "collection genre.Genre");
    assert_snapshot!(statements[0].sql, @"SELECT T0.ITEM_ID A0, T0.VALUE A1 FROM GENRE_VALUES T0 INNER JOIN M_VIDEO T1 ON T1.ITEM_ID = T0.ITEM_ID WHERE T1.TITLE LIKE ? ORDER BY T0.ITEM_ID, T0.VALUE_ORDER");
    assert_eq!(statements[1].label, "primary");
    assert_snapshot!(statements[1].sql, @"SELECT T0.ITEM_ID A0, T0.ITEM_ID A1, T1.ITEM_ID A2, T0.TITLE A3 FROM M_VIDEO T0 LEFT OUTER JOIN M_GENRE T1 ON T1.ITEM_ID = T0.ITEM_ID WHERE T0.TITLE LIKE ?");

    for stmt in &statements {
        assert_eq!(stmt.params, vec![Value::from("Incep%")]);
    }
}

#[test]
fn test_hydrates_title_and_genres() {
    let mut store = seeded_store();
    let items = compile(&title_and_genre_query("Incep%"))
        .execute(&mut store)
        .unwrap();

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.id, INCEPTION);

    let video = item.aspect("video").unwrap();
    assert_eq!(video.value("Title"), Some(&Value::from("Inception")));
    assert!(video.get("Year").is_none());

    let genres = item.aspect("genre").unwrap();
    assert_eq!(texts(genres.values("Genre")), vec!["Sci-Fi", "Thriller"]);
}

#[test]
fn test_absent_optional_aspect_is_not_loaded() {
    let mut store = seeded_store();
    let items = compile(&title_and_genre_query("Inc%"))
        .execute(&mut store)
        .unwrap();

    assert_eq!(items.len(), 2);
    let incendies = find(&items, INCENDIES);
    assert!(incendies.has_aspect("video"));
    assert!(!incendies.has_aspect("genre"));
    assert!(find(&items, INCEPTION).has_aspect("genre"));
}

#[test]
fn test_present_aspect_without_values_has_empty_collection() {
    let query = MediaItemQuery::new()
        .necessary("video")
        .select(title())
        .select(actors())
        .select(studio());
    let mut store = seeded_store();
    let items = compile(&query).execute(&mut store).unwrap();
    assert_eq!(items.len(), 3);

    let incendies = find(&items, INCENDIES).aspect("video").unwrap();
    assert_eq!(
        incendies.get("Actors"),
        Some(&AttributeValue::Collection(vec![]))
    );
    assert_eq!(incendies.value("Studio"), Some(&Value::Null));

    let inception = find(&items, INCEPTION).aspect("video").unwrap();
    assert_eq!(texts(inception.values("Actors")), vec!["DiCaprio", "Page"]);
    assert_eq!(inception.value("Studio"), Some(&Value::from("Warner")));
}

// =============================================================================
// Filters, sorting and paging
// =============================================================================

#[test]
fn test_collection_filter_restricts_items_and_collections() {
    let query = MediaItemQuery::new()
        .necessary("video")
        .optional("genre")
        .filter(Filter::eq(genre(), "Thriller"))
        .select(title())
        .select(genre());
    let mut store = seeded_store();
    let items = compile(&query).execute(&mut store).unwrap();

    assert_eq!(items.len(), 1);
    // The filter selects items; it does not trim their collections.
    assert_eq!(
        texts(items[0].aspect("genre").unwrap().values("Genre")),
        vec!["Sci-Fi", "Thriller"]
    );
}

#[test]
fn test_is_empty_filters() {
    let mut store = seeded_store();

    let no_studio = MediaItemQuery::new()
        .necessary("video")
        .filter(Filter::is_empty(studio()));
    let items = compile(&no_studio).execute(&mut store).unwrap();
    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![INCENDIES]);

    let no_genres = MediaItemQuery::new()
        .optional("genre")
        .filter(Filter::is_empty(genre()));
    let items = compile(&no_genres).execute(&mut store).unwrap();
    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![INCENDIES]);
}

#[test]
fn test_unrestricted_filter_operands() {
    let mut store = seeded_store();

    let either = MediaItemQuery::new()
        .necessary("video")
        .select(title())
        .filter(Filter::or(vec![
            Filter::and(vec![]),
            Filter::eq(title(), "nope"),
        ]));
    assert_eq!(compile(&either).execute(&mut store).unwrap().len(), 3);

    let neither = MediaItemQuery::new()
        .necessary("video")
        .select(title())
        .filter(Filter::not(Filter::and(vec![])));
    let statements = compile(&neither).explain().unwrap();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].sql.ends_with("WHERE 1 = 2"));
    assert!(compile(&neither).execute(&mut store).unwrap().is_empty());
}

#[test]
fn test_sort_and_paging() {
    let query = MediaItemQuery::new()
        .necessary("video")
        .select(title())
        .sort(SortSpec::desc(year()))
        .sort(SortSpec::asc(title()))
        .limit(2);
    let mut store = seeded_store();
    let items = compile(&query).execute(&mut store).unwrap();

    let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![INTERSTELLAR, INCENDIES]);

    let next_page = compile(&query.clone().offset(2)).execute(&mut store).unwrap();
    assert_eq!(next_page.len(), 1);
    assert_eq!(next_page[0].id, INCEPTION);
}

#[test]
fn test_empty_select_loads_every_attribute_of_requested_aspects() {
    let query = MediaItemQuery::new()
        .necessary("genre")
        .filter(Filter::item_ids(vec![DOCUMENTARY]));
    let mut store = seeded_store();
    let items = compile(&query).execute(&mut store).unwrap();

    assert_eq!(items.len(), 1);
    assert!(!items[0].has_aspect("video"));
    assert_eq!(
        texts(items[0].aspect("genre").unwrap().values("Genre")),
        vec!["Documentary"]
    );
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unknown_necessary_aspect_is_schema_error() {
    let query = MediaItemQuery::new().necessary("subtitles");
    let err = CompiledItemQuery::compile(shared_schema(), &query, &CompilerOptions::default())
        .unwrap_err();
    assert!(err.is_schema_error());
}

#[test]
fn test_unknown_filtered_aspect_is_schema_error() {
    let query = MediaItemQuery::new()
        .necessary("video")
        .filter(Filter::eq(mediaql::model::AttributePath::new("audio", "Codec"), "flac"));
    let err = CompiledItemQuery::compile(shared_schema(), &query, &CompilerOptions::default())
        .unwrap_err();
    assert!(err.is_schema_error());
}

#[test]
fn test_unknown_optional_aspect_is_ignored() {
    let query = MediaItemQuery::new().necessary("video").optional("subtitles");
    let mut store = seeded_store();
    let items = compile(&query).execute(&mut store).unwrap();
    assert_eq!(items.len(), 3);
}

// =============================================================================
// Single items and the library facade
// =============================================================================

#[test]
fn test_execute_single() {
    let query = MediaItemQuery::new()
        .necessary("video")
        .optional("genre")
        .select(title())
        .select(genre());
    let compiled = compile(&query);
    let mut store = seeded_store();

    let item = compiled.execute_single(&mut store, INTERSTELLAR).unwrap().unwrap();
    assert_eq!(item.id, INTERSTELLAR);
    assert_eq!(
        texts(item.aspect("genre").unwrap().values("Genre")),
        vec!["Sci-Fi"]
    );

    // DOCUMENTARY exists but lacks the necessary video aspect.
    assert!(compiled.execute_single(&mut store, DOCUMENTARY).unwrap().is_none());
}

#[test]
fn test_execute_single_ignores_paging() {
    let query = MediaItemQuery::new()
        .necessary("video")
        .select(title())
        .limit(1)
        .offset(1);
    let compiled = compile(&query);
    let mut store = seeded_store();

    let item = compiled.execute_single(&mut store, INTERSTELLAR).unwrap().unwrap();
    assert_eq!(item.id, INTERSTELLAR);
    assert_eq!(
        item.aspect("video").unwrap().value("Title"),
        Some(&Value::from("Interstellar"))
    );

    let mut library = MediaLibrary::new(common::schema(), seeded_store());
    let loaded = library.load_item(&query, INCEPTION).unwrap();
    assert_eq!(loaded.map(|item| item.id), Some(INCEPTION));
}

#[test]
fn test_library_sees_replaced_schema() {
    let mut library = MediaLibrary::new(common::schema(), seeded_store());
    let query = MediaItemQuery::new().necessary("video").select(genre());

    assert_eq!(library.search(&query).unwrap().len(), 3);

    let video_only = mediaql::schema::SchemaDefinition::new().aspect(
        mediaql::schema::AspectDefinition::new("video").attribute(
            mediaql::schema::AttributeDefinition::inline("Title", mediaql::model::ValueType::String),
        ),
    );
    library.replace_schema(
        mediaql::schema::SchemaSnapshot::from_definition(video_only, common::naming()).unwrap(),
    );

    let err = library.search(&query).unwrap_err();
    assert!(err.is_schema_error());

    let item = library
        .load_item(&MediaItemQuery::new().necessary("video"), INCEPTION)
        .unwrap()
        .unwrap();
    assert_eq!(
        item.aspect("video").unwrap().value("Title"),
        Some(&Value::from("Inception"))
    );
}
