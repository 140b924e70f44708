//! Shared fixture for integration tests.
//!
//! A small video library with two aspect types:
//!
//! ```text
//! video   Title (inline), Year (inline), Studio (many-to-one), Actors (many-to-many)
//! genre   Genre (one-to-many, stored in GENRE_VALUES)
//! ```
//!
//! Item identity lives in `ITEM_ID` columns.

#![allow(dead_code)]

use std::sync::Arc;

use mediaql::model::{AttributePath, ValueType};
use mediaql::schema::{
    AspectDefinition, AttributeDefinition, SchemaDefinition, SchemaSnapshot, StorageNaming,
};
use mediaql::store::SqliteStore;
use uuid::Uuid;

// =============================================================================
// Schema
// =============================================================================

pub fn naming() -> StorageNaming {
    StorageNaming {
        item_id_column: "ITEM_ID".to_string(),
        ..Default::default()
    }
}

pub fn definition() -> SchemaDefinition {
    SchemaDefinition::new()
        .aspect(
            AspectDefinition::new("video")
                .with_name("Video")
                .attribute(AttributeDefinition::inline("Title", ValueType::String))
                .attribute(AttributeDefinition::inline("Year", ValueType::Integer))
                .attribute(AttributeDefinition::many_to_one("Studio", ValueType::String))
                .attribute(AttributeDefinition::many_to_many("Actors", ValueType::String)),
        )
        .aspect(
            AspectDefinition::new("genre").attribute(
                AttributeDefinition::one_to_many("Genre", ValueType::String)
                    .with_value_table("GENRE_VALUES"),
            ),
        )
}

pub fn schema() -> SchemaSnapshot {
    SchemaSnapshot::from_definition(definition(), naming()).unwrap()
}

pub fn shared_schema() -> Arc<SchemaSnapshot> {
    Arc::new(schema())
}

pub fn title() -> AttributePath {
    AttributePath::new("video", "Title")
}

pub fn year() -> AttributePath {
    AttributePath::new("video", "Year")
}

pub fn studio() -> AttributePath {
    AttributePath::new("video", "Studio")
}

pub fn actors() -> AttributePath {
    AttributePath::new("video", "Actors")
}

pub fn genre() -> AttributePath {
    AttributePath::new("genre", "Genre")
}

// =============================================================================
// Store
// =============================================================================

/// Video with two genres, two actors and a studio.
pub const INCEPTION: Uuid = Uuid::from_u128(0x1000_0000_0000_4000_8000_0000_0000_0001);
/// Video with one genre, one actor and a studio.
pub const INTERSTELLAR: Uuid = Uuid::from_u128(0x1000_0000_0000_4000_8000_0000_0000_0002);
/// Video without studio, actors or genre aspect.
pub const INCENDIES: Uuid = Uuid::from_u128(0x1000_0000_0000_4000_8000_0000_0000_0003);
/// Genre aspect only.
pub const DOCUMENTARY: Uuid = Uuid::from_u128(0x1000_0000_0000_4000_8000_0000_0000_0004);

const DDL: &str = "
    CREATE TABLE MEDIA_ITEMS (ITEM_ID TEXT PRIMARY KEY);
    CREATE TABLE M_VIDEO (ITEM_ID TEXT PRIMARY KEY, TITLE TEXT, YEAR INTEGER, STUDIO INTEGER);
    CREATE TABLE V_VIDEO_STUDIO (VALUE_ID INTEGER PRIMARY KEY, VALUE TEXT);
    CREATE TABLE NM_VIDEO_ACTORS (ITEM_ID TEXT, VALUE_ID INTEGER, VALUE_ORDER INTEGER);
    CREATE TABLE V_VIDEO_ACTORS (VALUE_ID INTEGER PRIMARY KEY, VALUE TEXT);
    CREATE TABLE M_GENRE (ITEM_ID TEXT PRIMARY KEY);
    CREATE TABLE GENRE_VALUES (ITEM_ID TEXT, VALUE TEXT, VALUE_ORDER INTEGER);
";

/// In-memory store with the fixture tables created and seeded.
pub fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    let conn = store.connection();
    conn.execute_batch(DDL).unwrap();

    for id in [INCEPTION, INTERSTELLAR, INCENDIES, DOCUMENTARY] {
        conn.execute("INSERT INTO MEDIA_ITEMS VALUES (?1)", [id.to_string()])
            .unwrap();
    }

    conn.execute_batch(
        "INSERT INTO V_VIDEO_STUDIO VALUES (1, 'Warner'), (2, 'Paramount');
         INSERT INTO V_VIDEO_ACTORS VALUES (1, 'DiCaprio'), (2, 'Page'), (3, 'McConaughey');",
    )
    .unwrap();

    let videos: [(Uuid, &str, i64, Option<i64>); 3] = [
        (INCEPTION, "Inception", 2010, Some(1)),
        (INTERSTELLAR, "Interstellar", 2014, Some(2)),
        (INCENDIES, "Incendies", 2010, None),
    ];
    for (id, title, year, studio) in videos {
        conn.execute(
            "INSERT INTO M_VIDEO VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id.to_string(), title, year, studio],
        )
        .unwrap();
    }

    for (id, actor, order) in [(INCEPTION, 1, 0), (INCEPTION, 2, 1), (INTERSTELLAR, 3, 0)] {
        conn.execute(
            "INSERT INTO NM_VIDEO_ACTORS VALUES (?1, ?2, ?3)",
            rusqlite::params![id.to_string(), actor, order],
        )
        .unwrap();
    }

    for id in [INCEPTION, INTERSTELLAR, DOCUMENTARY] {
        conn.execute("INSERT INTO M_GENRE VALUES (?1)", [id.to_string()])
            .unwrap();
    }
    let genres = [
        (INCEPTION, "Thriller", 1),
        (INCEPTION, "Sci-Fi", 0),
        (INTERSTELLAR, "Sci-Fi", 0),
        (DOCUMENTARY, "Documentary", 0),
    ];
    for (id, genre, order) in genres {
        conn.execute(
            "INSERT INTO GENRE_VALUES VALUES (?1, ?2, ?3)",
            rusqlite::params![id.to_string(), genre, order],
        )
        .unwrap();
    }

    store
}
