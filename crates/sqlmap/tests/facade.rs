//! The facade exposes everything needed to configure and run statements.

use std::sync::Arc;

use sqlmap::{
    new_shared_registry, CacheModelDef, KeyTiming, Object, SelectKey, SqlMap, SqlMapper,
    StatementDef, Value,
};
use sqlmap_sqlite::SqliteDataSource;

#[test]
fn test_configure_and_run_through_facade() {
    let dir = tempfile::tempdir().unwrap();
    let map = SqlMap::builder()
        .cache_model(CacheModelDef::lru("notes", 8).flush_on_execute("addNote"))
        .statement(
            StatementDef::update("createNotes", "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
                .unwrap(),
        )
        .statement(
            StatementDef::insert("addNote", "INSERT INTO notes (body) VALUES (#body#)")
                .unwrap()
                .select_key(
                    SelectKey::new("id", "SELECT last_insert_rowid()", KeyTiming::Post)
                        .unwrap()
                        .result_class("int"),
                ),
        )
        .statement(
            StatementDef::select(
                "notes",
                "SELECT body FROM notes <dynamic prepend=\"WHERE\">\
                 <isNotEmpty prepend=\"AND\" property=\"body\">body = #body#</isNotEmpty>\
                 </dynamic> ORDER BY id",
            )
            .unwrap()
            .result_class("string")
            .cache_model("notes"),
        )
        .build()
        .unwrap();

    let mapper = SqlMapper::new(map, Arc::new(SqliteDataSource::new(dir.path().join("notes.db"))));
    let metrics = new_shared_registry();
    mapper.subscribe(metrics.clone());

    mapper.update("createNotes", &mut Value::Null).unwrap();
    let mut note = Value::from(Object::map().with("body", "first"));
    assert_eq!(mapper.insert("addNote", &mut note).unwrap(), Some(Value::Int32(1)));

    let everything = Value::from(Object::map().with("body", ""));
    assert_eq!(mapper.query_for_list("notes", &everything).unwrap(), vec![Value::from("first")]);
    assert_eq!(mapper.query_for_list("notes", &everything).unwrap().len(), 1);

    let mut second = Value::from(Object::map().with("body", "second"));
    mapper.insert("addNote", &mut second).unwrap();
    assert_eq!(mapper.query_for_list("notes", &everything).unwrap().len(), 2);

    assert_eq!(metrics.cache_hits(), 1);
    assert_eq!(metrics.cache_misses(), 2);
}
