use std::collections::HashSet;

use aqlite::{memory::InMemoryDatabase, prelude::*};
use proptest::prelude::*;
use serde_json::{Value, json};

fn database() -> Database<InMemoryDatabase> {
    Database::new(
        InMemoryDatabase::builder()
            .collection("users", CollectionType::Document)
            .collection("knows", CollectionType::Edge)
            .build()
            .unwrap(),
    )
}

#[test]
fn insert_then_read_round_trips() {
    let db = database();
    let users = db.collection("users").unwrap();

    let input = json!({ "name": "john", "address": { "city": "Cologne" }, "tags": [1, 2] });
    let inserted = users.insert(input.clone(), WriteOptions::new()).unwrap().unwrap();
    let key = inserted["_key"].as_str().unwrap();
    let read = users.get(Some(key)).unwrap().unwrap();

    let mut expected = input;
    expected["_key"] = json!(key);
    expected["_id"] = json!(format!("users/{key}"));
    expected["_rev"] = read["_rev"].clone();

    assert_eq!(read, expected);
    assert_eq!(read, inserted);
}

#[test]
fn revision_changes_on_every_replace() {
    let db = database();
    let users = db.collection("users").unwrap();

    let mut current = users.insert(json!({ "n": 0 }), WriteOptions::new()).unwrap().unwrap();
    let rev = |doc: &Value| doc["_rev"].as_str().unwrap().to_string();
    let mut seen = HashSet::from([rev(&current)]);

    for n in 1..20 {
        current = users
            .replace("1", json!({ "n": n }), WriteOptions::new())
            .unwrap()
            .unwrap();
        assert!(seen.insert(rev(&current)), "revision reused at {n}");
    }
}

#[test]
fn optimistic_concurrency_retry_loop() {
    let db = database();
    let users = db.collection("users").unwrap();
    users.insert(json!({ "_key": "c", "count": 0 }), WriteOptions::new()).unwrap();

    let check = WriteOptions::new().check_revs(true);

    // A reader holds revision R while someone else writes.
    let stale = users.get(Some("c")).unwrap().unwrap();
    users.replace("c", json!({ "count": 10 }), WriteOptions::new()).unwrap();

    let mut attempt = stale.clone();
    attempt["count"] = json!(1);
    let err = users.replace("c", attempt.clone(), check).unwrap_err();
    assert!(err.is(ErrorNum::Conflict));
    assert_eq!((err.code, err.error_num), (409, 1200));

    // Re-read and retry.
    let mut fresh = users.get(Some("c")).unwrap().unwrap();
    fresh["count"] = json!(fresh["count"].as_i64().unwrap() + 1);
    let written = users.replace("c", fresh, check).unwrap().unwrap();
    assert_eq!(written["count"], 11);

    // Without checkRevs the stale document simply wins.
    let forced = users.replace("c", attempt, WriteOptions::new()).unwrap().unwrap();
    assert_eq!(forced["count"], 1);
}

#[test]
fn ignored_duplicate_leaves_original() {
    let db = database();
    let users = db.collection("users").unwrap();
    let original = users.insert(json!({ "_key": "k", "v": "first" }), WriteOptions::new()).unwrap();

    let ignored = users
        .insert(json!({ "_key": "k", "v": "second" }), WriteOptions::new().ignore_errors(true))
        .unwrap();
    assert_eq!(ignored, None);
    assert_eq!(users.get(Some("k")).unwrap(), original);

    let err = users
        .insert(json!({ "_key": "k", "v": "third" }), WriteOptions::new())
        .unwrap_err();
    assert_eq!(err.error_num, 1210);
}

#[test]
fn edges_need_from_and_to() {
    let db = database();
    let edge = json!({ "_from": "users/1", "_to": "users/2", "since": 2020 });

    for bad in [
        json!({ "since": 2020 }),
        json!({ "_from": "users/1" }),
        json!({ "_from": "users1", "_to": "users/2" }),
    ] {
        let err = db
            .collection("knows")
            .unwrap()
            .insert(bad.clone(), WriteOptions::new())
            .unwrap_err();
        assert_eq!(err.error_num, 1233);

        assert!(db.collection("users").unwrap().insert(bad, WriteOptions::new()).is_ok());
    }

    let stored = db.collection("knows").unwrap().insert(edge, WriteOptions::new()).unwrap().unwrap();
    assert_eq!(stored["_from"], "users/1");
}

#[test]
fn missing_collection_is_1203() {
    let db = database();

    let err = db.collection("ghosts").unwrap_err();
    assert_eq!((err.code, err.error_num), (404, 1203));

    db.delete_collection("users").unwrap();
    assert!(db.collection("users").unwrap_err().is(ErrorNum::CollectionNotFound));
}

#[test]
fn document_id_parsing() {
    let id = DocumentId::parse(Some("users/1")).unwrap();
    assert_eq!(id.collection(), Some("users"));
    assert_eq!(id.key(), Some("1"));
    assert_eq!(id.id().as_deref(), Some("users/1"));

    let null = DocumentId::parse(None).unwrap();
    assert!(null.is_null());
    assert_eq!(null.id(), None);
    assert!(null.ensure_complete().unwrap_err().is(ErrorNum::IllegalDocumentKey));

    let err = DocumentId::parse(Some("bad-id-no-slash")).unwrap_err();
    assert_eq!((err.code, err.error_num), (400, 1221));
}

#[test]
fn errors_serialize_verbatim() {
    let db = database();
    let err = db.collection("ghosts").unwrap_err();

    let wire = serde_json::to_value(&err).unwrap();
    assert_eq!(wire["code"], 404);
    assert_eq!(wire["errorNum"], 1203);
    assert!(wire["errorMessage"].is_string());

    let back: DatabaseError = serde_json::from_value(wire).unwrap();
    assert_eq!(back, err);
}

proptest! {
    #[test]
    fn generated_keys_never_collide(names in prop::collection::vec("[a-z]{1,8}", 1..40)) {
        let db = database();
        let users = db.collection("users").unwrap();

        let keys: HashSet<String> = names
            .iter()
            .map(|name| {
                let doc = users.insert(json!({ "name": name }), WriteOptions::new()).unwrap().unwrap();
                doc["_key"].as_str().unwrap().to_string()
            })
            .collect();

        prop_assert_eq!(keys.len(), names.len());
        prop_assert_eq!(users.all().unwrap().len(), names.len());
    }
}
