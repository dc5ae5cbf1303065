use quizgraph_core::db::open_db_in_memory;
use quizgraph_core::{Collection, Document, ObjectId, RecordStore, SqliteRecordStore, StoreError};
use serde_json::{json, Value};

fn doc(fields: Value) -> Document {
    let Value::Object(fields) = fields else {
        panic!("fixture must be an object");
    };
    Document::new(ObjectId::new(), fields)
}

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let quiz = doc(json!({"address": "https://example.com/a", "complete": true, "questions": []}));
    store.insert(Collection::Quizzes, &quiz).unwrap();

    let loaded = store.get(Collection::Quizzes, quiz.id).unwrap().unwrap();
    assert_eq!(loaded, quiz);
    assert!(store.exists(Collection::Quizzes, quiz.id).unwrap());
    assert!(!store.exists(Collection::Questions, quiz.id).unwrap());
}

#[test]
fn insert_duplicate_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let answer = doc(json!({"text": "Gryffindor"}));
    store.insert(Collection::Answers, &answer).unwrap();
    let err = store.insert(Collection::Answers, &answer).unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateId { collection: Collection::Answers, id } if id == answer.id
    ));
}

#[test]
fn find_matches_by_type_and_keeps_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let first = doc(json!({"address": "a", "complete": true}));
    let second = doc(json!({"address": "b", "complete": false}));
    let third = doc(json!({"address": "c", "complete": true}));
    let legacy = doc(json!({"address": "d", "complete": "true"}));
    for record in [&first, &second, &third, &legacy] {
        store.insert(Collection::Quizzes, record).unwrap();
    }

    let complete = store
        .find_all(Collection::Quizzes, "complete", &json!(true))
        .unwrap();
    let ids: Vec<ObjectId> = complete.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![first.id, third.id]);

    let found = store
        .find_one(Collection::Quizzes, "address", &json!("b"))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, second.id);

    let by_text = store
        .find_all(Collection::Quizzes, "complete", &json!("true"))
        .unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].id, legacy.id);
}

#[test]
fn null_matches_missing_field() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let with_label = doc(json!({"label": "x"}));
    let without_label = doc(json!({}));
    store.insert(Collection::Questions, &with_label).unwrap();
    store.insert(Collection::Questions, &without_label).unwrap();

    let missing = store
        .find_all(Collection::Questions, "label", &Value::Null)
        .unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].id, without_label.id);
}

#[test]
fn id_lookup_with_malformed_id_finds_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    store.insert(Collection::Quizzes, &doc(json!({}))).unwrap();

    let found = store
        .find_one(Collection::Quizzes, "_id", &json!("not-an-id"))
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn composite_values_and_bad_attributes_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let err = store
        .find_all(Collection::Quizzes, "questions", &json!(["a"]))
        .unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedValue(_)));

    let err = store
        .find_all(Collection::Quizzes, "address; DROP TABLE quizzes", &json!("a"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidAttribute(_)));
}

#[test]
fn replace_missing_record_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let ghost = doc(json!({"text": "ghost"}));
    let err = store.replace(Collection::Answers, &ghost).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { id, .. } if id == ghost.id));

    store.insert(Collection::Answers, &ghost).unwrap();
    let mut updated = ghost.clone();
    updated.fields.insert("text".to_string(), json!("seen"));
    store.replace(Collection::Answers, &updated).unwrap();
    assert_eq!(
        store.get(Collection::Answers, ghost.id).unwrap().unwrap(),
        updated
    );
}

#[test]
fn update_field_touches_first_match_only() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let first = doc(json!({"address": "dup", "complete": false}));
    let second = doc(json!({"address": "dup", "complete": false}));
    store.insert(Collection::Quizzes, &first).unwrap();
    store.insert(Collection::Quizzes, &second).unwrap();

    let changed = store
        .update_field(
            Collection::Quizzes,
            "address",
            &json!("dup"),
            "complete",
            &json!(true),
        )
        .unwrap();
    assert!(changed);

    let first_loaded = store.get(Collection::Quizzes, first.id).unwrap().unwrap();
    let second_loaded = store.get(Collection::Quizzes, second.id).unwrap().unwrap();
    assert_eq!(first_loaded.get("complete"), Some(&json!(true)));
    assert_eq!(second_loaded.get("complete"), Some(&json!(false)));

    let changed = store
        .update_field(
            Collection::Quizzes,
            "address",
            &json!("nope"),
            "complete",
            &json!(true),
        )
        .unwrap();
    assert!(!changed);

    let err = store
        .update_field(Collection::Quizzes, "address", &json!("dup"), "_id", &json!("x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidAttribute(_)));
}

#[test]
fn rename_field_moves_values_of_any_shape() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let with_list = doc(json!({"question_ids": ["a", "b"], "label": "x"}));
    let without = doc(json!({"label": "y"}));
    store.insert(Collection::Quizzes, &with_list).unwrap();
    store.insert(Collection::Quizzes, &without).unwrap();

    let changed = store
        .rename_field(Collection::Quizzes, "question_ids", "questions")
        .unwrap();
    assert_eq!(changed, 1);

    let loaded = store
        .get(Collection::Quizzes, with_list.id)
        .unwrap()
        .unwrap();
    assert!(loaded.get("question_ids").is_none());
    assert_eq!(loaded.get("questions"), Some(&json!(["a", "b"])));

    let untouched = store.get(Collection::Quizzes, without.id).unwrap().unwrap();
    assert!(untouched.get("questions").is_none());
}

#[test]
fn delete_and_count() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let answer = doc(json!({"text": "Owl"}));
    store.insert(Collection::Answers, &answer).unwrap();
    store.insert(Collection::Answers, &doc(json!({"text": "Cat"}))).unwrap();
    assert_eq!(store.count_all(Collection::Answers).unwrap(), 2);

    assert!(store.delete(Collection::Answers, answer.id).unwrap());
    assert!(!store.delete(Collection::Answers, answer.id).unwrap());
    assert_eq!(store.count_all(Collection::Answers).unwrap(), 1);
    assert_eq!(store.count_all(Collection::Quizzes).unwrap(), 0);
}

#[test]
fn duplicate_values_are_grouped_by_type_in_first_seen_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    for fields in [
        json!({"label": "b"}),
        json!({"label": "a"}),
        json!({"label": "b"}),
        json!({"label": "a"}),
        json!({"label": "a"}),
        json!({"label": "unique"}),
        json!({"label": 1}),
        json!({"label": true}),
        json!({"label": true}),
        json!({}),
        json!({}),
        json!({"label": null}),
        json!({"label": null}),
    ] {
        store.insert(Collection::Questions, &doc(fields)).unwrap();
    }

    let duplicated = store
        .find_duplicate_values(Collection::Questions, "label")
        .unwrap();
    assert_eq!(duplicated, vec![json!("b"), json!("a"), json!(true)]);
}

#[test]
fn integer_and_real_numbers_group_as_one_value() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    for fields in [json!({"label": 1}), json!({"label": 1.0}), json!({"label": 2.5})] {
        store.insert(Collection::Questions, &doc(fields)).unwrap();
    }

    let duplicated = store
        .find_duplicate_values(Collection::Questions, "label")
        .unwrap();
    assert_eq!(duplicated.len(), 1);
    assert_eq!(duplicated[0].as_f64(), Some(1.0));

    let matching = store
        .find_all(Collection::Questions, "label", &duplicated[0])
        .unwrap();
    assert_eq!(matching.len(), 2);
}
