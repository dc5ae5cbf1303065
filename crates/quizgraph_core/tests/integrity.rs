use quizgraph_core::db::open_db_in_memory;
use quizgraph_core::{
    Answer, CancelFlag, Cancellable, Collection, Document, IntegrityValidator, NoProgress,
    ObjectId, ProgressSink, Question, Quiz, RecordStore, SqliteRecordStore, ValidateError,
};
use serde::Serialize;
use serde_json::json;

fn insert<T: Serialize>(store: &SqliteRecordStore<'_>, collection: Collection, record: &T) {
    let document = Document::from_record(record).expect("record should serialize");
    store
        .insert(collection, &document)
        .expect("insert should succeed");
}

/// Complete quiz Q1 with questions A1 (answer X1) and A2 (no answers).
struct Fixture {
    quiz: Quiz,
    first: Question,
    second: Question,
    answer: Answer,
}

fn seed(store: &SqliteRecordStore<'_>) -> Fixture {
    let mut quiz = Quiz::new("https://example.com/quiz/q1");
    quiz.complete = true;
    let mut first = Question::new(quiz.id).with_field("label", "A1");
    let second = Question::new(quiz.id).with_field("label", "A2");
    let answer = Answer::new(first.id).with_field("text", "X1");
    first.answers.push(answer.id);
    quiz.questions = vec![first.id, second.id];

    insert(store, Collection::Quizzes, &quiz);
    insert(store, Collection::Questions, &first);
    insert(store, Collection::Questions, &second);
    insert(store, Collection::Answers, &answer);

    Fixture {
        quiz,
        first,
        second,
        answer,
    }
}

#[derive(Default)]
struct RecordingSink {
    begins: Vec<(String, usize)>,
    advances: Vec<(usize, usize)>,
    finishes: Vec<(String, usize)>,
}

impl ProgressSink for RecordingSink {
    fn begin(&mut self, label: &str, total: usize) {
        self.begins.push((label.to_string(), total));
    }

    fn advance(&mut self, done: usize, total: usize) {
        self.advances.push((done, total));
    }

    fn finish(&mut self, label: &str, done: usize) {
        self.finishes.push((label.to_string(), done));
    }
}

#[test]
fn consistent_dataset_is_clean() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    seed(&store);

    let validator = IntegrityValidator::new(&store);
    let report = validator.validate_all(&mut NoProgress).unwrap();
    assert!(report.is_clean());
}

#[test]
fn question_with_missing_answer_is_offending() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let fixture = seed(&store);

    store.delete(Collection::Answers, fixture.answer.id).unwrap();

    let validator = IntegrityValidator::new(&store);
    let offending = validator.validate_questions(&mut NoProgress).unwrap();
    assert_eq!(offending, vec![fixture.first.id]);
    assert!(!offending.contains(&fixture.second.id));
}

#[test]
fn complete_quiz_with_missing_question_is_offending() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let fixture = seed(&store);

    store.delete(Collection::Questions, fixture.second.id).unwrap();

    let validator = IntegrityValidator::new(&store);
    let offending = validator.validate_quizzes(&mut NoProgress).unwrap();
    assert_eq!(offending, vec![fixture.quiz.id]);

    let document = store
        .get(Collection::Quizzes, fixture.quiz.id)
        .unwrap()
        .unwrap();
    let issues = validator.inspect(Collection::Quizzes, &document).unwrap();
    assert_eq!(issues.broken_children, vec![fixture.second.id]);
    assert!(issues.broken_parent.is_none());
}

#[test]
fn incomplete_quiz_children_are_not_checked() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let mut pending = Quiz::new("https://example.com/quiz/pending");
    pending.questions = vec![ObjectId::new()];
    insert(&store, Collection::Quizzes, &pending);

    let validator = IntegrityValidator::new(&store);
    assert!(validator
        .validate_quizzes(&mut NoProgress)
        .unwrap()
        .is_empty());

    store
        .update_field(
            Collection::Quizzes,
            "address",
            &json!(pending.address),
            "complete",
            &json!("true"),
        )
        .unwrap();
    assert_eq!(
        validator.validate_quizzes(&mut NoProgress).unwrap(),
        vec![pending.id]
    );
}

#[test]
fn dangling_parent_references_are_offending() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let fixture = seed(&store);

    let orphan_question = Question::new(ObjectId::new());
    let orphan_answer = Answer::new(ObjectId::new());
    insert(&store, Collection::Questions, &orphan_question);
    insert(&store, Collection::Answers, &orphan_answer);

    let validator = IntegrityValidator::new(&store);
    let report = validator.validate_all(&mut NoProgress).unwrap();
    assert_eq!(report.answers, vec![orphan_answer.id]);
    assert_eq!(report.questions, vec![orphan_question.id]);
    assert!(report.quizzes.is_empty());
    assert!(!report.answers.contains(&fixture.answer.id));
}

#[test]
fn malformed_reference_fields_make_record_offending() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let no_parent = Document::new(ObjectId::new(), serde_json::Map::new());
    let bad_list = Document::from_value(json!({
        "_id": ObjectId::new().to_hex(),
        "quiz": ObjectId::new().to_hex(),
        "answers": "not-a-list",
    }))
    .unwrap();
    store.insert(Collection::Answers, &no_parent).unwrap();
    store.insert(Collection::Questions, &bad_list).unwrap();

    let validator = IntegrityValidator::new(&store);
    assert_eq!(
        validator.validate_answers(&mut NoProgress).unwrap(),
        vec![no_parent.id]
    );

    let issues = validator
        .inspect(Collection::Questions, &bad_list)
        .unwrap();
    assert_eq!(issues.malformed_fields, vec!["answers"]);
    assert!(issues.broken_parent.is_some());
}

#[test]
fn validate_all_runs_answers_questions_quizzes_in_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    seed(&store);

    let validator = IntegrityValidator::new(&store);
    let mut sink = RecordingSink::default();
    validator.validate_all(&mut sink).unwrap();

    assert_eq!(
        sink.begins,
        vec![
            ("Validating Answers".to_string(), 1),
            ("Validating Questions".to_string(), 2),
            ("Validating Quizzes".to_string(), 1),
        ]
    );
    assert_eq!(sink.advances, vec![(1, 1), (1, 2), (2, 2), (1, 1)]);
    assert_eq!(sink.finishes.len(), 3);
}

#[test]
fn cancelled_validation_stops_before_first_record() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    seed(&store);

    let flag = CancelFlag::new();
    flag.cancel();
    let mut sink = Cancellable::new(NoProgress, flag);

    let validator = IntegrityValidator::new(&store);
    let err = validator.validate_questions(&mut sink).unwrap_err();
    assert!(matches!(
        err,
        ValidateError::Cancelled {
            collection: Collection::Questions,
            processed: 0,
            total: 2,
        }
    ));
}
