mod common;

use common::{fields, test_context, Author, Book, Chapter};
use recordbase_core::db::open_db_in_memory;
use recordbase_core::{EntityModel, ModelError, Operation, PersistenceContext, RepoError};
use serde_json::json;
use std::rc::Rc;
use uuid::Uuid;

fn book_model(
    context: &Rc<PersistenceContext>,
) -> EntityModel<Book, recordbase_core::SqliteRepository<Book>> {
    EntityModel::new(Rc::clone(context), context.repository::<Book>())
}

#[test]
fn single_join_association_resolves_to_target_document() {
    let context = test_context();
    let mut authors = EntityModel::new(Rc::clone(&context), context.repository::<Author>());
    let mut books = book_model(&context);

    let author = authors
        .create(fields(json!({"name": "Ann", "bio": "writes"})))
        .unwrap();
    let author_id = author.id.unwrap().to_string();

    let book = books
        .create(fields(json!({"title": "Dust", "author": author_id})))
        .unwrap();

    let resolved = book.author.as_ref().expect("author should resolve");
    assert_eq!(resolved.get("name"), Some(&json!("Ann")));
    assert_eq!(resolved.get("bio"), Some(&json!("writes")));
    // Resolution never leaks storage bookkeeping.
    assert!(!resolved.contains_key("__rev"));
}

#[test]
fn single_join_association_without_match_resolves_to_null() {
    let context = test_context();
    let mut books = book_model(&context);

    let book = books
        .create(fields(json!({
            "title": "Dust",
            "author": Uuid::new_v4().to_string()
        })))
        .unwrap();

    assert!(book.author.is_none());
}

#[test]
fn collection_association_resolves_all_matches() {
    let context = test_context();
    let mut chapters = EntityModel::new(Rc::clone(&context), context.repository::<Chapter>());
    let mut books = book_model(&context);

    chapters
        .create(fields(json!({"book_ref": "vol-1", "title": "One"})))
        .unwrap();
    chapters
        .create(fields(json!({"book_ref": "vol-1", "title": "Two"})))
        .unwrap();
    chapters
        .create(fields(json!({"book_ref": "vol-2", "title": "Other"})))
        .unwrap();

    let book = books
        .create(fields(json!({"title": "Dust", "chapters": "vol-1"})))
        .unwrap();

    assert_eq!(book.chapters.len(), 2);
    for chapter in &book.chapters {
        assert_eq!(chapter.get("book_ref"), Some(&json!("vol-1")));
        assert!(!chapter.contains_key("__updated_at"));
    }
}

#[test]
fn collection_association_without_matches_resolves_to_empty() {
    let context = test_context();
    let mut books = book_model(&context);

    let book = books
        .create(fields(json!({"title": "Dust", "chapters": "vol-9"})))
        .unwrap();

    assert!(book.chapters.is_empty());
}

#[test]
fn non_association_fields_are_left_untouched() {
    let context = test_context();
    let mut books = book_model(&context);

    let book = books
        .create(fields(json!({"title": "Dust", "genre": "sci-fi"})))
        .unwrap();

    assert_eq!(book.title, "Dust");
    assert_eq!(book.genre, "sci-fi");
}

#[test]
fn association_lookup_failures_carry_the_create_diagnostic_code() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE records;").unwrap();
    let context = Rc::new(
        PersistenceContext::new(conn)
            .register::<Author>()
            .register::<Chapter>()
            .register::<Book>(),
    );
    let mut books = book_model(&context);

    let err = books
        .create(fields(json!({
            "title": "Dust",
            "author": Uuid::new_v4().to_string()
        })))
        .unwrap_err();

    assert!(matches!(
        err,
        ModelError::Storage {
            op: Operation::Create,
            ..
        }
    ));
    assert!(err.to_string().contains("RBM0001"));
}

#[test]
fn unregistered_target_entity_is_an_explicit_error() {
    let context = test_context();

    let err = context.raw_repository("ghost").unwrap_err();
    assert!(matches!(err, RepoError::UnknownEntity(name) if name == "ghost"));
}
