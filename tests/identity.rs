mod common;

use attribution::{map, AttributeType, Metadata, Value};

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use common::library;

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn same_model_and_id_are_equal() {
    let library = library();
    let a = library.book.construct(map! { "id" => 1, "title" => "Rework" }).unwrap();
    let b = library.book.construct(map! { "id" => "1", "title" => "Remote" }).unwrap();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    let set: HashSet<_> = [a.clone(), b.clone()].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn different_ids_or_models_are_not_equal() {
    let library = library();
    let a = library.book.construct(map! { "id" => 1, "title" => "Rework" }).unwrap();
    let c = library.book.construct(map! { "id" => 2, "title" => "Rework" }).unwrap();
    assert_ne!(a, c);
    let author = library.author.construct(map! { "id" => 1 }).unwrap();
    assert_ne!(a, author);
    let ebook = library.schema.subclass("EBook", &library.book).build().unwrap();
    let e = ebook.construct(map! { "id" => 1 }).unwrap();
    assert_ne!(a, e);
}

#[test]
fn unidentified_records_only_equal_themselves() {
    let library = library();
    let a = library.book.construct(map! { "title" => "Rework" }).unwrap();
    let b = library.book.construct(map! { "title" => "Rework" }).unwrap();
    assert_eq!(a.id(), None);
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    let set: HashSet<_> = [a.clone(), b.clone(), a.clone()].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn equality_follows_the_current_id() {
    let library = library();
    let a = library.book.construct(map! { "id" => 1 }).unwrap();
    let b = library.book.construct(map! { "id" => 2 }).unwrap();
    assert_ne!(a, b);
    b.set("id", 1).unwrap();
    assert_eq!(a, b);
}

#[test]
fn to_param_renders_the_id() {
    let library = library();
    let book = library.book.construct(map! { "id" => 42 }).unwrap();
    assert_eq!(book.to_param(), Some("42".to_string()));
    assert_eq!(library.book.new_record().to_param(), None);
}

#[test]
fn mixins_declare_their_attributes() {
    let library = library();
    let post = library
        .schema
        .model("Post")
        .standard()
        .string("body", Metadata::new())
        .build()
        .unwrap();
    assert_eq!(post.attribute_names(), vec!["id", "created_at", "updated_at", "body"]);
    assert_eq!(post.attribute("id").map(|a| a.ty()), Some(AttributeType::Integer));
    assert_eq!(post.attribute("created_at").map(|a| a.ty()), Some(AttributeType::Time));

    // an empty string is not a time
    assert!(post.construct(map! { "id" => 1, "updated_at" => "" }).is_err());
    let record = post
        .construct(map! { "id" => 1, "created_at" => "2013-02-20T05:39:45-05:00" })
        .unwrap();
    assert_eq!(record.get("updated_at").unwrap(), Value::Null);
    assert_eq!(record.get("created_at").unwrap().to_string(), "2013-02-20 05:39:45 -0500");
}
