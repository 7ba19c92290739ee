//! Shared fixtures: a small library schema backed by an in-memory store that
//! counts how often it is asked for records.
#![allow(dead_code)]

use attribution::{FindAll, FindById, Map, Metadata, Model, Record, Result, Schema, Settings, Value};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, Vec<Map>>>,
    finds: AtomicUsize,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn insert(&self, model: &str, row: Map) {
        self.rows
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push(row);
    }
    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
    fn rows(&self, model: &str) -> Vec<Map> {
        self.rows.lock().unwrap().get(model).cloned().unwrap_or_default()
    }
}

impl FindById for MemoryStore {
    fn find(&self, model: &Model, id: i64) -> Result<Option<Record>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.rows(model.name())
            .into_iter()
            .find(|row| row.get("id") == Some(&Value::Integer(id)))
            .map(|row| model.construct(row))
            .transpose()
    }
}

impl FindAll for MemoryStore {
    fn all(&self, model: &Model, filter: &Map) -> Result<Vec<Record>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.rows(model.name())
            .into_iter()
            .filter(|row| {
                filter
                    .iter()
                    .all(|(key, value)| row.get(key).unwrap_or(&Value::Null) == value)
            })
            .map(|row| model.construct(row))
            .collect()
    }
}

pub struct Library {
    pub schema: Schema,
    pub store: Arc<MemoryStore>,
    pub author: Model,
    pub book: Model,
    pub chapter: Model,
    pub page: Model,
}

/// Eastern standard time as the local zone, so wall-clock input is stable.
pub fn settings() -> Settings {
    Settings {
        utc_offset: Some(-5 * 3600),
        ..Settings::default()
    }
}

pub fn library() -> Library {
    library_with(settings())
}

pub fn library_with(settings: Settings) -> Library {
    let schema = Schema::new(settings);
    let store = Arc::new(MemoryStore::default());
    // chapters refer to books and pages before either is defined
    let chapter = schema
        .model("Chapter")
        .identity()
        .integer("number", Metadata::new().required(true).doc("Starts from 1"))
        .string("title", Metadata::new())
        .integer("page_number", Metadata::new())
        .belongs_to("book", Metadata::new())
        .has_many("pages", Metadata::new())
        .finder(store.clone())
        .build()
        .expect("chapter model");
    let page = schema
        .model("Page")
        .identity()
        .integer("page_number", Metadata::new())
        .belongs_to("chapter", Metadata::new())
        .finder(store.clone())
        .build()
        .expect("page model");
    let book = schema
        .model("Book")
        .identity()
        .string("title", Metadata::new())
        .decimal("price", Metadata::new())
        .date("published_on", Metadata::new())
        .boolean("ebook_available", Metadata::new())
        .boolean("used", Metadata::new())
        .float("shipping_weight", Metadata::new())
        .timestamps()
        .time_zone("time_zone", Metadata::new())
        .belongs_to("author", Metadata::new())
        .has_many("chapters", Metadata::new())
        .finder(store.clone())
        .build()
        .expect("book model");
    let author = schema
        .model("Author")
        .identity()
        .string("first_name", Metadata::new())
        .string("last_name", Metadata::new())
        .has_many("books", Metadata::new())
        .finder(store.clone())
        .build()
        .expect("author model");
    Library { schema, store, author, book, chapter, page }
}

pub const REWORK: &str = r#"{
    "id": 1,
    "title": "Rework",
    "price": "22.00",
    "published_on": "March 9, 2010",
    "ebook_available": "yes",
    "used": "no",
    "shipping_weight": "14.4",
    "created_at": "2013-02-20 05:39:45 -0500",
    "updated_at": "2013-02-20T05:40:37-05:00",
    "time_zone": "Eastern Time (US & Canada)",
    "chapters": [
        { "number": "1", "title": "Introduction", "page_number": "1" },
        { "number": "2", "title": "Takedowns", "page_number": "7" },
        { "number": "3", "title": "Go", "page_number": "29" }
    ]
}"#;
