use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use attribution::coerce::Coercer;
use attribution::temporal::LocalZone;
use attribution::{map, AttributeType, Metadata, Model, Schema, Settings, Value};

const REWORK: &str = r#"{
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

fn book(schema: &Schema) -> Model {
    schema
        .model("Chapter")
        .identity()
        .integer("number", Metadata::new().required(true))
        .string("title", Metadata::new())
        .integer("page_number", Metadata::new())
        .belongs_to("book", Metadata::new())
        .build()
        .unwrap();
    schema
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
        .has_many("chapters", Metadata::new())
        .build()
        .unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let schema = Schema::new(Settings { utc_offset: Some(-18000), ..Settings::default() });
    let book = book(&schema);
    c.bench_function("construct from json", |b| {
        b.iter(|| book.construct(black_box(REWORK)).unwrap())
    });

    let record = book.construct(REWORK).unwrap();
    let exported = record.export_attributes().unwrap();
    c.bench_function("export and cast", |b| {
        b.iter(|| book.cast(black_box(exported.clone())).unwrap())
    });

    let coercer = Coercer::new(LocalZone::from_offset_seconds(-18000).unwrap());
    let date = Value::Map(map! { "year" => "2013", "month" => "5", "day" => "" });
    c.bench_function("structured date", |b| {
        b.iter(|| coercer.coerce(AttributeType::Date, black_box(date.clone())).unwrap())
    });
    let time = Value::Map(map! {
        "year" => "2013", "month" => "03", "day" => "17",
        "hour" => "07", "min" => "30", "sec" => "11", "utc_offset" => "3600",
    });
    c.bench_function("structured time", |b| {
        b.iter(|| coercer.coerce(AttributeType::Time, black_box(time.clone())).unwrap())
    });
    c.bench_function("free-form date", |b| {
        b.iter(|| coercer.coerce(AttributeType::Date, black_box(Value::from("March 9, 2010"))).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
