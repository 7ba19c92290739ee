mod common;

use attribution::validation::RuleKind;
use attribution::{
    map, AttributionError, FormatOptions, InclusionOptions, Metadata, Model, NumericalityOptions,
    Schema, Settings, UniquenessOptions, Value,
};

use common::library;

fn article(schema: &Schema) -> Model {
    schema
        .model("Article")
        .standard()
        .string(
            "title",
            Metadata::new()
                .required(true)
                .format(FormatOptions::with(r"\A\w").message("must start with a letter"))
                .length(4..=20),
        )
        .build()
        .expect("article model")
}

#[test]
fn reports_every_failing_rule_in_order() {
    let schema = Schema::new(Settings::default());
    let article = article(&schema);
    let record = article.construct(map! { "id" => 1 }).unwrap();
    assert!(!record.is_valid().unwrap());
    let errors = record.errors().unwrap();
    assert_eq!(
        errors.get("title"),
        [
            "can't be blank",
            "must start with a letter",
            "is too short (minimum is 4 characters)"
        ]
    );
    assert_eq!(errors.len(), 3);
    assert_eq!(errors.full_messages()[0], "Title can't be blank");
}

#[test]
fn valid_records_have_no_errors() {
    let schema = Schema::new(Settings::default());
    let article = article(&schema);
    let record = article.construct(map! { "title" => "Rework" }).unwrap();
    assert!(record.is_valid().unwrap());
    assert!(record.errors().unwrap().is_empty());

    record.set("title", "a title that is much too long to fit").unwrap();
    assert!(!record.is_valid().unwrap());
    assert_eq!(
        record.errors().unwrap().get("title"),
        ["is too long (maximum is 20 characters)"]
    );
    record.set("title", "_ok_").unwrap();
    assert!(record.is_valid().unwrap());
}

#[test]
fn untyped_metadata_declares_the_same_rules() {
    let schema = Schema::new(Settings::default());
    let metadata = Metadata::from_map(&map! {
        "required" => true,
        "format" => map! { "with" => r"\A\w", "message" => "must start with a letter" },
        "length" => "4..20",
        "doc" => "Headline",
    })
    .unwrap();
    let model = schema.model("Headline").string("title", metadata).build().unwrap();
    let kinds: Vec<RuleKind> = model.validations().iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec![RuleKind::Presence, RuleKind::Format, RuleKind::Length]);
    let record = model.new_record();
    assert!(!record.is_valid().unwrap());
    assert_eq!(record.errors().unwrap().get("title").len(), 3);
    assert_eq!(model.attribute("title").unwrap().metadata().doc_text(), Some("Headline"));
}

#[test]
fn false_leaves_a_rule_out() {
    let schema = Schema::new(Settings::default());
    let metadata = Metadata::from_map(&map! { "required" => false, "unique" => Value::Null }).unwrap();
    let model = schema.model("Loose").string("title", metadata).build().unwrap();
    assert!(model.validations().is_empty());
    assert!(model.new_record().is_valid().unwrap());
}

#[test]
fn aliases_and_full_names_both_register() {
    let schema = Schema::new(Settings::default());
    let model = schema
        .model("Strict")
        .string("code", Metadata::new().required(true).presence(Default::default()))
        .integer("copies", Metadata::new().number(true))
        .build()
        .unwrap();
    let kinds: Vec<RuleKind> = model.validations().iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec![RuleKind::Presence, RuleKind::Presence, RuleKind::Numericality]);
    let record = model.new_record();
    assert!(!record.is_valid().unwrap());
    let errors = record.errors().unwrap();
    assert_eq!(errors.get("code"), ["can't be blank", "can't be blank"]);
    assert_eq!(errors.get("copies"), ["is not a number"]);
}

#[test]
fn numericality_and_inclusion() {
    let schema = Schema::new(Settings::default());
    let model = schema
        .model("Listing")
        .float("rating", Metadata::new().numericality(NumericalityOptions::default().greater_than(0.0).less_than_or_equal_to(5.0)))
        .integer("stock", Metadata::new().numericality(NumericalityOptions::default().only_integer()))
        .string("condition", Metadata::new().inclusion(vec!["new", "used"]))
        .string("isbn", Metadata::new().length(attribution::LengthOptions::is(13)))
        .build()
        .unwrap();
    let record = model
        .construct(map! { "rating" => "7.5", "stock" => 3, "condition" => "mint", "isbn" => "123" })
        .unwrap();
    assert!(!record.is_valid().unwrap());
    let errors = record.errors().unwrap();
    assert_eq!(errors.get("rating"), ["must be less than or equal to 5"]);
    assert!(errors.get("stock").is_empty());
    assert_eq!(errors.get("condition"), ["is not included in the list"]);
    assert_eq!(errors.get("isbn"), ["is the wrong length (should be 13 characters)"]);

    record.set("rating", 4.5).unwrap();
    record.set("condition", "used").unwrap();
    record.set("isbn", "9780307463746").unwrap();
    assert!(record.is_valid().unwrap());

    let custom = InclusionOptions { message: Some("is not a condition".to_string()), ..InclusionOptions::from(vec!["new"]) };
    let model = schema.model("Auction").string("condition", Metadata::new().inclusion(custom)).build().unwrap();
    let record = model.construct(map! { "condition" => "used" }).unwrap();
    assert!(!record.is_valid().unwrap());
    assert_eq!(record.errors().unwrap().get("condition"), ["is not a condition"]);
}

#[test]
fn uniqueness_asks_the_models_finder() {
    let library = library();
    library.store.insert("Member", map! { "id" => 1, "email" => "jason@example.com" });
    let member = library
        .schema
        .model("Member")
        .identity()
        .string("email", Metadata::new().unique(true))
        .finder(library.store.clone())
        .build()
        .unwrap();
    let taken = member.construct(map! { "id" => 2, "email" => "jason@example.com" }).unwrap();
    assert!(!taken.is_valid().unwrap());
    assert_eq!(taken.errors().unwrap().get("email"), ["has already been taken"]);

    // the stored record itself is not a conflict
    let stored = member.construct(map! { "id" => 1, "email" => "jason@example.com" }).unwrap();
    assert!(stored.is_valid().unwrap());
    let fresh = member.construct(map! { "id" => 3, "email" => "david@example.com" }).unwrap();
    assert!(fresh.is_valid().unwrap());

    let scoped = library
        .schema
        .model("Seat")
        .identity()
        .integer("row", Metadata::new())
        .integer("number", Metadata::new().uniqueness(UniquenessOptions { scope: vec!["row".to_string()], message: None }))
        .finder(library.store.clone())
        .build()
        .unwrap();
    library.store.insert("Seat", map! { "id" => 1, "row" => 1, "number" => 7 });
    let other_row = scoped.construct(map! { "id" => 2, "row" => 2, "number" => 7 }).unwrap();
    assert!(other_row.is_valid().unwrap());
    let same_row = scoped.construct(map! { "id" => 3, "row" => 1, "number" => 7 }).unwrap();
    assert!(!same_row.is_valid().unwrap());
}

#[test]
fn merged_errors_accumulate_until_the_next_check() {
    let schema = Schema::new(Settings::default());
    let article = article(&schema);
    let record = article.construct(map! { "title" => "Rework" }).unwrap();
    record
        .merge_errors(&map! { "title" => "is reserved", "base" => vec!["is locked", "is archived"] })
        .unwrap();
    let errors = record.errors().unwrap();
    assert_eq!(errors.get("title"), ["is reserved"]);
    assert_eq!(errors.get("base"), ["is locked", "is archived"]);
    assert_eq!(errors.len(), 3);
    assert!(record.is_valid().unwrap());
    assert!(record.errors().unwrap().is_empty());
}

#[test]
fn invalid_rule_configuration_fails_the_declaration() {
    let schema = Schema::new(Settings::default());
    let err = schema
        .model("Broken")
        .string("title", Metadata::new().format(FormatOptions::default()))
        .build()
        .unwrap_err();
    assert!(matches!(err, AttributionError::Definition(_)));
    let err = schema
        .model("Broken")
        .string("title", Metadata::new().format(FormatOptions::with("(unclosed")))
        .build()
        .unwrap_err();
    assert!(matches!(err, AttributionError::Definition(_)));
    assert!(schema.get("Broken").is_none());
    let err = Metadata::from_map(&map! { "length" => true, "inclusion" => 5 }).unwrap_err();
    assert!(matches!(err, AttributionError::Definition(_)));
}

#[test]
fn foreign_keys_carry_belongs_to_metadata() {
    let library = library();
    let review = library
        .schema
        .model("Review")
        .identity()
        .belongs_to("book", Metadata::new().required(true))
        .build()
        .unwrap();
    let record = review.new_record();
    assert!(!record.is_valid().unwrap());
    assert_eq!(record.errors().unwrap().full_messages(), vec!["Book can't be blank"]);
    record.set("book", map! { "id" => 4 }).unwrap();
    assert!(record.is_valid().unwrap());
}

#[test]
fn rules_without_anything_to_check_fail_the_declaration() {
    let schema = Schema::new(Settings::default());
    for key in ["length", "inclusion", "format"] {
        let metadata = Metadata::from_map(&map! { key => true }).unwrap();
        let err = schema.model("Vague").string("title", metadata).build().unwrap_err();
        assert!(matches!(err, AttributionError::Definition(_)), "{key} accepted without options");
    }
    let err = schema
        .model("Vague")
        .string("tags", Metadata::new().inclusion(Vec::<&str>::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, AttributionError::Definition(_)));
    assert!(schema.get("Vague").is_none());
}

#[test]
fn format_checks_with_and_without_together() {
    let schema = Schema::new(Settings::default());
    let options = FormatOptions {
        with: Some(r"\A[a-z]+\z".to_string()),
        without: Some("admin".to_string()),
        message: None,
    };
    let account = schema
        .model("Account")
        .string("login", Metadata::new().format(options))
        .build()
        .unwrap();
    let record = account.construct(map! { "login" => "jason" }).unwrap();
    assert!(record.is_valid().unwrap());

    record.set("login", "superadmin").unwrap();
    assert!(!record.is_valid().unwrap());
    assert_eq!(record.errors().unwrap().get("login"), ["is invalid"]);

    record.set("login", "Jason").unwrap();
    assert!(!record.is_valid().unwrap());

    let blocked = schema
        .model("Alias")
        .string("name", Metadata::new().format(FormatOptions::without(r"\s")))
        .build()
        .unwrap();
    let record = blocked.construct(map! { "name" => "two words" }).unwrap();
    assert!(!record.is_valid().unwrap());
    record.set("name", "one").unwrap();
    assert!(record.is_valid().unwrap());
}
