//! Attribution – declarative, typed attributes and lazily resolved associations
//! for plain data records.
//!
//! A [`model::Model`] declares named, typed attributes and relationships to
//! other models. Records are constructed from untyped input (a map or JSON
//! text); every value is coerced to the declared type of its attribute, and
//! related records are resolved on demand through finder capabilities the
//! related model exposes.
//!
//! ## Modules
//! * [`datatype`] – The [`datatype::AttributeType`] enum, the dynamic
//!   [`datatype::Value`] used for input and stored values, and the
//!   [`datatype::Decimal`] wrapper.
//! * [`coerce`] – One coercion policy per attribute type, including structured
//!   date/time input that stops at the first blank component.
//! * [`temporal`] – Free-form date and time parsing and the table of canonical
//!   time zone names.
//! * [`attribute`] – Attribute descriptors, their typed [`attribute::Metadata`],
//!   and the ordered per-model registry.
//! * [`association`] – `belongs_to`/`has_many` descriptors, naming conventions
//!   and the [`association::FindById`]/[`association::FindAll`] capabilities.
//! * [`validation`] – Rules derived from attribute metadata and the
//!   [`validation::Errors`] they report into.
//! * [`model`] / [`schema`] – Declaration through a [`model::ModelBuilder`] and
//!   the registry binding model names to models.
//! * [`record`] – Instances: construction, export, and association caching.
//! * [`identity`] – The `id` and timestamp mixins, identity based equality.
//! * [`config`] – [`config::Settings`] and logging initialisation.
//!
//! ## Coercion
//! Null stays null for every scalar type; arrays and maps turn it into an empty
//! collection. Booleans are true for `y`, `yes`, `t` and `true` in any case, and
//! for numbers equal to 1. Integers and floats read the leading numeric prefix
//! of a string. Decimals are parsed from text, never through a binary float.
//! Dates and times accept their own kinds, free-form text, or a map of
//! components such as `{year, month, day}`, where the first blank component
//! ends the list and the rest fall back to their minimum.
//!
//! ## Associations
//! A `belongs_to` association owns an integer foreign key `<name>_id`. The key
//! and the linked record are alternative sources of truth: assigning one drops
//! the other, and reading the missing one derives it again, from the linked
//! record's id or through the related model's find-by-id capability. A
//! `has_many` collection is fetched once through the related model's
//! find-all capability, filtered by `<owner>_id`, and cached; filtered queries
//! are never cached. Related models are named by string and looked up in the
//! [`schema::Schema`] on first use, so models may refer to each other in any
//! order. Turning autoload off for a model keeps its reads from calling any
//! finder.
//!
//! ## Quick Start
//! ```
//! use attribution::{map, Metadata, Schema, Settings};
//! let schema = Schema::new(Settings::default());
//! let book = schema
//!     .model("Book")
//!     .identity()
//!     .string("title", Metadata::new().required(true))
//!     .decimal("price", Metadata::new())
//!     .date("published_on", Metadata::new())
//!     .boolean("ebook_available", Metadata::new())
//!     .build()?;
//! let rework = book.construct(map! {
//!     "id" => 1,
//!     "title" => "Rework",
//!     "price" => "22.00",
//!     "published_on" => "March 9, 2010",
//!     "ebook_available" => "yes",
//! })?;
//! assert_eq!(rework.id(), Some(1));
//! assert_eq!(rework.get("price")?.to_string(), "22.00");
//! assert!(rework.is("ebook_available")?);
//! assert!(rework.is_valid()?);
//! # Ok::<(), attribution::AttributionError>(())
//! ```
//!
//! ## Threads
//! Models and records are shared handles (`Arc`) and may cross threads. Each
//! record guards its values and association cache with its own mutex.

pub mod association;
pub mod attribute;
pub mod coerce;
pub mod config;
pub mod datatype;
pub mod error;
pub mod identity;
pub mod model;
pub mod record;
pub mod schema;
pub mod temporal;
pub mod validation;

pub use association::{AssociationDescriptor, AssociationKind, FindAll, FindById};
pub use attribute::{AttributeDescriptor, Metadata};
pub use config::Settings;
pub use datatype::{AttributeType, Decimal, Map, Value};
pub use error::{AttributionError, Result};
pub use model::{Model, ModelBuilder};
pub use record::Record;
pub use schema::Schema;
pub use temporal::TimeZone;
pub use validation::{
    Errors, FormatOptions, InclusionOptions, LengthOptions, NumericalityOptions, PresenceOptions,
    UniquenessOptions,
};
