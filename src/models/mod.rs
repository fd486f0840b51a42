pub mod bootcamp;
pub mod course;
pub mod review;
pub mod schema;
pub mod user;

pub use bootcamp::BOOTCAMP_SCHEMA;
pub use course::COURSE_SCHEMA;
pub use review::REVIEW_SCHEMA;
pub use schema::{FieldDef, FieldKind, ResourceSchema, ValidationErrors};
pub use user::{Role, USER_SCHEMA};

/// Every resource schema, in seeding order
pub const ALL_SCHEMAS: &[&ResourceSchema] = &[&USER_SCHEMA, &BOOTCAMP_SCHEMA, &COURSE_SCHEMA, &REVIEW_SCHEMA];
