use super::schema::{FieldDef, ResourceSchema};

pub const REVIEW_SCHEMA: ResourceSchema = ResourceSchema {
    collection: "reviews",
    label: "Review",
    fields: &[
        FieldDef::text("title").required().max_len(100),
        FieldDef::text("text").required(),
        FieldDef::number("rating").required().range(1.0, 10.0),
        FieldDef::id("bootcamp").required().system(),
        FieldDef::id("user").required().system(),
    ],
    unique_together: &["bootcamp", "user"],
};
