use super::schema::{DefaultValue, FieldDef, ResourceSchema};

pub const SKILL_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

pub const COURSE_SCHEMA: ResourceSchema = ResourceSchema {
    collection: "courses",
    label: "Course",
    fields: &[
        FieldDef::text("title").required(),
        FieldDef::text("description").required(),
        FieldDef::number("weeks").required(),
        FieldDef::number("tuition").required(),
        FieldDef::text("minimumSkill").required().choices(SKILL_LEVELS),
        FieldDef::boolean("scholarshipAvailable").default_to(DefaultValue::Bool(false)),
        FieldDef::id("bootcamp").required().system(),
        FieldDef::id("user").required().system(),
    ],
    unique_together: &[],
};
