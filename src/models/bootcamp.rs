use super::schema::{DefaultValue, FieldDef, FieldKind, ResourceSchema};

pub const CAREERS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const BOOTCAMP_SCHEMA: ResourceSchema = ResourceSchema {
    collection: "bootcamps",
    label: "Bootcamp",
    fields: &[
        FieldDef::text("name").required().unique().max_len(50),
        FieldDef::text("slug").system(),
        FieldDef::text("description").required().max_len(500),
        FieldDef::text("website"),
        FieldDef::text("phone").max_len(20),
        FieldDef::text("email").email(),
        FieldDef::text("address").required(),
        FieldDef::new("location", FieldKind::Object).system(),
        FieldDef::new("careers", FieldKind::TextList).required().choices(CAREERS),
        FieldDef::number("averageRating").range(1.0, 10.0),
        FieldDef::number("averageCost"),
        FieldDef::text("photo").default_to(DefaultValue::Text("no-photo.jpg")),
        FieldDef::boolean("housing").default_to(DefaultValue::Bool(false)),
        FieldDef::boolean("jobAssistance").default_to(DefaultValue::Bool(false)),
        FieldDef::boolean("jobGuarantee").default_to(DefaultValue::Bool(false)),
        FieldDef::boolean("acceptGi").default_to(DefaultValue::Bool(false)),
        FieldDef::id("user").system(),
    ],
    unique_together: &[],
};

/// `"ModernTech Bootcamp"` -> `"moderntech-bootcamp"`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
