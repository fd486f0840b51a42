// handlers/mod.rs - One module per resource
//
// Reads are public unless noted; guards are attached per route in app.rs
pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;
pub mod utils;
