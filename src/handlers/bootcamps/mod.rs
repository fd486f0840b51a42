// Bootcamp endpoints: reads are public, writes need publisher or admin
pub mod radius;
pub mod read;
pub mod write;

pub use radius::within_radius;
pub use read::{list, show, COURSES};
pub use write::{create, remove, update};
