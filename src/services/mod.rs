pub mod averages;

pub use averages::{refresh_average_cost, refresh_average_rating};
