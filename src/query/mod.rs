//! Advanced results: request parameters to a filtered, sorted, paginated read

pub mod error;
pub mod order;
pub mod params;
pub mod results;
pub mod types;

pub use error::QueryError;
pub use params::{QueryParser, RawParams};
pub use results::{paginate, populate_documents, AdvancedResults, Paginated, Relation};
pub use types::{
    CompareOp, Condition, Filter, FindQuery, PageRef, Pagination, Projection, QuerySpec, SortDirection, SortKey,
};
