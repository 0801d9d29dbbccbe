pub mod coverage;
pub mod query;
pub mod store;

pub use coverage::*;
pub use query::*;
pub use store::*;
