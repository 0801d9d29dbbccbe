pub mod ast;
pub mod config;
pub mod doc;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use ast::*;
pub use config::*;
pub use doc::*;
pub use error::*;
pub use traits::*;
pub use types::*;
