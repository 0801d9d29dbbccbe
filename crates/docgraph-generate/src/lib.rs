pub mod diagnostics;
pub mod filter;
pub mod lint;
pub mod path_resolver;
pub mod pipeline;
pub mod regenerate;
pub mod resolver;

pub use diagnostics::*;
pub use filter::*;
pub use lint::*;
pub use path_resolver::*;
pub use pipeline::*;
pub use regenerate::*;
pub use resolver::*;
