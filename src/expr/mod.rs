mod model;
pub use self::model::*;

mod eval;
pub use self::eval::*;

pub(crate) mod parser;
