mod model;
pub use self::model::*;

mod settings;
pub use self::settings::*;

pub(crate) mod lexer;
