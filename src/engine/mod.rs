mod model;
pub use self::model::*;

mod apply;
pub use self::apply::apply_all;

mod scope;
