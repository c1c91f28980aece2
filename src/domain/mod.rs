pub mod kind;
pub mod record;
pub mod value;

pub use kind::*;
pub use record::*;
pub use value::*;
