pub mod records;
pub mod system;

pub use records::*;
pub use system::*;
