pub mod http_remote;

pub use http_remote::{HttpRemote, DEFAULT_API_BASE};
