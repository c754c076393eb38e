pub mod fetch;
pub mod request;

pub use fetch::*;
pub use request::*;
