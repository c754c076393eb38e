//! Time series chart for the region the user clicked.

pub mod model;
pub mod panel;
pub mod surface;

pub use model::*;
pub use panel::*;
pub use surface::*;
