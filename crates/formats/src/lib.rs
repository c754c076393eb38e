pub mod boundaries;
pub mod geotiff;
pub mod timeseries;

pub use boundaries::*;
pub use geotiff::*;
pub use timeseries::*;
