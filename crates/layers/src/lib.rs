pub mod boundaries;
pub mod interaction;
pub mod layer;
pub mod legend;
pub mod raster;
pub mod symbology;

pub use layer::*;
