pub mod avatar;
pub mod collation;
pub mod export;
pub mod raster;
pub mod reconciler;
pub mod scheduler;
