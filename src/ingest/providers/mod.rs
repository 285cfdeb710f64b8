pub mod noaa;
pub mod usgs;

pub use noaa::NoaaProvider;
pub use usgs::UsgsProvider;
