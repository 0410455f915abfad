pub mod params;
pub mod trend_service;
