pub mod model;
pub mod repository;
pub mod service;
pub mod valuation;

pub use model::*;
pub use repository::{CollateralRepository, PgCollateralRepository};
pub use service::CollateralService;
