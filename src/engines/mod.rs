pub mod coupling;
pub mod drift;
pub mod history;
pub mod risk;
pub mod secondary;
pub mod siblings;
pub mod static_import;
pub mod volatility;
