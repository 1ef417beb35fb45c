pub mod instances;
pub mod picking;
