pub mod generator;

pub use generator::DatasetGenerator;
