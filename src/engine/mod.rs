pub mod hints;
pub mod scoring;
