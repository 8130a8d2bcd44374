pub mod media;
pub mod series;
