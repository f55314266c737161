mod build;
mod doctor;
mod engines;
mod render;

pub use build::build;
pub use doctor::doctor;
pub use engines::engines;
pub use render::render;
