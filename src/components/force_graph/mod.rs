mod component;
mod render;
mod simulation;
mod state;
mod types;
mod view;

pub use component::ForceGraphCanvas;
pub use types::display_name;
