pub mod detect;
pub mod draw;
pub mod estimate;
pub mod landmark;
pub mod pipeline;
pub mod presence;
pub mod shapes;
