mod ball;
mod line;
mod plane;

pub use ball::*;
pub use line::*;
pub use plane::*;
