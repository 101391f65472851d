pub mod border;
pub mod floodfill;
pub mod key_color;

pub use floodfill::{FloodFill, RunReport};
pub use key_color::{detect_key_color, KeyColor};
