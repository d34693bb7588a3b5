pub mod io;
pub mod player;
pub mod swf;
pub mod utils;

pub use player::{Player, ScriptError};
pub use swf::file::SwfFile;
