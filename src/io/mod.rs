pub mod bits;
pub mod reader;

pub use bits::SwfBitReader;
pub use reader::SwfRead;
