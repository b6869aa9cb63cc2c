//! File handles and opening modes

mod handle;
mod mode;

pub use handle::{FileHandle, Lines, Whence};
pub use mode::OpenMode;
