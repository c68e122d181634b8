mod output;

pub use output::{OutputPaths, write_atomic};
