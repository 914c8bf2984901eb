// One board revision so far. Later ones get their own module here.
mod r1;
pub use r1::*;
