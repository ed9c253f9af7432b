pub mod bitmap;
pub mod replacer;
