pub mod buffer;
pub mod engine;
pub mod errors;
pub mod iterators;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod tests;
