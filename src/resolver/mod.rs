// Resolver module
// Per-word source chain from preloaded audio down to on-device synthesis

pub mod chain;

pub use chain::{ChainMode, SourceChain};
