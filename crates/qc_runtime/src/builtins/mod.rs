pub(super) mod blocks;
pub(super) mod common;
pub(super) mod files;

pub use blocks::*;
pub use files::*;
