//! Runtime configuration.

use qc_core::block::DEFAULT_CHUNK;

/// Runtime configuration options.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    /// Upper bound on simultaneously open files, standard streams included.
    pub max_files: usize,
    /// Bytes requested per read when a bounded reader fills its buffer.
    pub read_chunk: usize,
    pub block_chunk: usize,
    pub const_chunk: usize,
    pub literal_chunk: usize,
    /// Adopt descriptors inherited from the parent process at startup.
    pub probe_inherited: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_files: 20,
            read_chunk: 1024,
            block_chunk: DEFAULT_CHUNK,
            const_chunk: 400,
            literal_chunk: 100,
            probe_inherited: false,
        }
    }
}
