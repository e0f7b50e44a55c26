//! The runtime aggregate.

mod config;

pub use config::RuntimeConfig;

use qc_core::{ByteBlock, Value};

use crate::blocks::NamedBlocks;
use crate::builtins_registry::{BuiltinProvider, BuiltinRegistry, StdBuiltinProvider};
use crate::copy;
use crate::errors::CopyError;
use crate::files::FileTable;
use crate::pool::{ConstTable, LiteralTable};

pub struct Runtime {
    pub config: RuntimeConfig,
    pub consts: ConstTable,
    pub literals: LiteralTable,
    pub blocks: NamedBlocks,
    pub files: FileTable,
    builtins: BuiltinRegistry,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut builtins = BuiltinRegistry::new();
        StdBuiltinProvider.install(&mut builtins);
        Self::with_builtins(config, builtins)
    }

    pub fn with_builtins(config: RuntimeConfig, builtins: BuiltinRegistry) -> Self {
        Self {
            consts: ConstTable::new(config.const_chunk),
            literals: LiteralTable::new(config.literal_chunk),
            blocks: NamedBlocks::new(),
            files: FileTable::new(&config),
            config,
            builtins,
        }
    }

    /// Calls the builtin `name`. `Err` means the call itself was malformed;
    /// failures of the operation come back as error values.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, String> {
        let fun = self.builtins.lookup(name).ok_or_else(|| format!("Unknown builtin: {name}"))?;
        fun(self, args)
    }

    pub fn builtin_names(&self) -> Vec<String> {
        self.builtins.names()
    }

    pub fn new_block(&self, len: usize) -> ByteBlock {
        ByteBlock::alloc(len, self.config.block_chunk)
    }

    pub fn copy(
        &mut self,
        src: &Value,
        ssi: i64,
        num: i64,
        dst: &mut Value,
        dsi: i64,
    ) -> Result<(), CopyError> {
        copy::copy(self, src, ssi, num, dst, dsi)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Err(err) = self.files.flush_all() {
            tracing::warn!(%err, "flush at shutdown failed");
        }
    }
}
