use qc_core::{FastHashMap, Value};

use super::Runtime;
use super::builtins;

pub type BuiltinFn = fn(&mut Runtime, &[Value]) -> Result<Value, String>;

pub struct BuiltinRegistry {
    entries: Vec<(String, BuiltinFn)>,
    index: FastHashMap<String, usize>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new(), index: FastHashMap::default() }
    }

    /// Registers `fun` under `name`, replacing an earlier registration.
    pub fn register(&mut self, name: &str, fun: BuiltinFn) {
        match self.index.get(name) {
            Some(&at) => self.entries[at].1 = fun,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), fun));
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinFn> {
        self.index.get(name).map(|&at| self.entries[at].1)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub trait BuiltinProvider {
    fn install(&self, registry: &mut BuiltinRegistry);
}

pub struct StdBuiltinProvider;

impl BuiltinProvider for StdBuiltinProvider {
    fn install(&self, registry: &mut BuiltinRegistry) {
        // files
        registry.register("fopen", builtins::builtin_fopen);
        registry.register("fpathopen", builtins::builtin_fpathopen);
        registry.register("freopen", builtins::builtin_freopen);
        registry.register("fclose", builtins::builtin_fclose);
        registry.register("fflush", builtins::builtin_fflush);
        registry.register("fputc", builtins::builtin_fputc);
        registry.register("fputs", builtins::builtin_fputs);
        registry.register("fputstr", builtins::builtin_fputstr);
        registry.register("fgetc", builtins::builtin_fgetc);
        registry.register("fgets", builtins::builtin_fgets);
        registry.register("fgetline", builtins::builtin_fgetline);
        registry.register("fgetstr", builtins::builtin_fgetstr);
        registry.register("fgetfield", builtins::builtin_fgetfield);
        registry.register("fgetfile", builtins::builtin_fgetfile);
        registry.register("ungetc", builtins::builtin_ungetc);
        registry.register("ftell", builtins::builtin_ftell);
        registry.register("fseek", builtins::builtin_fseek);
        registry.register("fsize", builtins::builtin_fsize);
        registry.register("feof", builtins::builtin_feof);
        registry.register("ferror", builtins::builtin_ferror);
        registry.register("isatty", builtins::builtin_isatty);
        registry.register("rewind", builtins::builtin_rewind);
        registry.register("files", builtins::builtin_files);
        registry.register("search", builtins::builtin_search);
        registry.register("rsearch", builtins::builtin_rsearch);
        // blocks
        registry.register("blk", builtins::builtin_blk);
        registry.register("blkfree", builtins::builtin_blkfree);
        registry.register("blocks", builtins::builtin_blocks);
        registry.register("copy", builtins::builtin_copy);
        registry.register("blkcpy", builtins::builtin_blkcpy);
    }
}
