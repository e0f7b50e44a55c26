//! qcalc runtime state: interned pools, named blocks, the file table and
//! the copy gateway that moves data between them.

#![allow(clippy::collapsible_if)]
#![allow(clippy::new_without_default)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::len_zero)]

pub mod blocks;
pub mod copy;
pub mod errors;
pub mod files;
pub mod pool;

mod builtins;
pub mod builtins_registry;
mod runtime;

pub use blocks::{NamedBlock, NamedBlocks};
pub use builtins_registry::{BuiltinFn, BuiltinProvider, BuiltinRegistry, StdBuiltinProvider};
pub use copy::{blk_cmp, blk_move, blk_set, copy};
pub use errors::{BlockError, CopyError, FileError};
pub use files::{Action, FileEntry, FileTable, OpenMode, ReadFlags};
pub use pool::{ConstTable, InternPool, Internable, LiteralTable};
pub use runtime::Runtime;
pub use runtime::RuntimeConfig;

pub use qc_core::{Data, FileId, Kind, NamedBlockId, Number, Subtype, Text, Value};
