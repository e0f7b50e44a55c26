//! Core value types for the qcalc runtime.
//!
//! This crate holds the leaves of the value model, independent of any
//! runtime state:
//! - `Value` - tagged value with a protection `Subtype`
//! - `Number` / `Complex` - shared rational payloads
//! - `Text` - shared byte-string payload
//! - `ByteBlock` - exclusively owned growable byte buffer
//! - `byteorder` - the only place host endianness is consulted

pub mod byteorder;
pub mod block;
pub mod errcode;
pub mod fatal;
pub mod number;
pub mod subtype;
pub mod text;
pub mod value;

pub use block::{ByteBlock, GrowthDenied};
pub use errcode::ErrorCode;
pub use number::{Complex, Number, NumberError};
pub use subtype::Subtype;
pub use text::{Text, nul_run};
pub use value::{Assoc, Data, FileId, Kind, List, Matrix, NamedBlockId, Octet, OctetTarget, Value};

pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;
pub type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;
