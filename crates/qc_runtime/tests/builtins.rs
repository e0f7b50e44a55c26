use std::fs;

use qc_core::ByteBlock;
use qc_core::errcode::{self, ErrorCode};
use qc_runtime::{Data, Runtime, RuntimeConfig, Value};

fn code(v: &Value) -> Option<ErrorCode> {
    v.as_error()
}

fn s(text: &str) -> Value {
    Value::str(text)
}

#[test]
fn every_registered_builtin_is_callable_by_name() {
    let rt = Runtime::new();
    let names = rt.builtin_names();
    for name in ["fopen", "fgetline", "fgetfield", "search", "blk", "copy", "blkcpy"] {
        assert!(names.iter().any(|n| n == name), "{name} missing");
    }
}

#[test]
fn malformed_calls_are_errors_not_values() {
    let mut rt = Runtime::new();
    assert!(rt.call("nosuch", &[]).unwrap_err().contains("Unknown builtin"));
    assert!(rt.call("fgetc", &[]).unwrap_err().contains("Wrong number of arguments"));
}

#[test]
fn failures_come_back_as_error_values() {
    let mut rt = Runtime::new();
    let v = rt.call("fopen", &[Value::int(3)]).unwrap();
    assert_eq!(code(&v), Some(errcode::E_FOPEN_1));
    let v = rt.call("fopen", &[s("x"), s("rw")]).unwrap();
    assert_eq!(code(&v), Some(errcode::E_FOPEN_2));
    let v = rt.call("fopen", &[s("/definitely/not/here"), s("r")]).unwrap();
    assert_eq!(code(&v).map(|c| c.is_os()), Some(true));
    let v = rt.call("fgetc", &[s("not a file")]).unwrap();
    assert_eq!(code(&v), Some(errcode::E_FGETC_1));
}

#[test]
fn file_round_trip_through_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("io.txt");
    let mut rt = Runtime::new();

    let f = rt.call("fopen", &[s(path.to_str().unwrap()), s("w+")]).unwrap();
    assert!(f.as_file().is_some());
    assert!(rt.call("fputs", &[f.clone(), s("alpha\n"), s("beta gamma\n")]).unwrap().is_null());
    rt.call("fputstr", &[f.clone(), s("z")]).unwrap();
    rt.call("rewind", &[f.clone()]).unwrap();

    assert_eq!(rt.call("fgets", &[f.clone()]).unwrap(), s("alpha\n"));
    assert_eq!(rt.call("fgetfield", &[f.clone()]).unwrap(), s("beta"));
    assert_eq!(rt.call("fgetline", &[f.clone()]).unwrap(), s("gamma"));
    assert_eq!(rt.call("fgetstr", &[f.clone()]).unwrap(), s("z"));
    assert!(rt.call("fgetc", &[f.clone()]).unwrap().is_null());
    assert_eq!(rt.call("feof", &[f.clone()]).unwrap(), Value::int(1));
    assert_eq!(rt.call("fsize", &[f.clone()]).unwrap(), Value::int(19));

    rt.call("fseek", &[f.clone(), Value::int(6)]).unwrap();
    assert_eq!(rt.call("ftell", &[f.clone()]).unwrap(), Value::int(6));
    assert_eq!(rt.call("fgetfile", &[f.clone()]).unwrap(), Value::text("beta gamma\nz\0".into()));

    assert!(rt.call("fclose", &[f.clone()]).unwrap().is_null());
    assert!(rt.call("fclose", &[f]).unwrap().is_error());
}

#[test]
fn search_defaults_follow_the_current_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hay.txt");
    fs::write(&path, "one two one two").unwrap();
    let mut rt = Runtime::new();
    let f = rt.call("fopen", &[s(path.to_str().unwrap())]).unwrap();

    assert_eq!(rt.call("search", &[f.clone(), s("two")]).unwrap(), Value::int(4));
    let second = rt.call("search", &[f.clone(), s("two"), Value::int(5)]).unwrap();
    assert_eq!(second, Value::int(12));
    assert!(rt.call("search", &[f.clone(), s("two"), Value::int(5), Value::int(14)]).unwrap().is_null());
    assert_eq!(rt.call("search", &[f.clone(), s("one"), Value::int(-5)]).unwrap(), Value::NULL);
    assert_eq!(rt.call("rsearch", &[f.clone(), s("one"), Value::NULL]).unwrap(), Value::int(8));
    assert_eq!(rt.call("rsearch", &[f.clone(), s("one"), Value::int(0), Value::int(11)]).unwrap(), Value::int(8));
    assert_eq!(rt.call("rsearch", &[f.clone(), s("one"), Value::int(0), Value::int(10)]).unwrap(), Value::int(0));
    assert_eq!(code(&rt.call("search", &[f, Value::int(1)]).unwrap()), Some(errcode::E_SEARCH_2));
}

#[test]
fn files_lists_open_entries() {
    let mut rt = Runtime::new();
    assert_eq!(rt.call("files", &[]).unwrap(), Value::int(20));
    assert_eq!(rt.call("files", &[Value::int(1)]).unwrap(), Value::file(qc_runtime::FileId::STDOUT));
    assert!(rt.call("files", &[Value::int(7)]).unwrap().is_null());
    assert_eq!(code(&rt.call("files", &[s("x")]).unwrap()), Some(errcode::E_FILES));
    assert_eq!(rt.call("isatty", &[Value::int(0)]).unwrap(), Value::int(0));
}

#[test]
fn blk_creates_and_resizes() {
    let mut rt = Runtime::new();
    let anon = rt.call("blk", &[Value::int(10), Value::int(8)]).unwrap();
    let b = anon.as_block().unwrap();
    assert_eq!((b.len(), b.capacity(), b.chunk()), (10, 16, 8));

    let named = rt.call("blk", &[s("buf"), Value::int(4)]).unwrap();
    let id = named.as_named_block().unwrap();
    let again = rt.call("blk", &[s("buf"), Value::int(40)]).unwrap();
    assert_eq!(again.as_named_block(), Some(id));
    assert_eq!(rt.blocks.get(id).unwrap().block().unwrap().len(), 40);
    assert_eq!(rt.call("blocks", &[]).unwrap(), Value::int(1));
    assert_eq!(rt.call("blocks", &[Value::int(i64::from(id.0))]).unwrap(), named);

    assert_eq!(code(&rt.call("blk", &[Value::int(-1)]).unwrap()), Some(errcode::E_BLK_2));
    assert_eq!(code(&rt.call("blk", &[Value::int(1), s("c")]).unwrap()), Some(errcode::E_BLK_3));
}

#[test]
fn named_blocks_take_the_configured_chunk() {
    let config = RuntimeConfig { block_chunk: 32, ..RuntimeConfig::default() };
    let mut rt = Runtime::with_config(config);
    let named = rt.call("blk", &[s("cfg"), Value::int(4)]).unwrap();
    let id = named.as_named_block().unwrap();
    let block = rt.blocks.get(id).unwrap().block().unwrap();
    assert_eq!((block.chunk(), block.capacity()), (32, 32));

    let sized = rt.call("blk", &[s("own"), Value::int(4), Value::int(8)]).unwrap();
    let id = sized.as_named_block().unwrap();
    assert_eq!(rt.blocks.get(id).unwrap().block().unwrap().chunk(), 8);
}

#[test]
fn blkfree_by_name_and_id() {
    let mut rt = Runtime::new();
    rt.call("blk", &[s("a")]).unwrap();
    rt.call("blk", &[s("b")]).unwrap();
    assert!(rt.call("blkfree", &[s("a")]).unwrap().is_null());
    assert!(rt.call("blkfree", &[Value::int(1)]).unwrap().is_null());
    assert_eq!(rt.call("blocks", &[]).unwrap(), Value::int(0));
    assert_eq!(code(&rt.call("blkfree", &[s("zz")]).unwrap()), Some(errcode::E_BLKFREE_1));
    assert_eq!(code(&rt.call("blkfree", &[Value::int(9)]).unwrap()), Some(errcode::E_BLKFREE_3));
    assert_eq!(code(&rt.call("blkfree", &[Value::NULL]).unwrap()), Some(errcode::E_BLKFREE_4));
}

#[test]
fn copy_returns_the_updated_destination() {
    let mut rt = Runtime::new();
    let dst = Value::block(ByteBlock::from_bytes(b"......", 4));
    let out = rt.call("copy", &[s("ab"), dst.clone(), Value::int(0), Value::int(2), Value::int(1)]).unwrap();
    assert_eq!(out.as_block().unwrap().as_slice(), b".ab\0..");
    assert_eq!(dst.as_block().unwrap().as_slice(), b"......");

    let out = rt.call("blkcpy", &[dst, s("xyz"), Value::int(2), Value::int(3), Value::int(1)]).unwrap();
    assert_eq!(out.as_block().unwrap().as_slice(), b"...yz\0");

    let err = rt.call("copy", &[s("ab"), Value::assoc(qc_core::Assoc::new())]).unwrap();
    assert_eq!(code(&err), Some(errcode::E_COPY_11));
    let err = rt.call("copy", &[s("ab"), Value::NULL, Value::int(-2)]).unwrap();
    assert_eq!(code(&err), Some(errcode::E_COPY_01));
}

#[test]
fn copy_into_named_block_is_visible_through_the_registry() {
    let mut rt = Runtime::new();
    let nb = rt.call("blk", &[s("shared"), Value::int(0), Value::int(4)]).unwrap();
    let out = rt.call("copy", &[s("hey"), nb.clone()]).unwrap();
    assert!(matches!(out.data, Data::NamedBlock(_)));
    let id = nb.as_named_block().unwrap();
    assert_eq!(rt.blocks.get(id).unwrap().block().unwrap().as_slice(), b"hey\0");
}
