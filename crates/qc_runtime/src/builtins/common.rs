use num_bigint::BigInt;
use qc_core::errcode::{self, ErrorCode};
use qc_core::{FileId, Text, Value};

use crate::errors::{FileError, messages};

/// Outcome of a builtin body: `Err` carries the error value to return.
pub type Outcome = Result<Value, Value>;

pub fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        return Err(format!("{name}: {}", messages::WRONG_ARG_COUNT));
    }
    Ok(())
}

pub fn settle(outcome: Outcome) -> Result<Value, String> {
    Ok(outcome.unwrap_or_else(|err| err))
}

pub fn fail(code: ErrorCode) -> Value {
    Value::error(code)
}

pub fn want_file(v: &Value, code: ErrorCode) -> Result<FileId, Value> {
    v.as_file().ok_or_else(|| fail(code))
}

pub fn want_text(v: &Value, code: ErrorCode) -> Result<&Text, Value> {
    v.as_text().ok_or_else(|| fail(code))
}

pub fn want_int(v: &Value, code: ErrorCode) -> Result<i64, Value> {
    v.as_i64().ok_or_else(|| fail(code))
}

/// Integer argument of any size; fractions are rejected.
pub fn want_bigint(v: &Value, code: ErrorCode) -> Result<BigInt, Value> {
    match v.as_number() {
        Some(n) if n.is_integer() => Ok(n.num().clone()),
        _ => Err(fail(code)),
    }
}

/// Null means "use the default".
pub fn optional<'a>(args: &'a [Value], at: usize) -> Option<&'a Value> {
    args.get(at).filter(|v| !v.is_null())
}

/// The table's own code for the failure.
pub fn file_fault(err: FileError) -> Value {
    fail(err.code())
}

/// OS failures keep their errno; anything else reports `code`.
pub fn io_fault(err: FileError, code: ErrorCode) -> Value {
    match err {
        FileError::Io(io) => fail(errcode::os_error(&io)),
        _ => fail(code),
    }
}

pub fn flag(b: bool) -> Value {
    Value::int(i64::from(b))
}

pub fn position(n: BigInt) -> Value {
    Value::number(qc_core::Number::from_integer(n))
}
