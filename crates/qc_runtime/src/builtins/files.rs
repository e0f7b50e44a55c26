use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use qc_core::errcode::*;
use qc_core::{FileId, Text, Value};

use super::super::Runtime;
use super::common::*;
use crate::errors::FileError;
use crate::files::ReadFlags;

const DEFAULT_PATH: &str = ".:./cal:~/.cal";

fn lossy(text: &Text) -> String {
    text.to_string_lossy()
}

fn mode_arg(args: &[Value], at: usize, code: ErrorCode) -> Result<String, Value> {
    match optional(args, at) {
        Some(v) => Ok(lossy(want_text(v, code)?)),
        None => Ok("r".to_string()),
    }
}

fn text_or_null(read: Result<Option<Text>, FileError>, code: ErrorCode) -> Outcome {
    match read {
        Ok(Some(text)) => Ok(Value::text(text)),
        Ok(None) => Ok(Value::NULL),
        Err(err) => Err(io_fault(err, code)),
    }
}

pub fn builtin_fopen(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fopen", args, 1, 2)?;
    settle(fopen(rt, args))
}

fn fopen(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let name = lossy(want_text(&args[0], E_FOPEN_1)?);
    let mode = mode_arg(args, 1, E_FOPEN_2)?;
    rt.files.open(&name, &mode).map(Value::file).map_err(file_fault)
}

pub fn builtin_fpathopen(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fpathopen", args, 1, 3)?;
    settle(fpathopen(rt, args))
}

fn fpathopen(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let name = lossy(want_text(&args[0], E_FPATHOPEN_1)?);
    let mode = mode_arg(args, 1, E_FPATHOPEN_1)?;
    let path = match optional(args, 2) {
        Some(v) => lossy(want_text(v, E_FPATHOPEN_1)?),
        None => std::env::var("CALCPATH").unwrap_or_else(|_| DEFAULT_PATH.to_string()),
    };
    rt.files.open_path(&name, &mode, &path).map(Value::file).map_err(|err| match err {
        FileError::BadMode(_) => fail(E_FPATHOPEN_2),
        other => file_fault(other),
    })
}

pub fn builtin_freopen(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("freopen", args, 2, 3)?;
    settle(freopen(rt, args))
}

fn freopen(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let id = want_file(&args[0], E_FREOPEN_1)?;
    let mode = lossy(want_text(&args[1], E_FREOPEN_2)?);
    let name = match optional(args, 2) {
        Some(v) => Some(lossy(want_text(v, E_FREOPEN_3)?)),
        None => None,
    };
    rt.files.reopen(id, &mode, name.as_deref()).map(Value::file).map_err(file_fault)
}

/// With no arguments closes every non-standard file.
pub fn builtin_fclose(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    settle(fclose(rt, args))
}

fn fclose(rt: &mut Runtime, args: &[Value]) -> Outcome {
    if args.is_empty() {
        rt.files.close_all().map_err(|err| io_fault(err, E_FCLOSE_1))?;
        return Ok(Value::NULL);
    }
    let ids = args.iter().map(|v| want_file(v, E_FCLOSE_1)).collect::<Result<Vec<FileId>, Value>>()?;
    for id in ids {
        rt.files.close(id).map_err(file_fault)?;
    }
    Ok(Value::NULL)
}

pub fn builtin_fflush(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    settle(fflush(rt, args))
}

fn fflush(rt: &mut Runtime, args: &[Value]) -> Outcome {
    if args.is_empty() {
        rt.files.flush_all().map_err(|err| io_fault(err, E_FFLUSH))?;
        return Ok(Value::NULL);
    }
    for v in args {
        let id = want_file(v, E_FFLUSH)?;
        rt.files.flush(id).map_err(|err| io_fault(err, E_FFLUSH))?;
    }
    Ok(Value::NULL)
}

pub fn builtin_fputc(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fputc", args, 2, 2)?;
    settle(fputc(rt, args))
}

fn fputc(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let id = want_file(&args[0], E_FPUTC_1)?;
    let ch = want_text(&args[1], E_FPUTC_2)?.as_bytes().first().copied().unwrap_or(0);
    rt.files.putc(id, ch).map_err(|err| io_fault(err, E_FPUTC_3))?;
    Ok(Value::NULL)
}

pub fn builtin_fputs(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fputs", args, 2, usize::MAX)?;
    settle(put_texts(rt, args, false, [E_FPUTS_1, E_FPUTS_2, E_FPUTS_3]))
}

/// Like `fputs` but each string is followed by a NUL.
pub fn builtin_fputstr(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fputstr", args, 2, usize::MAX)?;
    settle(put_texts(rt, args, true, [E_FPUTSTR_1, E_FPUTSTR_2, E_FPUTSTR_3]))
}

fn put_texts(rt: &mut Runtime, args: &[Value], nul: bool, codes: [ErrorCode; 3]) -> Outcome {
    let id = want_file(&args[0], codes[0])?;
    let texts = args[1..].iter().map(|v| want_text(v, codes[1])).collect::<Result<Vec<&Text>, Value>>()?;
    for text in texts {
        let written =
            if nul { rt.files.put_str_nul(id, text.as_bytes()) } else { rt.files.puts(id, text.as_bytes()) };
        written.map_err(|err| io_fault(err, codes[2]))?;
    }
    Ok(Value::NULL)
}

pub fn builtin_fgetc(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fgetc", args, 1, 1)?;
    settle(fgetc(rt, args))
}

fn fgetc(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let id = want_file(&args[0], E_FGETC_1)?;
    match rt.files.getc(id) {
        Ok(Some(b)) => Ok(Value::text(Text::from_bytes(&[b]))),
        Ok(None) => Ok(Value::NULL),
        Err(err) => Err(io_fault(err, E_FGETC_2)),
    }
}

/// Next line with its newline.
pub fn builtin_fgets(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fgets", args, 1, 1)?;
    settle(want_file(&args[0], E_FGETS_1).and_then(|id| {
        text_or_null(rt.files.read_text(id, ReadFlags::STOP_NEWLINE), E_FGETS_2)
    }))
}

pub fn builtin_fgetline(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fgetline", args, 1, 1)?;
    settle(want_file(&args[0], E_FGETLINE_1).and_then(|id| text_or_null(rt.files.read_line(id), E_FGETLINE_2)))
}

pub fn builtin_fgetstr(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fgetstr", args, 1, 1)?;
    settle(want_file(&args[0], E_FGETSTR_1).and_then(|id| text_or_null(rt.files.read_to_nul(id), E_FGETSTR_2)))
}

pub fn builtin_fgetfield(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fgetfield", args, 1, 1)?;
    settle(
        want_file(&args[0], E_FGETFIELD_1).and_then(|id| text_or_null(rt.files.read_word(id), E_FGETFIELD_2)),
    )
}

pub fn builtin_fgetfile(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fgetfile", args, 1, 1)?;
    settle(fgetfile(rt, args))
}

fn fgetfile(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let id = want_file(&args[0], E_FGETFILE_1)?;
    match rt.files.read_all(id) {
        Ok(Some(text)) => Ok(Value::text(text)),
        Ok(None) => Ok(Value::NULL),
        Err(FileError::NotOpen(_) | FileError::NotReadable(_)) => Err(fail(E_FGETFILE_2)),
        Err(err) => Err(io_fault(err, E_FGETFILE_3)),
    }
}

pub fn builtin_ungetc(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("ungetc", args, 2, 2)?;
    settle(ungetc(rt, args))
}

fn ungetc(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let id = want_file(&args[0], E_UNGETC_1)?;
    let Some(&ch) = want_text(&args[1], E_UNGETC_3)?.as_bytes().first() else {
        return Err(fail(E_UNGETC_3));
    };
    rt.files.ungetc(id, ch).map_err(file_fault)?;
    Ok(Value::NULL)
}

pub fn builtin_ftell(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("ftell", args, 1, 1)?;
    settle(
        want_file(&args[0], E_FTELL_1)
            .and_then(|id| rt.files.tell(id).map(position).map_err(|err| io_fault(err, E_FTELL_2))),
    )
}

/// `fseek(file, offset [, whence])`, whence 0 (start), 1 (current) or 2 (end).
pub fn builtin_fseek(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fseek", args, 2, 3)?;
    settle(fseek(rt, args))
}

fn fseek(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let id = want_file(&args[0], E_FSEEK_1)?;
    let offset = want_bigint(&args[1], E_FSEEK_2)?;
    let whence = match optional(args, 2) {
        Some(v) => want_int(v, E_FSEEK_2)?,
        None => 0,
    };
    rt.files.seek(id, &offset, whence).map_err(file_fault)?;
    Ok(Value::NULL)
}

pub fn builtin_fsize(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("fsize", args, 1, 1)?;
    settle(
        want_file(&args[0], E_FSIZE_1)
            .and_then(|id| rt.files.size(id).map(position).map_err(|err| io_fault(err, E_FSIZE_2))),
    )
}

pub fn builtin_feof(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("feof", args, 1, 1)?;
    settle(
        want_file(&args[0], E_FEOF_1)
            .and_then(|id| rt.files.is_eof(id).map(flag).map_err(|err| io_fault(err, E_FEOF_2))),
    )
}

pub fn builtin_ferror(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("ferror", args, 1, 1)?;
    settle(
        want_file(&args[0], E_FERROR_1)
            .and_then(|id| rt.files.is_error(id).map(flag).map_err(|err| io_fault(err, E_FERROR_2))),
    )
}

/// Non-file arguments are never terminals.
pub fn builtin_isatty(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("isatty", args, 1, 1)?;
    Ok(flag(args[0].as_file().is_some_and(|id| rt.files.is_tty(id))))
}

pub fn builtin_rewind(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    settle(rewind(rt, args))
}

fn rewind(rt: &mut Runtime, args: &[Value]) -> Outcome {
    if args.is_empty() {
        rt.files.rewind_all().map_err(file_fault)?;
        return Ok(Value::NULL);
    }
    for v in args {
        let id = want_file(v, E_REWIND_1)?;
        rt.files.rewind(id).map_err(file_fault)?;
    }
    Ok(Value::NULL)
}

/// `files()` is the table limit; `files(i)` is the i-th open file or null.
pub fn builtin_files(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("files", args, 0, 1)?;
    settle(files(rt, args))
}

fn files(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let Some(v) = args.first() else {
        return Ok(Value::int(rt.files.max_files() as i64));
    };
    let index = want_int(v, E_FILES)?;
    let found = usize::try_from(index).ok().and_then(|i| rt.files.index_id(i));
    Ok(found.map_or(Value::NULL, Value::file))
}

struct Window {
    id: FileId,
    needle: Text,
    start: Option<BigInt>,
    end: Option<BigInt>,
    size: BigInt,
}

/// Shared argument handling for the two searches. Negative bounds count
/// from the end of the file, a non-positive end is relative to the size,
/// and a missing bound falls back to the current position.
fn window(rt: &mut Runtime, args: &[Value], codes: [ErrorCode; 5]) -> Result<Window, Value> {
    let id = want_file(&args[0], codes[0])?;
    let needle = want_text(&args[1], codes[1])?.link();
    let mut start = optional(args, 2).map(|v| want_bigint(v, codes[2])).transpose()?;
    let mut end = optional(args, 3).map(|v| want_bigint(v, codes[3])).transpose()?;
    let size = rt.files.size(id).map_err(|_| fail(codes[4]))?;

    if let Some(s) = start.as_mut() {
        if s.is_negative() {
            *s += &size;
            if s.is_negative() {
                *s = BigInt::zero();
            }
        }
    }
    if let Some(e) = end.as_mut() {
        if !e.is_positive() {
            *e += &size;
        } else if *e > size {
            *e = size.clone();
        }
    }

    let n = args.len();
    if n == 2 || (n == 4 && (start.is_none() || end.is_none())) {
        let pos = rt.files.tell(id).map_err(|_| fail(codes[4]))?;
        if n == 2 || end.is_some() {
            start = Some(pos);
        } else {
            end = Some(pos);
        }
    }
    Ok(Window { id, needle, start, end, size })
}

fn search_fault(err: FileError, unreadable: ErrorCode, other: ErrorCode) -> Value {
    match err {
        FileError::NotReadable(_) | FileError::NotOpen(_) => fail(unreadable),
        err @ FileError::Io(_) => io_fault(err, other),
        _ => fail(other),
    }
}

/// `search(file, str [, start [, end]])`: first offset in `[start, end)` where
/// `str` fits entirely before `end`, or null.
pub fn builtin_search(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("search", args, 2, 4)?;
    settle(search(rt, args))
}

fn search(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let w = window(rt, args, [E_SEARCH_1, E_SEARCH_2, E_SEARCH_3, E_SEARCH_4, E_SEARCH_5])?;
    let start = w.start.unwrap_or_default();
    let end = w.end.unwrap_or(w.size);
    let limit = end - BigInt::from(w.needle.len()) + 1;
    if limit <= start {
        return Ok(Value::NULL);
    }
    match rt.files.search(w.id, w.needle.as_bytes(), &start, &limit) {
        Ok(found) => Ok(found.map_or(Value::NULL, position)),
        Err(err) => Err(search_fault(err, E_SEARCH_6, E_SEARCH_5)),
    }
}

/// `rsearch(file, str [, start [, end]])`: last offset in `[start, end - len]`
/// where `str` occurs. With fewer than four arguments the start bound is
/// the highest candidate instead.
pub fn builtin_rsearch(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("rsearch", args, 2, 4)?;
    settle(rsearch(rt, args))
}

fn rsearch(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let w = window(rt, args, [E_RSEARCH_1, E_RSEARCH_2, E_RSEARCH_3, E_RSEARCH_4, E_RSEARCH_5])?;
    let len = BigInt::from(w.needle.len());
    let top = &w.size - &len;
    let (low, high) = if args.len() < 4 { (None, w.start) } else { (w.start, w.end.map(|e| e - &len)) };
    let low = low.unwrap_or_default();
    let high = high.map_or_else(|| top.clone(), |h| h.min(top.clone()));
    if low > high {
        return Ok(Value::NULL);
    }
    match rt.files.rsearch(w.id, w.needle.as_bytes(), &high, &low) {
        Ok(found) => Ok(found.map_or(Value::NULL, position)),
        Err(err) => Err(search_fault(err, E_RSEARCH_6, E_RSEARCH_5)),
    }
}
