//! Cross-type copy gateway.
//!
//! `copy(src, ssi, num, dst, dsi)` moves `num` units starting at `ssi` of
//! the source into the destination at `dsi`. A negative `num` means the
//! rest of the source. A negative `dsi` appends to a block, starts a text
//! or matrix at zero, and writes a file at its current position.
//!
//! The entry checks protection bits first, then kinds, then dispatches on
//! the `(source, destination)` kind pair.

mod routines;

use qc_core::{Data, Kind, OctetTarget, Subtype, Value};

use crate::errors::CopyError;
use crate::runtime::Runtime;

use routines::{
    block_source, bytes_into_file, bytes_into_number, bytes_into_text, file_into_block,
    octet_run, values_into_slots, with_dest_block, write_block,
};

/// Units available from `ssi`, at most `num` when `num` is non-negative.
fn clamp(len: usize, ssi: usize, num: i64) -> usize {
    let avail = len.saturating_sub(ssi);
    if num < 0 { avail } else { avail.min(num as usize) }
}

fn check_protection(rt: &Runtime, src: &Value, dst: &Value) -> Result<(), CopyError> {
    if src.subtype.contains(Subtype::NO_COPY_FROM) {
        return Err(CopyError::SourceProtected);
    }
    if dst.subtype.contains(Subtype::NO_COPY_TO) {
        return Err(CopyError::DestProtected);
    }
    let source_block = match &src.data {
        Data::NamedBlock(id) => Some(*id),
        Data::Octet(o) => match o.target {
            OctetTarget::NamedBlock(id) => Some(id),
            OctetTarget::Text(_) => None,
        },
        _ => None,
    };
    if let Some(id) = source_block {
        let nblk = rt.blocks.get(id).ok_or(CopyError::FreedSource)?;
        if nblk.subtype.contains(Subtype::NO_COPY_FROM) {
            return Err(CopyError::NamedSourceProtected(id));
        }
        if nblk.is_freed() {
            return Err(CopyError::FreedSource);
        }
    }
    if let Some(id) = dst.as_named_block() {
        let nblk = rt.blocks.get(id).ok_or(CopyError::FreedDest)?;
        if nblk.subtype.contains(Subtype::NO_COPY_TO) {
            return Err(CopyError::NamedDestProtected(id));
        }
        if nblk.is_freed() {
            return Err(CopyError::FreedDest);
        }
    }
    Ok(())
}

fn check_kinds(from: Kind, to: Kind) -> Result<(), CopyError> {
    if matches!(from, Kind::Null | Kind::Complex | Kind::Assoc | Kind::Error) {
        return Err(CopyError::BadSourceType(from));
    }
    if matches!(to, Kind::Null | Kind::Complex | Kind::Octet | Kind::Assoc | Kind::Error) {
        return Err(CopyError::BadDestType(to));
    }
    Ok(())
}

/// Single octet a value contributes to a block, resolving octets that
/// point into named blocks.
fn octet_of(rt: &Runtime, value: &Value) -> u8 {
    match &value.data {
        Data::Octet(o) => match o.target {
            OctetTarget::NamedBlock(id) => rt
                .blocks
                .get(id)
                .and_then(|nblk| nblk.block())
                .and_then(|b| b.as_slice().get(o.index).copied())
                .unwrap_or(0),
            OctetTarget::Text(_) => value.to_octet(),
        },
        Data::NamedBlock(id) => rt
            .blocks
            .get(*id)
            .and_then(|nblk| nblk.block())
            .and_then(|b| b.as_slice().first().copied())
            .unwrap_or(0),
        _ => value.to_octet(),
    }
}

pub fn copy(
    rt: &mut Runtime,
    src: &Value,
    ssi: i64,
    num: i64,
    dst: &mut Value,
    dsi: i64,
) -> Result<(), CopyError> {
    check_protection(rt, src, dst)?;
    let (from, to) = (src.kind(), dst.kind());
    check_kinds(from, to)?;
    if ssi < 0 {
        return Err(CopyError::NegativeIndex);
    }
    let ssi = ssi as usize;
    tracing::trace!(%from, %to, ssi, num, dsi, "copy");

    match (from, to) {
        (Kind::Block | Kind::NamedBlock, Kind::Block | Kind::NamedBlock) => {
            let bytes = block_source(rt, src)?;
            let count = clamp(bytes.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            with_dest_block(&mut rt.blocks, dst, |block, grow| {
                write_block(block, grow, &bytes[ssi..ssi + count], dsi, false)
            })
        }
        (Kind::Text, Kind::Block | Kind::NamedBlock) => {
            let bytes = src.as_text().map(|t| t.as_bytes()).unwrap_or_default();
            let count = clamp(bytes.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            with_dest_block(&mut rt.blocks, dst, |block, grow| {
                write_block(block, grow, &bytes[ssi..ssi + count], dsi, true)
            })
        }
        (Kind::Octet, Kind::Block | Kind::NamedBlock) => {
            let mut run = octet_run(rt, src)?;
            run.push(0);
            let count = clamp(run.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            with_dest_block(&mut rt.blocks, dst, |block, grow| {
                write_block(block, grow, &run[ssi..ssi + count], dsi, false)
            })
        }
        (Kind::Number, Kind::Block | Kind::NamedBlock) => {
            let Some(n) = src.as_number() else { return Err(CopyError::BadSourceType(from)) };
            let count = clamp(n.numerator_len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            let image = n.numerator_bytes();
            let bytes = &image[ssi * 4..(ssi + count) * 4];
            with_dest_block(&mut rt.blocks, dst, |block, grow| write_block(block, grow, bytes, dsi, false))
        }
        (Kind::File, Kind::Block | Kind::NamedBlock) => {
            let Some(id) = src.as_file() else { return Err(CopyError::BadSourceType(from)) };
            let files = &mut rt.files;
            with_dest_block(&mut rt.blocks, dst, |block, grow| {
                file_into_block(files, id, ssi, num, block, grow, dsi)
            })
        }
        (Kind::Matrix, Kind::Block | Kind::NamedBlock) => {
            let Some(m) = src.as_matrix() else { return Err(CopyError::BadSourceType(from)) };
            let count = clamp(m.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            let bytes: Vec<u8> = m.elements()[ssi..ssi + count].iter().map(|v| octet_of(rt, v)).collect();
            with_dest_block(&mut rt.blocks, dst, |block, grow| write_block(block, grow, &bytes, dsi, false))
        }
        (Kind::Block | Kind::NamedBlock, Kind::Number) => {
            let bytes = block_source(rt, src)?;
            let count = clamp(bytes.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            bytes_into_number(dst, &bytes[ssi..ssi + count], dsi)
        }
        (Kind::Block | Kind::NamedBlock | Kind::Text, Kind::File) => {
            let Some(id) = dst.as_file() else { return Err(CopyError::BadDestType(to)) };
            let bytes = match src.as_text() {
                Some(t) => std::borrow::Cow::Borrowed(t.as_bytes()),
                None => block_source(rt, src)?,
            };
            let count = clamp(bytes.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            bytes_into_file(&mut rt.files, id, &bytes[ssi..ssi + count], dsi)
        }
        (Kind::Block | Kind::NamedBlock | Kind::Text | Kind::Octet, Kind::Text) => {
            let bytes = match &src.data {
                Data::Text(t) => std::borrow::Cow::Borrowed(t.as_bytes()),
                Data::Octet(_) => std::borrow::Cow::Owned(octet_run(rt, src)?),
                _ => block_source(rt, src)?,
            };
            let count = clamp(bytes.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            match &mut dst.data {
                Data::Text(text) => {
                    bytes_into_text(text, &bytes[ssi..ssi + count], dsi);
                    Ok(())
                }
                _ => Err(CopyError::BadDestType(to)),
            }
        }
        (Kind::Block | Kind::NamedBlock, Kind::Matrix) => {
            let bytes = block_source(rt, src)?;
            let count = clamp(bytes.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            let values: Vec<Value> = bytes[ssi..ssi + count].iter().map(|&b| Value::int(i64::from(b))).collect();
            copy_values_into(dst, values, dsi)
        }
        (Kind::Matrix | Kind::List, Kind::Matrix | Kind::List) => {
            let elements = match &src.data {
                Data::Matrix(m) => m.elements(),
                Data::List(l) => l.items(),
                _ => return Err(CopyError::BadSourceType(from)),
            };
            let count = clamp(elements.len(), ssi, num);
            if count == 0 {
                return Ok(());
            }
            let values = elements[ssi..ssi + count].to_vec();
            copy_values_into(dst, values, dsi)
        }
        // No defined layout for these pairs.
        (Kind::Block | Kind::NamedBlock, Kind::List)
        | (Kind::Text, Kind::Number | Kind::Matrix | Kind::List)
        | (Kind::Octet, Kind::Number | Kind::File | Kind::Matrix | Kind::List)
        | (Kind::Number, Kind::Number | Kind::Text | Kind::File | Kind::Matrix | Kind::List)
        | (Kind::File, Kind::Number | Kind::Text | Kind::File | Kind::Matrix | Kind::List)
        | (Kind::Matrix, Kind::Number | Kind::Text | Kind::File)
        | (Kind::List, Kind::Block | Kind::NamedBlock | Kind::Number | Kind::Text | Kind::File) => {
            Err(CopyError::Unsupported { from, to })
        }
        // Already rejected by `check_kinds`.
        (Kind::Null | Kind::Complex | Kind::Assoc | Kind::Error, _) => Err(CopyError::BadSourceType(from)),
        (_, Kind::Null | Kind::Complex | Kind::Octet | Kind::Assoc | Kind::Error) => {
            Err(CopyError::BadDestType(to))
        }
    }
}

fn copy_values_into(dst: &mut Value, values: Vec<Value>, dsi: i64) -> Result<(), CopyError> {
    let kind = dst.kind();
    match &mut dst.data {
        Data::Matrix(m) => values_into_slots(m.elements_mut(), values, dsi),
        Data::List(l) => values_into_slots(l.items_mut(), values, dsi),
        _ => Err(CopyError::BadDestType(kind)),
    }
}

/// `blkcpy` argument order: destination first, source indices last.
pub fn blk_move(
    rt: &mut Runtime,
    dst: &mut Value,
    src: &Value,
    num: i64,
    dsi: i64,
    ssi: i64,
) -> Result<(), CopyError> {
    copy(rt, src, ssi, num, dst, dsi)
}

/// Fills `count` bytes of a block from `offset` with `byte`; a negative
/// count fills to the end of the data.
pub fn blk_set(rt: &mut Runtime, dst: &mut Value, byte: u8, count: i64, offset: i64) -> Result<(), CopyError> {
    check_protection(rt, &Value::NULL, dst)?;
    if offset < 0 {
        return Err(CopyError::NegativeIndex);
    }
    let offset = offset as usize;
    with_dest_block(&mut rt.blocks, dst, |block, _| {
        let count = clamp(block.len(), offset, count);
        block.fill(byte, offset, count);
        Ok(())
    })
}

/// Compares the data of two blocks, named or anonymous.
pub fn blk_cmp(rt: &Runtime, a: &Value, b: &Value) -> Result<bool, CopyError> {
    let left = block_source(rt, a)?;
    let right = match block_source(rt, b) {
        Ok(bytes) => bytes,
        Err(CopyError::BadSourceType(kind)) => return Err(CopyError::BadDestType(kind)),
        Err(err) => return Err(err),
    };
    Ok(left == right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_cases() {
        assert_eq!(clamp(10, 0, -1), 10);
        assert_eq!(clamp(10, 4, 3), 3);
        assert_eq!(clamp(10, 8, 5), 2);
        assert_eq!(clamp(10, 15, 10), 0);
        assert_eq!(clamp(0, 0, -1), 0);
    }

    #[test]
    fn kind_gate() {
        assert!(matches!(check_kinds(Kind::Assoc, Kind::Block), Err(CopyError::BadSourceType(Kind::Assoc))));
        assert!(matches!(check_kinds(Kind::Block, Kind::Octet), Err(CopyError::BadDestType(Kind::Octet))));
        assert!(check_kinds(Kind::File, Kind::Block).is_ok());
    }
}
