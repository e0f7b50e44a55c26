//! Per-route helpers for the copy gateway.

use std::borrow::Cow;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use qc_core::{ByteBlock, Data, FileId, OctetTarget, Subtype, Text, Value, nul_run};

use crate::blocks::NamedBlocks;
use crate::errors::{CopyError, FileError};
use crate::files::FileTable;
use crate::runtime::Runtime;

use super::clamp;

/// Bytes of a block source. Named blocks are snapshotted so the
/// destination may be the same block.
pub(super) fn block_source<'a>(rt: &Runtime, src: &'a Value) -> Result<Cow<'a, [u8]>, CopyError> {
    match &src.data {
        Data::Block(b) => Ok(Cow::Borrowed(b.as_slice())),
        Data::NamedBlock(id) => {
            let block = rt.blocks.get(*id).and_then(|n| n.block()).ok_or(CopyError::FreedSource)?;
            Ok(Cow::Owned(block.as_slice().to_vec()))
        }
        _ => Err(CopyError::BadSourceType(src.kind())),
    }
}

/// The NUL-terminated run starting at an octet, without the terminator.
pub(super) fn octet_run(rt: &Runtime, src: &Value) -> Result<Vec<u8>, CopyError> {
    let Data::Octet(octet) = &src.data else {
        return Err(CopyError::BadSourceType(src.kind()));
    };
    match &octet.target {
        OctetTarget::Text(text) => Ok(text.until_nul(octet.index).to_vec()),
        OctetTarget::NamedBlock(id) => {
            let block = rt.blocks.get(*id).and_then(|n| n.block()).ok_or(CopyError::FreedSource)?;
            Ok(nul_run(block.as_slice(), octet.index).to_vec())
        }
    }
}

/// Runs `f` on the destination block with the combined growth permission.
pub(super) fn with_dest_block<R>(
    blocks: &mut NamedBlocks,
    dst: &mut Value,
    f: impl FnOnce(&mut ByteBlock, bool) -> Result<R, CopyError>,
) -> Result<R, CopyError> {
    let value_grow = !dst.subtype.contains(Subtype::NO_REALLOC);
    let kind = dst.kind();
    match &mut dst.data {
        Data::Block(block) => f(block, value_grow),
        Data::NamedBlock(id) => {
            let nblk = blocks.get_mut(*id).ok_or(CopyError::FreedDest)?;
            let grow = value_grow && nblk.can_grow();
            let block = nblk.block_mut().ok_or(CopyError::FreedDest)?;
            f(block, grow)
        }
        _ => Err(CopyError::BadDestType(kind)),
    }
}

/// Writes `bytes` at `dsi` (the data length when negative), growing the
/// block by whole chunks if needed.
pub(super) fn write_block(
    block: &mut ByteBlock,
    can_grow: bool,
    bytes: &[u8],
    dsi: i64,
    trailing_nul: bool,
) -> Result<(), CopyError> {
    let start = if dsi < 0 { block.len() } else { dsi as usize };
    let new_len = start
        .checked_add(bytes.len() + usize::from(trailing_nul))
        .ok_or(CopyError::DestIndexTooLarge)?;
    block.reserve_for(new_len, can_grow).map_err(|_| CopyError::NoRealloc)?;
    block.write_at(start, bytes);
    if trailing_nul {
        block.write_at(start + bytes.len(), &[0]);
    }
    Ok(())
}

fn file_fault(id: FileId, err: FileError, wrap: fn(FileError) -> CopyError) -> CopyError {
    match err {
        FileError::NotOpen(_) | FileError::NotReadable(_) | FileError::NotWritable(_) => {
            CopyError::FileNotOpen(id)
        }
        other => wrap(other),
    }
}

pub(super) fn file_into_block(
    files: &mut FileTable,
    id: FileId,
    ssi: usize,
    num: i64,
    block: &mut ByteBlock,
    can_grow: bool,
    dsi: i64,
) -> Result<(), CopyError> {
    if id.is_std() {
        return Err(CopyError::FileNotOpen(id));
    }
    let size = files.size(id).map_err(|e| file_fault(id, e, CopyError::SeekFailed))?;
    let size = size.to_i32().ok_or(CopyError::SourceTooLarge)?;
    let count = clamp(size.max(0) as usize, ssi, num);
    if count == 0 {
        return Ok(());
    }
    files
        .set_pos(id, &BigInt::from(ssi))
        .map_err(|e| file_fault(id, e, CopyError::SeekFailed))?;
    let bytes = files.read_bytes(id, count).map_err(|e| file_fault(id, e, CopyError::SeekFailed))?;
    if bytes.len() < count {
        return Err(CopyError::ShortRead);
    }
    write_block(block, can_grow, &bytes, dsi, false)
}

/// Standard output and error ignore `dsi` and write at the stream.
pub(super) fn bytes_into_file(files: &mut FileTable, id: FileId, bytes: &[u8], dsi: i64) -> Result<(), CopyError> {
    if id == FileId::STDIN {
        return Err(CopyError::FileNotOpen(id));
    }
    if dsi >= 0 && !id.is_std() {
        files
            .set_pos(id, &BigInt::from(dsi))
            .map_err(|e| file_fault(id, e, CopyError::SeekFailed))?;
    }
    files.write_bytes(id, bytes).map_err(|e| file_fault(id, e, CopyError::ShortWrite))?;
    files.flush(id).map_err(|e| file_fault(id, e, CopyError::ShortWrite))
}

/// Overwrites numerator digits starting at word `dsi`, or appends words
/// past the current top when `dsi` is negative.
pub(super) fn bytes_into_number(dst: &mut Value, bytes: &[u8], dsi: i64) -> Result<(), CopyError> {
    let kind = dst.kind();
    let Data::Number(n) = &mut dst.data else {
        return Err(CopyError::BadDestType(kind));
    };
    let start = if dsi < 0 { n.numerator_len() } else { dsi as usize };
    *n = n.with_numerator_bytes(start, bytes);
    Ok(())
}

/// Text destinations keep their length; excess source bytes are dropped.
pub(super) fn bytes_into_text(text: &mut Text, bytes: &[u8], dsi: i64) {
    let start = dsi.max(0) as usize;
    if start >= text.len() {
        return;
    }
    let n = bytes.len().min(text.len() - start);
    text.make_mut()[start..start + n].copy_from_slice(&bytes[..n]);
}

pub(super) fn values_into_slots(slots: &mut [Value], values: Vec<Value>, dsi: i64) -> Result<(), CopyError> {
    let start = dsi.max(0) as usize;
    let end = start.checked_add(values.len()).ok_or(CopyError::DestIndexTooLarge)?;
    if end > slots.len() {
        return Err(CopyError::DestIndexTooLarge);
    }
    for (slot, value) in slots[start..end].iter_mut().zip(values) {
        let kept = slot.subtype;
        *slot = value;
        slot.subtype |= kept;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_block_grows_by_chunk() {
        let mut block = ByteBlock::alloc(0, 4);
        assert_eq!(block.capacity(), 4);
        write_block(&mut block, true, b"abcd", 0, false).unwrap();
        assert_eq!(block.capacity(), 4);
        write_block(&mut block, true, b"e", -1, false).unwrap();
        assert_eq!(block.capacity(), 8);
        assert_eq!(block.as_slice(), b"abcde");
    }

    #[test]
    fn write_block_denied() {
        let mut block = ByteBlock::alloc(0, 4);
        let err = write_block(&mut block, false, b"abcde", 0, false).unwrap_err();
        assert!(matches!(err, CopyError::NoRealloc));
        assert_eq!(block.len(), 0);
    }

    #[test]
    fn text_destination_drops_excess() {
        let mut text = Text::from("xxxx");
        let shared = text.link();
        bytes_into_text(&mut text, b"abcdef", 2);
        assert_eq!(text.as_bytes(), b"xxab");
        assert_eq!(shared.as_bytes(), b"xxxx");
    }

    #[test]
    fn slots_keep_old_protection() {
        let mut slots = vec![Value::int(1).with_subtype(Subtype::NO_ASSIGN_TO), Value::int(2)];
        values_into_slots(&mut slots, vec![Value::str("a")], 0).unwrap();
        assert_eq!(slots[0], Value::str("a"));
        assert!(slots[0].subtype.contains(Subtype::NO_ASSIGN_TO));
        let err = values_into_slots(&mut slots, vec![Value::NULL, Value::NULL], 1).unwrap_err();
        assert!(matches!(err, CopyError::DestIndexTooLarge));
    }
}
