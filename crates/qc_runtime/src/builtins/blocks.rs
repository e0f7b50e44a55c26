use num_traits::ToPrimitive;
use qc_core::errcode::*;
use qc_core::{ByteBlock, Data, NamedBlockId, Value};

use super::super::Runtime;
use super::common::*;
use crate::copy;

/// Integral argument in `0..2^31`, `default` when absent or null. `codes`
/// are reported for a non-integer, a negative and a too-large value.
fn bounded(args: &[Value], at: usize, default: i64, codes: [ErrorCode; 3]) -> Result<i64, Value> {
    let Some(v) = optional(args, at) else {
        return Ok(default);
    };
    let n = want_bigint(v, codes[0])?;
    match n.to_i64() {
        Some(n) if n < 0 => Err(fail(codes[1])),
        Some(n) if n <= i64::from(i32::MAX) => Ok(n),
        _ => Err(fail(codes[2])),
    }
}

/// `blk([len [, chunk]])` allocates an anonymous block;
/// `blk(name | nblock | block, [len [, chunk]])` creates or resizes.
pub fn builtin_blk(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("blk", args, 0, 3)?;
    settle(blk(rt, args))
}

fn blk(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let (target, rest) = match args.first() {
        Some(v) if matches!(v.data, Data::Text(_) | Data::NamedBlock(_) | Data::Block(_)) => (Some(v), &args[1..]),
        _ => (None, args),
    };
    let len = bounded(rest, 0, -1, [E_BLK_1, E_BLK_2, E_BLK_2])?;
    let chunk = bounded(rest, 1, -1, [E_BLK_3, E_BLK_4, E_BLK_4])?;
    let block_fault = |err: crate::BlockError| fail(err.code());

    let Some(target) = target else {
        let chunk = if chunk < 0 { rt.config.block_chunk } else { chunk as usize };
        return Ok(Value::block(ByteBlock::alloc(len.max(0) as usize, chunk)));
    };
    match &target.data {
        Data::Text(name) => {
            let name = name.to_string_lossy();
            let id = match rt.blocks.find_id(&name) {
                Some(id) => {
                    rt.blocks.realloc(id, len, chunk).map_err(block_fault)?;
                    id
                }
                None => {
                    let chunk = if chunk <= 0 { rt.config.block_chunk as i64 } else { chunk };
                    rt.blocks.create(&name, len.max(0), chunk).map_err(block_fault)?
                }
            };
            Ok(Value::named_block(id))
        }
        Data::NamedBlock(id) => {
            rt.blocks.realloc(*id, len, chunk).map_err(block_fault)?;
            Ok(Value::named_block(*id))
        }
        Data::Block(block) => {
            let mut block = block.clone();
            block.realloc(len, chunk);
            Ok(Value::block(block).with_subtype(target.subtype))
        }
        _ => Err(fail(E_BLK_1)),
    }
}

/// Frees a named block given as a value, its name, or its id.
pub fn builtin_blkfree(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("blkfree", args, 1, 1)?;
    settle(blkfree(rt, args))
}

fn blkfree(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let freed = match &args[0].data {
        Data::NamedBlock(id) => rt.blocks.remove(*id),
        Data::Text(name) => rt.blocks.remove_by_name(&name.to_string_lossy()),
        Data::Number(_) => {
            let id = bounded(args, 0, 0, [E_BLKFREE_2, E_BLKFREE_2, E_BLKFREE_3])?;
            rt.blocks.remove(NamedBlockId(id as u32))
        }
        _ => return Err(fail(E_BLKFREE_4)),
    };
    freed.map_err(|err| fail(err.code()))?;
    Ok(Value::NULL)
}

/// `blocks()` counts unfreed named blocks; `blocks(id)` fetches one.
pub fn builtin_blocks(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("blocks", args, 0, 1)?;
    settle(blocks(rt, args))
}

fn blocks(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let Some(v) = args.first() else {
        return Ok(Value::int(rt.blocks.count_live() as i64));
    };
    let id = want_int(v, E_BLOCKS_1)?;
    let found = u32::try_from(id).ok().map(NamedBlockId).filter(|&id| rt.blocks.get(id).is_some());
    found.map(Value::named_block).ok_or_else(|| fail(E_BLOCKS_2))
}

struct Span {
    ssi: i64,
    num: i64,
    dsi: i64,
}

fn span(args: &[Value], ssi_at: usize, num_at: usize, dsi_at: usize) -> Result<Span, Value> {
    Ok(Span {
        ssi: bounded(args, ssi_at, 0, [E_COPY_01, E_COPY_01, E_COPY_02])?,
        num: bounded(args, num_at, -1, [E_COPY_04, E_COPY_04, E_COPY_05])?,
        dsi: bounded(args, dsi_at, -1, [E_COPY_06, E_COPY_06, E_COPY_07])?,
    })
}

/// `copy(src, dst [, ssi [, num [, dsi]]])`. Returns the updated
/// destination.
pub fn builtin_copy(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("copy", args, 2, 5)?;
    settle(copy_values(rt, args))
}

fn copy_values(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let s = span(args, 2, 3, 4)?;
    let mut dst = args[1].clone();
    copy::copy(rt, &args[0], s.ssi, s.num, &mut dst, s.dsi).map_err(|err| fail(err.code()))?;
    Ok(dst)
}

/// `blkcpy(dst, src [, num [, dsi [, ssi]]])`. Returns the updated
/// destination.
pub fn builtin_blkcpy(rt: &mut Runtime, args: &[Value]) -> Result<Value, String> {
    arity("blkcpy", args, 2, 5)?;
    settle(blkcpy(rt, args))
}

fn blkcpy(rt: &mut Runtime, args: &[Value]) -> Outcome {
    let s = span(args, 4, 2, 3)?;
    let mut dst = args[0].clone();
    copy::blk_move(rt, &mut dst, &args[1], s.num, s.dsi, s.ssi).map_err(|err| fail(err.code()))?;
    Ok(dst)
}
