use kaspa_txscript::opcodes::codes::*;
use kaspa_txscript::script_builder::{ScriptBuilder, ScriptBuilderError};

use crate::ir::{IrOp, ScriptOp};

/// Translates abstract instructions into the concrete script in one pass.
/// All numeric and pushdata encodings are delegated to the machine's own
/// `ScriptBuilder`, which produces the consensus minimal encodings.
pub fn assemble_program(ops: &[IrOp]) -> Result<Vec<u8>, ScriptBuilderError> {
    let ops = peephole(ops);
    let mut builder = ScriptBuilder::new();
    for op in &ops {
        encode(&mut builder, op)?;
    }
    Ok(builder.drain())
}

fn is_push(op: &IrOp) -> bool {
    matches!(op, IrOp::PushInt(_) | IrOp::PushBool(_) | IrOp::PushBytes(_) | IrOp::Get(_))
}

/// Removes effect-free pushes immediately negated by a drop, repeating
/// until nothing changes. Anything less locally provable is left alone.
fn peephole(ops: &[IrOp]) -> Vec<IrOp> {
    let mut ops = ops.to_vec();
    loop {
        let mut simplified = Vec::with_capacity(ops.len());
        let mut changed = false;
        let mut index = 0;
        while index < ops.len() {
            if index + 1 < ops.len() && is_push(&ops[index]) && ops[index + 1] == IrOp::Op(ScriptOp::Drop) {
                index += 2;
                changed = true;
            } else {
                simplified.push(ops[index].clone());
                index += 1;
            }
        }
        ops = simplified;
        if !changed {
            return ops;
        }
    }
}

fn encode(builder: &mut ScriptBuilder, op: &IrOp) -> Result<(), ScriptBuilderError> {
    match op {
        IrOp::PushInt(value) => {
            builder.add_i64(*value)?;
        }
        IrOp::PushBool(true) => {
            builder.add_op(OpTrue)?;
        }
        IrOp::PushBool(false) => {
            builder.add_op(OpFalse)?;
        }
        IrOp::PushBytes(bytes) => {
            builder.add_data(bytes)?;
        }
        IrOp::Get(0) => {
            builder.add_op(OpDup)?;
        }
        IrOp::Get(depth) => {
            builder.add_i64(*depth as i64)?;
            builder.add_op(OpPick)?;
        }
        IrOp::Replace(depth) => encode_replace(builder, *depth)?,
        IrOp::Op(op) => encode_op(builder, *op)?,
    }
    Ok(())
}

/// In-place overwrite of the item `depth` positions below the top with the
/// top value. The slots in between are shelved on the alt stack, the stale
/// value is nipped out, and the shelf is restored.
fn encode_replace(builder: &mut ScriptBuilder, depth: usize) -> Result<(), ScriptBuilderError> {
    debug_assert!(depth >= 1, "replace target sits under the value replacing it");
    for _ in 1..depth {
        builder.add_op(OpSwap)?;
        builder.add_op(OpToAltStack)?;
    }
    builder.add_op(OpNip)?;
    for _ in 1..depth {
        builder.add_op(OpFromAltStack)?;
    }
    Ok(())
}

fn encode_op(builder: &mut ScriptBuilder, op: ScriptOp) -> Result<(), ScriptBuilderError> {
    let opcode = match op {
        ScriptOp::If => OpIf,
        ScriptOp::Else => OpElse,
        ScriptOp::EndIf => OpEndIf,
        ScriptOp::Verify => OpVerify,
        ScriptOp::Drop => OpDrop,
        ScriptOp::Nip => OpNip,
        ScriptOp::Add => OpAdd,
        ScriptOp::Sub => OpSub,
        ScriptOp::Mul => OpMul,
        ScriptOp::Div => OpDiv,
        ScriptOp::Mod => OpMod,
        ScriptOp::Negate => OpNegate,
        ScriptOp::Abs => OpAbs,
        ScriptOp::Min => OpMin,
        ScriptOp::Max => OpMax,
        ScriptOp::Within => OpWithin,
        ScriptOp::Not => OpNot,
        ScriptOp::BoolAnd => OpBoolAnd,
        ScriptOp::BoolOr => OpBoolOr,
        ScriptOp::NumEqual => OpNumEqual,
        ScriptOp::NumNotEqual => OpNumNotEqual,
        ScriptOp::LessThan => OpLessThan,
        ScriptOp::LessThanOrEqual => OpLessThanOrEqual,
        ScriptOp::GreaterThan => OpGreaterThan,
        ScriptOp::GreaterThanOrEqual => OpGreaterThanOrEqual,
        ScriptOp::ByteEqual => OpEqual,
        ScriptOp::Cat => OpCat,
        ScriptOp::Sha256 => OpSHA256,
        ScriptOp::Blake2b => OpBlake2b,
        ScriptOp::CheckSig => OpCheckSig,
        ScriptOp::CheckMultiSig => OpCheckMultiSig,
        ScriptOp::CheckSequence => OpCheckSequenceVerify,
        ScriptOp::CheckLockTime => OpCheckLockTimeVerify,
        ScriptOp::Size => {
            // size of the top item, original consumed
            builder.add_op(OpSize)?;
            builder.add_op(OpNip)?;
            return Ok(());
        }
        ScriptOp::Split => {
            builder.add_op(Op2Dup)?; // [s, i, s, i]
            builder.add_i64(0)?;
            builder.add_op(OpSwap)?;
            builder.add_op(OpSubStr)?; // [s, i, s[0..i]]
            builder.add_op(OpRot)?; // [i, left, s]
            builder.add_op(OpSize)?;
            builder.add_i64(3)?;
            builder.add_op(OpRoll)?; // [left, s, size, i]
            builder.add_op(OpSwap)?;
            builder.add_op(OpSubStr)?; // [left, s[i..size]]
            return Ok(());
        }
    };
    builder.add_op(opcode)?;
    Ok(())
}
