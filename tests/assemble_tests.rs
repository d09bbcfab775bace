use kaspa_txscript::opcodes::codes::*;
use kaspa_txscript::script_builder::ScriptBuilder;
use lockscript_lang::assemble::assemble_program;
use lockscript_lang::ir::{IrOp, ScriptOp};

#[test]
fn peephole_elides_push_immediately_followed_by_drop() {
    let script = assemble_program(&[IrOp::PushInt(7), IrOp::Op(ScriptOp::Drop), IrOp::PushBool(true)]).expect("assembles");
    let expected = ScriptBuilder::new().add_op(OpTrue).unwrap().drain();
    assert_eq!(script, expected);
}

#[test]
fn peephole_elides_fetch_immediately_followed_by_drop() {
    let script = assemble_program(&[IrOp::Get(0), IrOp::Op(ScriptOp::Drop)]).expect("assembles");
    assert!(script.is_empty());
}

#[test]
fn peephole_runs_to_a_fixpoint() {
    let ops = [IrOp::Get(2), IrOp::PushInt(1), IrOp::Op(ScriptOp::Drop), IrOp::Op(ScriptOp::Drop)];
    let script = assemble_program(&ops).expect("assembles");
    assert!(script.is_empty());
}

#[test]
fn peephole_leaves_semantic_drops_alone() {
    let ops = [IrOp::Op(ScriptOp::Split), IrOp::Op(ScriptOp::Drop)];
    let script = assemble_program(&ops).expect("assembles");
    let expected = ScriptBuilder::new()
        .add_op(Op2Dup)
        .unwrap()
        .add_i64(0)
        .unwrap()
        .add_op(OpSwap)
        .unwrap()
        .add_op(OpSubstr)
        .unwrap()
        .add_op(OpRot)
        .unwrap()
        .add_op(OpSize)
        .unwrap()
        .add_i64(3)
        .unwrap()
        .add_op(OpRoll)
        .unwrap()
        .add_op(OpSwap)
        .unwrap()
        .add_op(OpSubstr)
        .unwrap()
        .add_op(OpDrop)
        .unwrap()
        .drain();
    assert_eq!(script, expected);
}

#[test]
fn fetch_at_depth_zero_encodes_as_dup() {
    let script = assemble_program(&[IrOp::Get(0)]).expect("assembles");
    let expected = ScriptBuilder::new().add_op(OpDup).unwrap().drain();
    assert_eq!(script, expected);

    let script = assemble_program(&[IrOp::Get(3)]).expect("assembles");
    let expected = ScriptBuilder::new().add_i64(3).unwrap().add_op(OpPick).unwrap().drain();
    assert_eq!(script, expected);
}

#[test]
fn replace_at_depth_one_encodes_as_nip() {
    let script = assemble_program(&[IrOp::Replace(1)]).expect("assembles");
    let expected = ScriptBuilder::new().add_op(OpNip).unwrap().drain();
    assert_eq!(script, expected);
}

#[test]
fn replace_at_depth_shelves_intermediate_slots_on_the_alt_stack() {
    let script = assemble_program(&[IrOp::Replace(3)]).expect("assembles");
    let expected = ScriptBuilder::new()
        .add_op(OpSwap)
        .unwrap()
        .add_op(OpToAltStack)
        .unwrap()
        .add_op(OpSwap)
        .unwrap()
        .add_op(OpToAltStack)
        .unwrap()
        .add_op(OpNip)
        .unwrap()
        .add_op(OpFromAltStack)
        .unwrap()
        .add_op(OpFromAltStack)
        .unwrap()
        .drain();
    assert_eq!(script, expected);
}

#[test]
fn size_encodes_as_size_then_nip() {
    let script = assemble_program(&[IrOp::Op(ScriptOp::Size)]).expect("assembles");
    let expected = ScriptBuilder::new().add_op(OpSize).unwrap().add_op(OpNip).unwrap().drain();
    assert_eq!(script, expected);
}

#[test]
fn pushes_use_the_machine_minimal_encodings() {
    let script =
        assemble_program(&[IrOp::PushInt(0), IrOp::PushInt(1_000_000), IrOp::PushBool(false), IrOp::PushBytes(vec![0xaa; 3])])
            .expect("assembles");
    let expected = ScriptBuilder::new()
        .add_i64(0)
        .unwrap()
        .add_i64(1_000_000)
        .unwrap()
        .add_op(OpFalse)
        .unwrap()
        .add_data(&[0xaa; 3])
        .unwrap()
        .drain();
    assert_eq!(script, expected);
}

#[test]
fn fixed_ops_map_to_their_opcodes() {
    let script = assemble_program(&[
        IrOp::Op(ScriptOp::NumEqual),
        IrOp::Op(ScriptOp::ByteEqual),
        IrOp::Op(ScriptOp::Cat),
        IrOp::Op(ScriptOp::Sha256),
        IrOp::Op(ScriptOp::Blake2b),
        IrOp::Op(ScriptOp::CheckSig),
        IrOp::Op(ScriptOp::CheckSequence),
        IrOp::Op(ScriptOp::CheckLockTime),
    ])
    .expect("assembles");
    let expected = ScriptBuilder::new()
        .add_op(OpNumEqual)
        .unwrap()
        .add_op(OpEqual)
        .unwrap()
        .add_op(OpCat)
        .unwrap()
        .add_op(OpSHA256)
        .unwrap()
        .add_op(OpBlake2b)
        .unwrap()
        .add_op(OpCheckSig)
        .unwrap()
        .add_op(OpCheckSequenceVerify)
        .unwrap()
        .add_op(OpCheckLockTimeVerify)
        .unwrap()
        .drain();
    assert_eq!(script, expected);
}
