use lockscript_lang::ast::parse_contract;
use lockscript_lang::compiler::CompileOptions;
use lockscript_lang::ir::{IrOp, ScriptOp};
use lockscript_lang::lower::lower_contract;
use lockscript_lang::typecheck::check_contract;

fn lower(source: &str) -> Vec<IrOp> {
    lower_with(source, CompileOptions::default())
}

fn lower_with(source: &str, options: CompileOptions) -> Vec<IrOp> {
    let mut contract = parse_contract(source).expect("source parses");
    check_contract(&mut contract, &options).expect("contract checks");
    lower_contract(&contract)
}

#[test]
fn lowers_single_function_to_fetch_compare_assert_cleanup() {
    let ir = lower_with(
        r#"
            contract Checker() {
                function main(int x, bytes y) {
                    require(x == 5);
                }
            }
        "#,
        CompileOptions { allow_unused: true, allow_constant_conditions: false },
    );
    assert_eq!(
        ir,
        vec![
            IrOp::Get(1),
            IrOp::PushInt(5),
            IrOp::Op(ScriptOp::NumEqual),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::PushBool(true),
        ]
    );
}

#[test]
fn single_function_emits_no_dispatch_instructions() {
    let ir = lower(
        r#"
            contract Solo() {
                function main(int a) {
                    require(a == 1);
                }
            }
        "#,
    );
    assert!(!ir.contains(&IrOp::Op(ScriptOp::If)));
    assert!(!ir.contains(&IrOp::Op(ScriptOp::EndIf)));
}

#[test]
fn dispatch_nests_one_conditional_per_function() {
    let ir = lower(
        r#"
            contract Duo() {
                function first(int a) {
                    require(a == 1);
                }
                function second(int b) {
                    require(b == 2);
                }
            }
        "#,
    );
    assert_eq!(
        ir,
        vec![
            IrOp::Get(0),
            IrOp::PushInt(0),
            IrOp::Op(ScriptOp::NumEqual),
            IrOp::Op(ScriptOp::If),
            IrOp::Get(1),
            IrOp::PushInt(1),
            IrOp::Op(ScriptOp::NumEqual),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::PushBool(true),
            IrOp::Op(ScriptOp::Else),
            IrOp::Get(0),
            IrOp::PushInt(1),
            IrOp::Op(ScriptOp::NumEqual),
            IrOp::Op(ScriptOp::If),
            IrOp::Get(1),
            IrOp::PushInt(2),
            IrOp::Op(ScriptOp::NumEqual),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::PushBool(true),
            IrOp::Op(ScriptOp::Else),
            IrOp::PushBool(false),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::EndIf),
            IrOp::Op(ScriptOp::EndIf),
        ]
    );
}

#[test]
fn branch_arms_restore_the_simulated_stack() {
    let ir = lower(
        r#"
            contract Branchy() {
                function main(bool flag, int x) {
                    int result = 1;
                    if (flag) {
                        int bump = 2;
                        result = bump + x;
                    } else {
                        result = 3;
                    }
                    require(result > 0);
                }
            }
        "#,
    );
    assert_eq!(
        ir,
        vec![
            IrOp::PushInt(1),
            IrOp::Get(2),
            IrOp::Op(ScriptOp::If),
            IrOp::PushInt(2),
            IrOp::Get(0),
            IrOp::Get(3),
            IrOp::Op(ScriptOp::Add),
            IrOp::Replace(2),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Else),
            IrOp::PushInt(3),
            IrOp::Replace(1),
            IrOp::Op(ScriptOp::EndIf),
            IrOp::Get(0),
            IrOp::PushInt(0),
            IrOp::Op(ScriptOp::GreaterThan),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::PushBool(true),
        ]
    );
}

#[test]
fn multisig_consumes_placeholder_and_every_array_slot() {
    let ir = lower(
        r#"
            contract Vault() {
                function spend(sig s1, sig s2, pubkey k1, pubkey k2, pubkey k3) {
                    require(checkMultiSig([s1, s2], [k1, k2, k3]));
                }
            }
        "#,
    );
    assert_eq!(
        ir,
        vec![
            IrOp::PushBool(false),
            IrOp::Get(5),
            IrOp::Get(5),
            IrOp::PushInt(2),
            IrOp::Get(6),
            IrOp::Get(6),
            IrOp::Get(6),
            IrOp::PushInt(3),
            IrOp::Op(ScriptOp::CheckMultiSig),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::Op(ScriptOp::Drop),
            IrOp::PushBool(true),
        ]
    );
}

#[test]
fn every_function_arm_ends_with_a_single_true_result() {
    let ir = lower(
        r#"
            contract Duo() {
                function first(int a) {
                    require(a == 1);
                }
                function second(bytes b) {
                    require(b.length == 2);
                }
            }
        "#,
    );
    let trues = ir.iter().filter(|op| **op == IrOp::PushBool(true)).count();
    assert_eq!(trues, 2, "one true result per function arm");
    let else_count = ir.iter().filter(|op| **op == IrOp::Op(ScriptOp::Else)).count();
    assert_eq!(else_count, 2, "every candidate chains through an else arm");
}

#[test]
fn split_consumes_two_slots_and_produces_a_pair() {
    let ir = lower(
        r#"
            contract Splitter() {
                function main(bytes payload) {
                    require(payload.split(1)[1] == 0x02);
                }
            }
        "#,
    );
    assert_eq!(
        ir,
        vec![
            IrOp::Get(0),
            IrOp::PushInt(1),
            IrOp::Op(ScriptOp::Split),
            IrOp::Op(ScriptOp::Nip),
            IrOp::PushBytes(vec![0x02]),
            IrOp::Op(ScriptOp::ByteEqual),
            IrOp::Op(ScriptOp::Verify),
            IrOp::Op(ScriptOp::Drop),
            IrOp::PushBool(true),
        ]
    );
}
