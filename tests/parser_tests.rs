use lockscript_lang::ast::{parse_contract, BinaryOp, ExprKind, StatementKind};
use lockscript_lang::errors::CompilerError;
use lockscript_lang::types::PrimitiveType;

#[test]
fn parses_contract_shape() {
    let source = r#"
        contract Escrow(pubkey arbiter) {
            function release(sig approval, int amount) {
                require(checkSig(approval, arbiter));
                require(amount > 0);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    assert_eq!(contract.name, "Escrow");
    assert_eq!(contract.params.len(), 1);
    assert_eq!(contract.params[0].name, "arbiter");
    assert_eq!(contract.params[0].ty, PrimitiveType::PubKey);
    assert_eq!(contract.functions.len(), 1);

    let function = &contract.functions[0];
    assert_eq!(function.name, "release");
    assert_eq!(function.params[0].ty, PrimitiveType::Sig);
    assert_eq!(function.params[1].ty, PrimitiveType::Int);
    assert_eq!(function.body.len(), 2);
    assert!(matches!(function.body[0].kind, StatementKind::Require { .. }));
}

#[test]
fn folds_negative_number_literals() {
    let source = r#"
        contract C() {
            function main() {
                int x = -5;
                require(x == -5);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    match &contract.functions[0].body[0].kind {
        StatementKind::VariableDefinition { expr, .. } => assert_eq!(expr.kind, ExprKind::Int(-5)),
        other => panic!("expected variable definition, got {other:?}"),
    }
}

#[test]
fn applies_time_units_and_separators() {
    let source = r#"
        contract C() {
            function main() {
                int t = 2 hours;
                int u = 1_000_000;
                int v = 1e3;
                require(t + u + v > 0);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    let values: Vec<i64> = contract.functions[0]
        .body
        .iter()
        .filter_map(|stmt| match &stmt.kind {
            StatementKind::VariableDefinition { expr, .. } => match expr.kind {
                ExprKind::Int(value) => Some(value),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![7200, 1_000_000, 1000]);
}

#[test]
fn resolves_date_literals_to_unix_timestamps() {
    let source = r#"
        contract C() {
            function main() {
                int deadline = date("2026-01-01T00:00:00");
                require(tx.time >= deadline);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    match &contract.functions[0].body[0].kind {
        StatementKind::VariableDefinition { expr, .. } => assert_eq!(expr.kind, ExprKind::Int(1_767_225_600)),
        other => panic!("expected variable definition, got {other:?}"),
    }
}

#[test]
fn pads_odd_length_hex_literals() {
    let source = r#"
        contract C() {
            function main(bytes data) {
                require(data == 0xfff);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    match &contract.functions[0].body[0].kind {
        StatementKind::Require { expr } => match &expr.kind {
            ExprKind::Binary { right, .. } => assert_eq!(right.kind, ExprKind::Bytes(vec![0x0f, 0xff])),
            other => panic!("expected binary expression, got {other:?}"),
        },
        other => panic!("expected require, got {other:?}"),
    }
}

#[test]
fn unescapes_string_literals() {
    let source = r#"
        contract C() {
            function main(bytes data) {
                require(data == "say \"hi\"");
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    match &contract.functions[0].body[0].kind {
        StatementKind::Require { expr } => match &expr.kind {
            ExprKind::Binary { right, .. } => assert_eq!(right.kind, ExprKind::Str("say \"hi\"".to_string())),
            other => panic!("expected binary expression, got {other:?}"),
        },
        other => panic!("expected require, got {other:?}"),
    }
}

#[test]
fn parses_time_checks_as_time_ops() {
    let source = r#"
        contract C() {
            function main(int delay) {
                require(this.age >= delay);
                require(tx.time >= 500);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    assert!(matches!(contract.functions[0].body[0].kind, StatementKind::TimeOp { .. }));
    assert!(matches!(contract.functions[0].body[1].kind, StatementKind::TimeOp { .. }));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let source = r#"
        contract C() {
            function main() {
                require(1 + 2 * 3 == 7);
            }
        }
    "#;
    let contract = parse_contract(source).expect("source parses");
    let StatementKind::Require { expr } = &contract.functions[0].body[0].kind else {
        panic!("expected require");
    };
    let ExprKind::Binary { op: BinaryOp::Eq, left, .. } = &expr.kind else {
        panic!("expected equality at the top");
    };
    let ExprKind::Binary { op: BinaryOp::Add, right, .. } = &left.kind else {
        panic!("expected addition under the equality");
    };
    assert!(matches!(&right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn records_statement_spans() {
    let source = "contract C() {\n    function main(int a) {\n        require(a == 1);\n    }\n}\n";
    let contract = parse_contract(source).expect("source parses");
    let span = contract.functions[0].body[0].span.expect("span recorded");
    assert_eq!(span.line, 3);
}

#[test]
fn rejects_missing_semicolon() {
    let source = r#"
        contract C() {
            function main(int a) {
                require(a == 1)
            }
        }
    "#;
    assert!(matches!(parse_contract(source), Err(CompilerError::Parse(_))));
}

#[test]
fn rejects_unknown_statement_form() {
    let source = r#"
        contract C() {
            function main(int a) {
                for (i, 0, 3) { require(a == i); }
            }
        }
    "#;
    assert!(parse_contract(source).is_err());
}
