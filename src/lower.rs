use crate::ast::{BinaryOp, ContractNode, Expr, ExprKind, FunctionNode, Statement, StatementKind, TimeVar, UnaryOp};
use crate::ir::{IrOp, ScriptOp};
use crate::types::{PrimitiveType, Type};

/// One slot of the simulated operand stack: a named binding, the function
/// selector, or an anonymous intermediate value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Named(String),
    Selector,
    Value,
}

/// Lowers a fully type-checked contract to abstract instructions. The
/// simulated stack is mutated in lock-step with every emitted instruction;
/// any mismatch between the two is a bug in an earlier stage and panics.
pub fn lower_contract(contract: &ContractNode) -> Vec<IrOp> {
    let mut generator = IrGenerator::default();
    generator.lower_contract(contract);
    generator.ops
}

#[derive(Debug, Default)]
struct IrGenerator {
    ops: Vec<IrOp>,
    stack: Vec<Slot>,
    scope_depth: usize,
}

impl IrGenerator {
    fn lower_contract(&mut self, contract: &ContractNode) {
        if let [function] = contract.functions.as_slice() {
            // a single entry point needs no dispatch machinery
            self.seed_contract_params(contract);
            self.lower_function(function);
            return;
        }

        self.stack.push(Slot::Selector);
        // contract arguments are prepended to the locking script by the
        // artifact tooling, so they sit above the caller-pushed selector
        self.seed_contract_params(contract);

        let last = contract.functions.len() - 1;
        for (index, function) in contract.functions.iter().enumerate() {
            let snapshot = self.stack.clone();
            let depth = self.selector_depth();
            self.emit(IrOp::Get(depth));
            self.push_value();
            self.emit(IrOp::PushInt(index as i64));
            self.push_value();
            self.emit(IrOp::Op(ScriptOp::NumEqual));
            self.pop_slots(2);
            self.push_value();
            self.emit(IrOp::Op(ScriptOp::If));
            self.pop_slots(1);

            self.lower_function(function);

            self.emit(IrOp::Op(ScriptOp::Else));
            self.stack = snapshot;
            if index == last {
                // no candidate matched: fail the script
                self.emit(IrOp::PushBool(false));
                self.push_value();
                self.emit(IrOp::Op(ScriptOp::Verify));
                self.pop_slots(1);
            }
        }
        for _ in &contract.functions {
            self.emit(IrOp::Op(ScriptOp::EndIf));
        }
        self.stack = vec![Slot::Value];
    }

    fn seed_contract_params(&mut self, contract: &ContractNode) {
        for param in &contract.params {
            self.stack.push(Slot::Named(param.name.clone()));
        }
    }

    fn lower_function(&mut self, function: &FunctionNode) {
        // the spender pushes function arguments first, so they sit below
        // everything already tracked
        let mut seeded: Vec<Slot> = function.params.iter().map(|param| Slot::Named(param.name.clone())).collect();
        seeded.append(&mut self.stack);
        self.stack = seeded;

        for statement in &function.body {
            self.lower_statement(statement);
        }
        self.clean_stack();
    }

    /// The machine's final-result convention: nothing of the function's
    /// working set survives, a single `true` remains.
    fn clean_stack(&mut self) {
        for _ in 0..self.stack.len() {
            self.emit(IrOp::Op(ScriptOp::Drop));
        }
        self.stack.clear();
        self.emit(IrOp::PushBool(true));
        self.push_value();
    }

    fn lower_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::VariableDefinition { name, expr, .. } => {
                self.lower_expr(expr);
                self.rename_top(name);
            }
            StatementKind::Assign { name, expr } => {
                self.lower_expr(expr);
                if self.scope_depth > 0 {
                    // branch scopes must not change the stack shape
                    let depth = self.slot_depth(name);
                    self.emit(IrOp::Replace(depth));
                    self.pop_slots(1);
                } else {
                    // cheaper at the top level: abandon the stale slot and
                    // rebind the name to the freshly computed value
                    self.demote(name);
                    self.rename_top(name);
                }
            }
            StatementKind::Require { expr } => {
                self.lower_expr(expr);
                self.emit(IrOp::Op(ScriptOp::Verify));
                self.pop_slots(1);
            }
            StatementKind::TimeOp { tx_var, expr } => {
                self.lower_expr(expr);
                let op = match tx_var {
                    TimeVar::ThisAge => ScriptOp::CheckSequence,
                    TimeVar::TxTime => ScriptOp::CheckLockTime,
                };
                self.emit(IrOp::Op(op));
                self.pop_slots(1);
            }
            StatementKind::If { condition, then_branch, else_branch } => {
                self.lower_branch(condition, then_branch, else_branch.as_deref());
            }
        }
    }

    fn lower_branch(&mut self, condition: &Expr, then_branch: &[Statement], else_branch: Option<&[Statement]>) {
        self.lower_expr(condition);
        self.emit(IrOp::Op(ScriptOp::If));
        self.pop_slots(1);

        self.scope_depth += 1;
        let entry = self.stack.clone();

        for statement in then_branch {
            self.lower_statement(statement);
        }
        self.drop_scoped(entry.len());
        assert_eq!(self.stack, entry, "then branch must leave the simulated stack unchanged");

        if let Some(else_branch) = else_branch {
            self.emit(IrOp::Op(ScriptOp::Else));
            for statement in else_branch {
                self.lower_statement(statement);
            }
            self.drop_scoped(entry.len());
            assert_eq!(self.stack, entry, "else branch must leave the simulated stack unchanged");
        }

        self.emit(IrOp::Op(ScriptOp::EndIf));
        self.scope_depth -= 1;
    }

    fn drop_scoped(&mut self, depth_before: usize) {
        while self.stack.len() > depth_before {
            self.emit(IrOp::Op(ScriptOp::Drop));
            self.pop_slots(1);
        }
    }

    fn lower_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(value) => {
                self.emit(IrOp::PushInt(*value));
                self.push_value();
            }
            ExprKind::Bool(value) => {
                self.emit(IrOp::PushBool(*value));
                self.push_value();
            }
            ExprKind::Bytes(bytes) => {
                self.emit(IrOp::PushBytes(bytes.clone()));
                self.push_value();
            }
            ExprKind::Str(value) => {
                self.emit(IrOp::PushBytes(value.clone().into_bytes()));
                self.push_value();
            }
            ExprKind::Identifier(name) => {
                let depth = self.slot_depth(name);
                self.emit(IrOp::Get(depth));
                self.push_value();
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    self.lower_expr(element);
                }
                self.emit(IrOp::PushInt(elements.len() as i64));
                self.push_value();
            }
            ExprKind::Call { name, args } => self.lower_call(name, args),
            ExprKind::Cast { .. } => self.lower_cast(expr),
            ExprKind::Unary { op, expr: inner } => {
                self.lower_expr(inner);
                let op = match op {
                    UnaryOp::Not => ScriptOp::Not,
                    UnaryOp::Neg => ScriptOp::Negate,
                };
                self.emit(IrOp::Op(op));
                self.pop_slots(1);
                self.push_value();
            }
            ExprKind::Binary { op, left, right } => {
                self.lower_expr(left);
                self.lower_expr(right);
                let numeric = left.ty == Some(Type::Primitive(PrimitiveType::Int));
                self.lower_binary_op(*op, numeric);
                self.pop_slots(2);
                self.push_value();
            }
            ExprKind::SizeOf { expr: inner } => {
                self.lower_expr(inner);
                self.emit(IrOp::Op(ScriptOp::Size));
                self.pop_slots(1);
                self.push_value();
            }
            ExprKind::Split { source, index } => {
                self.lower_expr(source);
                self.lower_expr(index);
                self.emit(IrOp::Op(ScriptOp::Split));
                self.pop_slots(2);
                self.push_value();
                self.push_value();
            }
            ExprKind::TupleIndex { tuple, index } => {
                self.lower_expr(tuple);
                match index {
                    // the pair sits as two slots, right part on top
                    0 => {
                        self.emit(IrOp::Op(ScriptOp::Drop));
                        self.pop_slots(1);
                    }
                    1 => {
                        self.emit(IrOp::Op(ScriptOp::Nip));
                        self.nip_slot();
                    }
                    other => panic!("tuple index {other} must be rejected by the type checker"),
                }
            }
        }
    }

    /// Every legal cast is a type repaint on this machine: numbers are
    /// already minimally-encoded byte strings, and the tagged byte kinds
    /// share the plain bytes representation.
    fn lower_cast(&mut self, expr: &Expr) {
        let ExprKind::Cast { expr: inner, .. } = &expr.kind else {
            panic!("lower_cast called on a non-cast node");
        };
        self.lower_expr(inner);
        self.pop_slots(1);
        self.push_value();
    }

    fn lower_binary_op(&mut self, op: BinaryOp, numeric: bool) {
        use ScriptOp::*;
        let ops: &[ScriptOp] = match op {
            BinaryOp::Or => &[BoolOr],
            BinaryOp::And => &[BoolAnd],
            BinaryOp::Eq => {
                if numeric {
                    &[NumEqual]
                } else {
                    &[ByteEqual]
                }
            }
            BinaryOp::Ne => {
                if numeric {
                    &[NumNotEqual]
                } else {
                    &[ByteEqual, Not]
                }
            }
            BinaryOp::Lt => &[LessThan],
            BinaryOp::Le => &[LessThanOrEqual],
            BinaryOp::Gt => &[GreaterThan],
            BinaryOp::Ge => &[GreaterThanOrEqual],
            BinaryOp::Add => {
                if numeric {
                    &[Add]
                } else {
                    &[Cat]
                }
            }
            BinaryOp::Sub => &[Sub],
            BinaryOp::Mul => &[Mul],
            BinaryOp::Div => &[Div],
            BinaryOp::Mod => &[Mod],
        };
        for op in ops {
            self.emit(IrOp::Op(*op));
        }
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) {
        if name == "checkMultiSig" {
            return self.lower_multisig(args);
        }
        for arg in args {
            self.lower_expr(arg);
        }
        let op = match name {
            "abs" => ScriptOp::Abs,
            "min" => ScriptOp::Min,
            "max" => ScriptOp::Max,
            "within" => ScriptOp::Within,
            "sha256" => ScriptOp::Sha256,
            "blake2b" => ScriptOp::Blake2b,
            "checkSig" => ScriptOp::CheckSig,
            other => panic!("unknown builtin '{other}' must be rejected by the type checker"),
        };
        self.emit(IrOp::Op(op));
        self.pop_slots(args.len());
        self.push_value();
    }

    /// The multisig opcode's calling convention wants a throwaway bottom
    /// element under the signature and key groups. Both arrays lower in
    /// place (elements, then the group length); the opcode consumes the
    /// placeholder and every array slot and leaves one result.
    fn lower_multisig(&mut self, args: &[Expr]) {
        let [sigs_arg, pks_arg] = args else {
            panic!("checkMultiSig arity must be enforced by the type checker");
        };
        let (ExprKind::Array(sigs), ExprKind::Array(pks)) = (&sigs_arg.kind, &pks_arg.kind) else {
            panic!("checkMultiSig arguments must be array literals");
        };

        self.emit(IrOp::PushBool(false));
        self.push_value();
        self.lower_expr(sigs_arg);
        self.lower_expr(pks_arg);
        self.emit(IrOp::Op(ScriptOp::CheckMultiSig));
        self.pop_slots(1 + sigs.len() + 1 + pks.len() + 1);
        self.push_value();
    }

    fn emit(&mut self, op: IrOp) {
        self.ops.push(op);
    }

    fn push_value(&mut self) {
        self.stack.push(Slot::Value);
    }

    fn pop_slots(&mut self, count: usize) {
        for _ in 0..count {
            self.stack.pop().expect("simulated stack underflow");
        }
    }

    fn nip_slot(&mut self) {
        let len = self.stack.len();
        assert!(len >= 2, "simulated stack underflow");
        self.stack.remove(len - 2);
    }

    fn rename_top(&mut self, name: &str) {
        let top = self.stack.last_mut().expect("value on the simulated stack");
        *top = Slot::Named(name.to_string());
    }

    /// Abandons the current slot of `name`; the stale value stays on the
    /// machine stack until function cleanup drops it.
    fn demote(&mut self, name: &str) {
        let position = self
            .stack
            .iter()
            .rposition(|slot| matches!(slot, Slot::Named(n) if n == name))
            .unwrap_or_else(|| panic!("binding '{name}' missing from the simulated stack"));
        self.stack[position] = Slot::Value;
    }

    /// Offset of `name` from the top of the simulated stack.
    fn slot_depth(&self, name: &str) -> usize {
        self.stack
            .iter()
            .rev()
            .position(|slot| matches!(slot, Slot::Named(n) if n == name))
            .unwrap_or_else(|| panic!("binding '{name}' missing from the simulated stack"))
    }

    fn selector_depth(&self) -> usize {
        self.stack.iter().rev().position(|slot| *slot == Slot::Selector).expect("selector slot seeded")
    }
}
