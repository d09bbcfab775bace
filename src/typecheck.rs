use crate::ast::{BinaryOp, ContractNode, Expr, ExprKind, FunctionNode, ParamNode, SourceSpan, Statement, StatementKind, UnaryOp};
use crate::compiler::CompileOptions;
use crate::errors::CompileError;
use crate::symbols::{Binding, BindingKind, Scope, SymbolTable};
use crate::types::{explicitly_castable, implicitly_convertible, PrimitiveType, Type};

/// Parameter and result types of the global functions. `checkMultiSig` is
/// handled apart because it takes array literals.
pub fn builtin_signature(name: &str) -> Option<(&'static [PrimitiveType], Type)> {
    use PrimitiveType::*;
    let signature = match name {
        "abs" => (&[Int][..], Type::Primitive(Int)),
        "min" | "max" => (&[Int, Int][..], Type::Primitive(Int)),
        "within" => (&[Int, Int, Int][..], Type::Primitive(Bool)),
        "sha256" | "blake2b" => (&[Bytes][..], Type::Primitive(Bytes)),
        "checkSig" => (&[Sig, PubKey][..], Type::Primitive(Bool)),
        _ => return None,
    };
    Some(signature)
}

/// Annotates every expression with its resolved type and collects every
/// independently detectable diagnostic in one pass. Returns the demoted
/// warnings on success, or all hard errors on failure.
pub fn check_contract(contract: &mut ContractNode, options: &CompileOptions) -> Result<Vec<CompileError>, Vec<CompileError>> {
    let mut checker = TypeChecker {
        options: *options,
        table: SymbolTable::default(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    checker.visit_contract(contract);
    if checker.errors.is_empty() {
        Ok(checker.warnings)
    } else {
        Err(checker.errors)
    }
}

struct TypeChecker {
    options: CompileOptions,
    table: SymbolTable,
    errors: Vec<CompileError>,
    warnings: Vec<CompileError>,
}

impl TypeChecker {
    fn visit_contract(&mut self, contract: &mut ContractNode) {
        self.table.enter_scope();
        for param in &contract.params {
            self.declare_param(param);
        }
        for function in &contract.functions {
            self.declare(Binding {
                name: function.name.clone(),
                ty: Type::Primitive(PrimitiveType::Bool),
                kind: BindingKind::Function,
                span: function.span,
                used: false,
            });
        }
        for function in &mut contract.functions {
            self.visit_function(function);
        }
        let scope = self.table.exit_scope();
        self.report_unused(&scope);
    }

    fn visit_function(&mut self, function: &mut FunctionNode) {
        self.table.enter_scope();
        for param in &function.params {
            self.declare_param(param);
        }
        for statement in &mut function.body {
            self.visit_statement(statement);
        }
        let scope = self.table.exit_scope();
        self.report_unused(&scope);
    }

    fn declare_param(&mut self, param: &ParamNode) {
        self.declare(Binding {
            name: param.name.clone(),
            ty: Type::Primitive(param.ty),
            kind: BindingKind::Parameter,
            span: param.span,
            used: false,
        });
    }

    fn declare(&mut self, binding: Binding) {
        if let Err(error) = self.table.declare(binding) {
            self.errors.push(error);
        }
    }

    fn report_unused(&mut self, scope: &Scope) {
        let allow = self.options.allow_unused;
        for binding in scope.unused() {
            let diagnostic = CompileError::UnusedVariable { name: binding.name.clone(), span: binding.span };
            if allow {
                self.warnings.push(diagnostic);
            } else {
                self.errors.push(diagnostic);
            }
        }
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        let span = statement.span;
        match &mut statement.kind {
            StatementKind::VariableDefinition { ty, name, expr } => {
                let declared = *ty;
                let actual = self.visit_expr(expr);
                self.check_assignable(name, actual, declared, span);
                self.declare(Binding {
                    name: name.clone(),
                    ty: Type::Primitive(declared),
                    kind: BindingKind::Variable,
                    span,
                    used: false,
                });
            }
            StatementKind::Assign { name, expr } => {
                let actual = self.visit_expr(expr);
                // writing to a binding does not count as reading it
                let declared = match self.table.resolve_mut(name) {
                    Some(binding) if binding.kind != BindingKind::Function => binding.ty.primitive(),
                    _ => {
                        self.errors.push(CompileError::UndefinedReference { name: name.clone(), span });
                        None
                    }
                };
                if let Some(declared) = declared {
                    self.check_assignable(name, actual, declared, span);
                }
            }
            StatementKind::Require { expr } => {
                if let Some(actual) = self.visit_expr(expr) {
                    if actual != Type::Primitive(PrimitiveType::Bool) {
                        self.errors.push(CompileError::InvalidParameterTypes {
                            name: "require".to_string(),
                            actual: vec![actual],
                            expected: vec![Type::Primitive(PrimitiveType::Bool)],
                            span,
                        });
                    }
                }
                self.check_constant_condition(expr, span);
            }
            StatementKind::TimeOp { expr, .. } => {
                if let Some(actual) = self.visit_expr(expr) {
                    if actual != Type::Primitive(PrimitiveType::Int) {
                        self.errors.push(CompileError::UnsupportedType { op: ">=".to_string(), actual, span });
                    }
                }
            }
            StatementKind::If { condition, then_branch, else_branch } => {
                if let Some(actual) = self.visit_expr(condition) {
                    if actual != Type::Primitive(PrimitiveType::Bool) {
                        self.errors.push(CompileError::UnsupportedType { op: "if".to_string(), actual, span });
                    }
                }
                self.check_constant_condition(condition, span);
                self.visit_block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_block(else_branch);
                }
            }
        }
    }

    fn visit_block(&mut self, statements: &mut [Statement]) {
        self.table.enter_scope();
        for statement in statements {
            self.visit_statement(statement);
        }
        let scope = self.table.exit_scope();
        self.report_unused(&scope);
    }

    fn check_assignable(&mut self, name: &str, actual: Option<Type>, declared: PrimitiveType, span: Option<SourceSpan>) {
        let Some(actual) = actual else { return };
        match actual.primitive() {
            Some(primitive) => {
                if !implicitly_convertible(primitive, declared) {
                    self.errors.push(CompileError::AssignTypeMismatch {
                        name: name.to_string(),
                        actual,
                        expected: Type::Primitive(declared),
                        span,
                    });
                }
            }
            None => self.errors.push(CompileError::ExpectedPrimitiveType { span }),
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Option<Type> {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::Int(_) => Some(Type::Primitive(PrimitiveType::Int)),
            ExprKind::Bool(_) => Some(Type::Primitive(PrimitiveType::Bool)),
            ExprKind::Bytes(_) | ExprKind::Str(_) => Some(Type::Primitive(PrimitiveType::Bytes)),
            ExprKind::Identifier(name) => self.check_identifier(name, span),
            ExprKind::Array(elements) => self.check_array(elements, span),
            ExprKind::Call { name, args } => self.check_call(name, args, span),
            ExprKind::Cast { target, expr: inner } => self.check_cast(*target, inner, span),
            ExprKind::Unary { op, expr: inner } => self.check_unary(*op, inner, span),
            ExprKind::Binary { op, left, right } => self.check_binary(*op, left, right, span),
            ExprKind::SizeOf { expr: inner } => self.check_size(inner, span),
            ExprKind::Split { source, index } => self.check_split(source, index, span),
            ExprKind::TupleIndex { tuple, index } => self.check_tuple_index(tuple, *index, span),
        };
        expr.ty = ty;
        ty
    }

    fn check_identifier(&mut self, name: &str, span: Option<SourceSpan>) -> Option<Type> {
        match self.table.resolve_mut(name) {
            Some(binding) if binding.kind != BindingKind::Function => {
                binding.used = true;
                Some(binding.ty)
            }
            _ => {
                self.errors.push(CompileError::UndefinedReference { name: name.to_string(), span });
                None
            }
        }
    }

    fn check_array(&mut self, elements: &mut [Expr], span: Option<SourceSpan>) -> Option<Type> {
        let mut visited = Vec::with_capacity(elements.len());
        for element in elements.iter_mut() {
            visited.push(self.visit_expr(element));
        }
        let resolved: Vec<Type> = visited.into_iter().collect::<Option<_>>()?;
        let first = match resolved.first().and_then(|ty| ty.primitive()) {
            Some(primitive) => primitive,
            None => {
                self.errors.push(CompileError::IncorrectArrayElements { span });
                return None;
            }
        };
        if resolved.iter().all(|ty| ty.primitive() == Some(first)) {
            Some(Type::Array(first))
        } else {
            self.errors.push(CompileError::IncorrectArrayElements { span });
            None
        }
    }

    fn check_call(&mut self, name: &str, args: &mut [Expr], span: Option<SourceSpan>) -> Option<Type> {
        if name == "checkMultiSig" {
            return self.check_multisig(args, span);
        }
        let mut actual = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            actual.push(self.visit_expr(arg));
        }
        let Some((params, result)) = builtin_signature(name) else {
            self.errors.push(CompileError::UndefinedReference { name: name.to_string(), span });
            return None;
        };
        let actual: Vec<Type> = actual.into_iter().collect::<Option<_>>()?;
        let arity_matches = actual.len() == params.len();
        let types_match = arity_matches
            && actual
                .iter()
                .zip(params)
                .all(|(arg, param)| arg.primitive().is_some_and(|primitive| implicitly_convertible(primitive, *param)));
        if !types_match {
            self.errors.push(CompileError::InvalidParameterTypes {
                name: name.to_string(),
                actual,
                expected: params.iter().map(|param| Type::Primitive(*param)).collect(),
                span,
            });
        }
        Some(result)
    }

    fn check_multisig(&mut self, args: &mut [Expr], span: Option<SourceSpan>) -> Option<Type> {
        let expected = vec![Type::Array(PrimitiveType::Sig), Type::Array(PrimitiveType::PubKey)];
        let mut actual = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            actual.push(self.visit_expr(arg));
        }
        let actual: Vec<Type> = actual.into_iter().collect::<Option<_>>()?;
        if actual != expected {
            self.errors.push(CompileError::InvalidParameterTypes {
                name: "checkMultiSig".to_string(),
                actual,
                expected,
                span,
            });
        }
        Some(Type::Primitive(PrimitiveType::Bool))
    }

    fn check_cast(&mut self, target: PrimitiveType, inner: &mut Expr, span: Option<SourceSpan>) -> Option<Type> {
        let from = self.visit_expr(inner)?;
        let Some(primitive) = from.primitive() else {
            self.errors.push(CompileError::ExpectedPrimitiveType { span });
            return None;
        };
        if explicitly_castable(primitive, target) {
            Some(Type::Primitive(target))
        } else {
            self.errors.push(CompileError::NotCastable { from, to: Type::Primitive(target), span });
            None
        }
    }

    fn check_unary(&mut self, op: UnaryOp, inner: &mut Expr, span: Option<SourceSpan>) -> Option<Type> {
        let actual = self.visit_expr(inner)?;
        let expected = match op {
            UnaryOp::Not => PrimitiveType::Bool,
            UnaryOp::Neg => PrimitiveType::Int,
        };
        if actual == Type::Primitive(expected) {
            Some(actual)
        } else {
            self.errors.push(CompileError::UnsupportedType { op: op.to_string(), actual, span });
            None
        }
    }

    fn check_binary(&mut self, op: BinaryOp, left: &mut Expr, right: &mut Expr, span: Option<SourceSpan>) -> Option<Type> {
        use PrimitiveType::{Bool, Bytes, Int};
        let left_ty = self.visit_expr(left);
        let right_ty = self.visit_expr(right);
        let (left_ty, right_ty) = (left_ty?, right_ty?);

        let Some(l) = left_ty.primitive() else {
            self.errors.push(CompileError::ExpectedPrimitiveType { span });
            return None;
        };
        let Some(r) = right_ty.primitive() else {
            self.errors.push(CompileError::ExpectedPrimitiveType { span });
            return None;
        };

        let unified = if l == r {
            l
        } else if implicitly_convertible(l, r) {
            r
        } else if implicitly_convertible(r, l) {
            l
        } else if l.is_byte_like() && r.is_byte_like() {
            Bytes
        } else {
            self.errors.push(CompileError::UnequalTypes { op: op.to_string(), left: left_ty, right: right_ty, span });
            return None;
        };

        let unsupported = |checker: &mut Self| {
            checker.errors.push(CompileError::UnsupportedType { op: op.to_string(), actual: Type::Primitive(unified), span });
            None
        };

        match op {
            BinaryOp::And | BinaryOp::Or => {
                if unified == Bool {
                    Some(Type::Primitive(Bool))
                } else {
                    unsupported(self)
                }
            }
            BinaryOp::Eq | BinaryOp::Ne => Some(Type::Primitive(Bool)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if unified == Int {
                    Some(Type::Primitive(Bool))
                } else {
                    unsupported(self)
                }
            }
            BinaryOp::Add => {
                if unified == Int {
                    Some(Type::Primitive(Int))
                } else if unified.is_byte_like() {
                    Some(Type::Primitive(Bytes))
                } else {
                    unsupported(self)
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if unified == Int {
                    Some(Type::Primitive(Int))
                } else {
                    unsupported(self)
                }
            }
        }
    }

    fn check_size(&mut self, inner: &mut Expr, span: Option<SourceSpan>) -> Option<Type> {
        let actual = self.visit_expr(inner)?;
        if actual.is_byte_like() {
            Some(Type::Primitive(PrimitiveType::Int))
        } else {
            self.errors.push(CompileError::UnsupportedType { op: "length".to_string(), actual, span });
            None
        }
    }

    fn check_split(&mut self, source: &mut Expr, index: &mut Expr, span: Option<SourceSpan>) -> Option<Type> {
        let source_ty = self.visit_expr(source);
        let index_ty = self.visit_expr(index);
        let mut ok = true;
        match source_ty {
            Some(actual) if !actual.is_byte_like() => {
                self.errors.push(CompileError::SplitReceiverType { actual, span });
                ok = false;
            }
            Some(_) => {}
            None => ok = false,
        }
        match index_ty {
            Some(actual) if actual != Type::Primitive(PrimitiveType::Int) => {
                self.errors.push(CompileError::SplitIndexType { actual, span });
                ok = false;
            }
            Some(_) => {}
            None => ok = false,
        }
        ok.then_some(Type::Tuple)
    }

    fn check_tuple_index(&mut self, tuple: &mut Expr, index: i64, span: Option<SourceSpan>) -> Option<Type> {
        let actual = self.visit_expr(tuple)?;
        match actual {
            Type::Tuple => {
                if index == 0 || index == 1 {
                    Some(Type::Primitive(PrimitiveType::Bytes))
                } else {
                    self.errors.push(CompileError::IndexOutOfBounds { index, span });
                    None
                }
            }
            actual => {
                self.errors.push(CompileError::UnsupportedType { op: "index".to_string(), actual, span });
                None
            }
        }
    }

    fn check_constant_condition(&mut self, condition: &Expr, span: Option<SourceSpan>) {
        let Some(value) = fold_bool(condition) else { return };
        let diagnostic = CompileError::ConstantCondition { value, span };
        if self.options.allow_constant_conditions {
            self.warnings.push(diagnostic);
        } else {
            self.errors.push(diagnostic);
        }
    }
}

/// Conservative constant folding over literal conditions. Anything
/// involving a runtime value stays unfolded.
fn fold_bool(expr: &Expr) -> Option<bool> {
    match &expr.kind {
        ExprKind::Bool(value) => Some(*value),
        ExprKind::Unary { op: UnaryOp::Not, expr: inner } => fold_bool(inner).map(|value| !value),
        ExprKind::Binary { op, left, right } => match op {
            BinaryOp::And => Some(fold_bool(left)? && fold_bool(right)?),
            BinaryOp::Or => Some(fold_bool(left)? || fold_bool(right)?),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                fold_comparison(*op, left, right)
            }
            _ => None,
        },
        _ => None,
    }
}

fn fold_comparison(op: BinaryOp, left: &Expr, right: &Expr) -> Option<bool> {
    match (&left.kind, &right.kind) {
        (ExprKind::Int(a), ExprKind::Int(b)) => match op {
            BinaryOp::Eq => Some(a == b),
            BinaryOp::Ne => Some(a != b),
            BinaryOp::Lt => Some(a < b),
            BinaryOp::Le => Some(a <= b),
            BinaryOp::Gt => Some(a > b),
            BinaryOp::Ge => Some(a >= b),
            _ => None,
        },
        (ExprKind::Bool(a), ExprKind::Bool(b)) => match op {
            BinaryOp::Eq => Some(a == b),
            BinaryOp::Ne => Some(a != b),
            _ => None,
        },
        (ExprKind::Bytes(a), ExprKind::Bytes(b)) => match op {
            BinaryOp::Eq => Some(a == b),
            BinaryOp::Ne => Some(a != b),
            _ => None,
        },
        (ExprKind::Str(a), ExprKind::Str(b)) => match op {
            BinaryOp::Eq => Some(a == b),
            BinaryOp::Ne => Some(a != b),
            _ => None,
        },
        _ => None,
    }
}
