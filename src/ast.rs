use pest::iterators::Pair;
use pest::Parser;
use serde::{Deserialize, Serialize};

use crate::errors::CompilerError;
use crate::parser::{LockScriptParser, Rule};
use crate::types::{PrimitiveType, Type};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSpan {
    pub line: u32,
    pub col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn from_span(span: pest::Span<'_>) -> Self {
        let (line, col) = span.start_pos().line_col();
        let (end_line, end_col) = span.end_pos().line_col();
        Self { line: line as u32, col: col as u32, end_line: end_line as u32, end_col: end_col as u32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractNode {
    pub name: String,
    pub params: Vec<ParamNode>,
    pub functions: Vec<FunctionNode>,
    #[serde(skip)]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub params: Vec<ParamNode>,
    pub body: Vec<Statement>,
    #[serde(skip)]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamNode {
    pub ty: PrimitiveType,
    pub name: String,
    #[serde(skip)]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statement {
    #[serde(skip)]
    pub span: Option<SourceSpan>,
    #[serde(flatten)]
    pub kind: StatementKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StatementKind {
    VariableDefinition { ty: PrimitiveType, name: String, expr: Expr },
    Assign { name: String, expr: Expr },
    TimeOp { tx_var: TimeVar, expr: Expr },
    Require { expr: Expr },
    If { condition: Expr, then_branch: Vec<Statement>, else_branch: Option<Vec<Statement>> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TimeVar {
    ThisAge,
    TxTime,
}

/// An expression node. `ty` is filled in by the type checker before the
/// tree reaches the instruction selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expr {
    #[serde(skip)]
    pub span: Option<SourceSpan>,
    #[serde(skip)]
    pub ty: Option<Type>,
    #[serde(flatten)]
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Option<SourceSpan>) -> Self {
        Self { span, ty: None, kind }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExprKind {
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    Identifier(String),
    Array(Vec<Expr>),
    Call { name: String, args: Vec<Expr> },
    Cast { target: PrimitiveType, expr: Box<Expr> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    SizeOf { expr: Box<Expr> },
    Split { source: Box<Expr>, index: Box<Expr> },
    TupleIndex { tuple: Box<Expr>, index: i64 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Not => "!",
            Self::Neg => "-",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        })
    }
}

pub fn parse_contract(source: &str) -> Result<ContractNode, CompilerError> {
    let mut pairs = LockScriptParser::parse(Rule::source_file, source)?;
    let source_pair = pairs.next().ok_or_else(|| CompilerError::Unsupported("empty source".to_string()))?;
    let contract_pair = source_pair
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::contract_definition)
        .ok_or_else(|| CompilerError::Unsupported("no contract definition".to_string()))?;
    parse_contract_definition(contract_pair)
}

fn parse_contract_definition(pair: Pair<'_, Rule>) -> Result<ContractNode, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut inner = pair.into_inner();
    let name_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing contract name".to_string()))?;
    let params_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing contract parameters".to_string()))?;
    let params = parse_parameter_list(params_pair)?;

    let mut functions = Vec::new();
    for item in inner {
        if item.as_rule() == Rule::function_definition {
            functions.push(parse_function_definition(item)?);
        }
    }

    Ok(ContractNode { name: name_pair.as_str().to_string(), params, functions, span })
}

fn parse_function_definition(pair: Pair<'_, Rule>) -> Result<FunctionNode, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut inner = pair.into_inner();
    let name_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing function name".to_string()))?;
    let params_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing function parameters".to_string()))?;
    let params = parse_parameter_list(params_pair)?;

    let mut body = Vec::new();
    for stmt in inner {
        body.push(parse_statement(stmt)?);
    }

    Ok(FunctionNode { name: name_pair.as_str().to_string(), params, body, span })
}

fn parse_parameter_list(pair: Pair<'_, Rule>) -> Result<Vec<ParamNode>, CompilerError> {
    let mut params = Vec::new();
    for param in pair.into_inner() {
        if param.as_rule() != Rule::parameter {
            continue;
        }
        let span = Some(SourceSpan::from_span(param.as_span()));
        let mut inner = param.into_inner();
        let ty = parse_type_name(inner.next().ok_or_else(|| CompilerError::Unsupported("missing parameter type".to_string()))?)?;
        let name = inner.next().ok_or_else(|| CompilerError::Unsupported("missing parameter name".to_string()))?.as_str().to_string();
        params.push(ParamNode { ty, name, span });
    }
    Ok(params)
}

fn parse_type_name(pair: Pair<'_, Rule>) -> Result<PrimitiveType, CompilerError> {
    let name = pair.as_str().trim();
    PrimitiveType::from_name(name).ok_or_else(|| CompilerError::Unsupported(format!("type '{name}' is not supported")))
}

fn parse_statement(pair: Pair<'_, Rule>) -> Result<Statement, CompilerError> {
    if pair.as_rule() == Rule::statement {
        return match pair.into_inner().next() {
            Some(inner) => parse_statement(inner),
            None => Err(CompilerError::Unsupported("empty statement".to_string())),
        };
    }

    let span = Some(SourceSpan::from_span(pair.as_span()));

    let kind = match pair.as_rule() {
        Rule::variable_definition => {
            let mut inner = pair.into_inner();
            let ty = parse_type_name(inner.next().ok_or_else(|| CompilerError::Unsupported("missing variable type".to_string()))?)?;
            let ident = inner.next().ok_or_else(|| CompilerError::Unsupported("missing variable name".to_string()))?;
            let expr_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing variable initializer".to_string()))?;
            let expr = parse_expression(expr_pair)?;
            StatementKind::VariableDefinition { ty, name: ident.as_str().to_string(), expr }
        }
        Rule::assign_statement => {
            let mut inner = pair.into_inner();
            let ident = inner.next().ok_or_else(|| CompilerError::Unsupported("missing assignment name".to_string()))?;
            let expr_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing assignment expression".to_string()))?;
            let expr = parse_expression(expr_pair)?;
            StatementKind::Assign { name: ident.as_str().to_string(), expr }
        }
        Rule::time_op_statement => {
            let mut inner = pair.into_inner();
            let tx_var = inner.next().ok_or_else(|| CompilerError::Unsupported("missing time variable".to_string()))?;
            let expr_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing time expression".to_string()))?;
            let expr = parse_expression(expr_pair)?;
            let tx_var = match tx_var.as_str() {
                "this.age" => TimeVar::ThisAge,
                "tx.time" => TimeVar::TxTime,
                other => return Err(CompilerError::Unsupported(format!("unsupported time variable: {other}"))),
            };
            StatementKind::TimeOp { tx_var, expr }
        }
        Rule::require_statement => {
            let mut inner = pair.into_inner();
            let expr_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing require expression".to_string()))?;
            let expr = parse_expression(expr_pair)?;
            StatementKind::Require { expr }
        }
        Rule::if_statement => {
            let mut inner = pair.into_inner();
            let cond_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing if condition".to_string()))?;
            let condition = parse_expression(cond_pair)?;
            let then_block = inner.next().ok_or_else(|| CompilerError::Unsupported("missing if block".to_string()))?;
            let then_branch = parse_block(then_block)?;
            let else_branch = inner.next().map(parse_block).transpose()?;
            StatementKind::If { condition, then_branch, else_branch }
        }
        other => return Err(CompilerError::Unsupported(format!("unexpected statement: {other:?}"))),
    };

    Ok(Statement { span, kind })
}

fn parse_block(pair: Pair<'_, Rule>) -> Result<Vec<Statement>, CompilerError> {
    pair.into_inner().map(parse_statement).collect()
}

fn parse_expression(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    match pair.as_rule() {
        Rule::expression | Rule::parenthesized | Rule::primary | Rule::literal => parse_expression(single_inner(pair)?),
        Rule::logical_or | Rule::logical_and | Rule::equality | Rule::comparison | Rule::term | Rule::factor => parse_infix(pair),
        Rule::unary => parse_unary(pair),
        Rule::postfix => parse_postfix(pair),
        Rule::number_literal => parse_number_literal(pair),
        Rule::NumberLiteral => {
            let span = Some(SourceSpan::from_span(pair.as_span()));
            Ok(Expr::new(ExprKind::Int(parse_number(pair.as_str())?), span))
        }
        Rule::BooleanLiteral => {
            let span = Some(SourceSpan::from_span(pair.as_span()));
            Ok(Expr::new(ExprKind::Bool(pair.as_str() == "true"), span))
        }
        Rule::HexLiteral => {
            let span = Some(SourceSpan::from_span(pair.as_span()));
            Ok(Expr::new(ExprKind::Bytes(parse_hex_literal(pair.as_str())?), span))
        }
        Rule::StringLiteral => {
            let span = Some(SourceSpan::from_span(pair.as_span()));
            Ok(Expr::new(ExprKind::Str(parse_string_literal(pair.as_str())), span))
        }
        Rule::DateLiteral => parse_date_literal(pair),
        Rule::Identifier => {
            let span = Some(SourceSpan::from_span(pair.as_span()));
            Ok(Expr::new(ExprKind::Identifier(pair.as_str().to_string()), span))
        }
        Rule::array => parse_array(pair),
        Rule::function_call => parse_function_call(pair),
        Rule::cast => parse_cast(pair),
        other => Err(CompilerError::Unsupported(format!("unexpected expression: {other:?}"))),
    }
}

fn parse_infix(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut inner = pair.into_inner();
    let first = inner.next().ok_or_else(|| CompilerError::Unsupported("missing infix operand".to_string()))?;
    let mut expr = parse_expression(first)?;

    while let Some(op_pair) = inner.next() {
        let rhs_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing infix rhs".to_string()))?;
        let op = map_binary_op(op_pair.as_str())?;
        let rhs = parse_expression(rhs_pair)?;
        expr = Expr::new(ExprKind::Binary { op, left: Box::new(expr), right: Box::new(rhs) }, span);
    }

    Ok(expr)
}

fn map_binary_op(text: &str) -> Result<BinaryOp, CompilerError> {
    let op = match text {
        "||" => BinaryOp::Or,
        "&&" => BinaryOp::And,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Mod,
        other => return Err(CompilerError::Unsupported(format!("binary operator '{other}'"))),
    };
    Ok(op)
}

fn parse_unary(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let mut inner = pair.into_inner();
    let mut ops = Vec::new();
    while let Some(next) = inner.peek() {
        if next.as_rule() != Rule::unary_op {
            break;
        }
        let op = match inner.next().expect("peeked").as_str() {
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            other => return Err(CompilerError::Unsupported(format!("unary operator '{other}'"))),
        };
        ops.push(op);
    }

    let operand = inner.next().ok_or_else(|| CompilerError::Unsupported("missing unary operand".to_string()))?;
    let mut expr = parse_expression(operand)?;
    for op in ops.into_iter().rev() {
        let span = expr.span;
        expr = match (op, expr.kind) {
            // negative literals fold at parse time
            (UnaryOp::Neg, ExprKind::Int(value)) => Expr::new(ExprKind::Int(-value), span),
            (op, kind) => Expr::new(ExprKind::Unary { op, expr: Box::new(Expr { span, ty: None, kind }) }, span),
        };
    }
    Ok(expr)
}

fn parse_postfix(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let mut inner = pair.into_inner();
    let primary = inner.next().ok_or_else(|| CompilerError::Unsupported("missing primary in postfix".to_string()))?;
    let mut expr = parse_expression(primary)?;

    for postfix in inner {
        let op = single_inner(postfix)?;
        let span = Some(SourceSpan::from_span(op.as_span()));
        expr = match op.as_rule() {
            Rule::split_call => {
                let index = parse_expression(single_inner(op)?)?;
                Expr::new(ExprKind::Split { source: Box::new(expr), index: Box::new(index) }, span)
            }
            Rule::tuple_index => {
                let number = single_inner(op)?;
                let index = parse_number(number.as_str())?;
                Expr::new(ExprKind::TupleIndex { tuple: Box::new(expr), index }, span)
            }
            Rule::size_suffix => Expr::new(ExprKind::SizeOf { expr: Box::new(expr) }, span),
            other => return Err(CompilerError::Unsupported(format!("postfix operator not supported: {other:?}"))),
        };
    }
    Ok(expr)
}

fn parse_array(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut values = Vec::new();
    if let Some(list) = pair.into_inner().next() {
        values = parse_expression_list(list)?;
    }
    Ok(Expr::new(ExprKind::Array(values), span))
}

fn parse_function_call(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or_else(|| CompilerError::Unsupported("missing function name".to_string()))?.as_str().to_string();
    let args = match inner.next() {
        Some(list) => parse_expression_list(list)?,
        None => Vec::new(),
    };
    Ok(Expr::new(ExprKind::Call { name, args }, span))
}

fn parse_cast(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut inner = pair.into_inner();
    let target = parse_type_name(inner.next().ok_or_else(|| CompilerError::Unsupported("missing cast type".to_string()))?)?;
    let expr_pair = inner.next().ok_or_else(|| CompilerError::Unsupported("missing cast operand".to_string()))?;
    let expr = parse_expression(expr_pair)?;
    Ok(Expr::new(ExprKind::Cast { target, expr: Box::new(expr) }, span))
}

fn parse_expression_list(pair: Pair<'_, Rule>) -> Result<Vec<Expr>, CompilerError> {
    pair.into_inner().map(parse_expression).collect()
}

fn parse_number(raw: &str) -> Result<i64, CompilerError> {
    let invalid = || CompilerError::InvalidLiteral(format!("invalid number literal '{raw}'"));
    let cleaned = raw.replace('_', "");
    if let Some((base_str, exp_str)) = cleaned.split_once('e').or_else(|| cleaned.split_once('E')) {
        let base: i64 = base_str.parse().map_err(|_| invalid())?;
        let exp: u32 = exp_str.parse().map_err(|_| invalid())?;
        let pow = 10i128.checked_pow(exp).ok_or_else(invalid)?;
        let value = (base as i128).checked_mul(pow).ok_or_else(invalid)?;
        return i64::try_from(value).map_err(|_| invalid());
    }
    cleaned.parse().map_err(|_| invalid())
}

fn parse_number_literal(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let mut inner = pair.into_inner();
    let number = inner.next().ok_or_else(|| CompilerError::InvalidLiteral("missing number literal".to_string()))?;
    let mut value = parse_number(number.as_str())?;
    if let Some(unit_pair) = inner.next() {
        value = value.saturating_mul(unit_multiplier(unit_pair.as_str())?);
    }
    Ok(Expr::new(ExprKind::Int(value), span))
}

fn unit_multiplier(unit: &str) -> Result<i64, CompilerError> {
    let multiplier = match unit {
        "seconds" => 1,
        "minutes" => 60,
        "hours" => 60 * 60,
        "days" => 24 * 60 * 60,
        "weeks" => 7 * 24 * 60 * 60,
        other => return Err(CompilerError::Unsupported(format!("number unit '{other}' not supported"))),
    };
    Ok(multiplier)
}

fn parse_hex_literal(raw: &str) -> Result<Vec<u8>, CompilerError> {
    let trimmed = raw.trim_start_matches("0x").trim_start_matches("0X");
    let normalized = if trimmed.len() % 2 != 0 { format!("0{trimmed}") } else { trimmed.to_string() };
    (0..normalized.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&normalized[i..i + 2], 16))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CompilerError::InvalidLiteral(format!("invalid hex literal '{raw}'")))
}

fn parse_string_literal(raw: &str) -> String {
    let unquoted = if (raw.starts_with('"') && raw.ends_with('"')) || (raw.starts_with('\'') && raw.ends_with('\'')) {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    unquoted.replace("\\\"", "\"").replace("\\'", "'")
}

fn parse_date_literal(pair: Pair<'_, Rule>) -> Result<Expr, CompilerError> {
    let span = Some(SourceSpan::from_span(pair.as_span()));
    let string_pair = single_inner(pair)?;
    let value = parse_string_literal(string_pair.as_str());
    let timestamp = NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| CompilerError::InvalidLiteral("invalid date literal".to_string()))?
        .and_utc()
        .timestamp();
    Ok(Expr::new(ExprKind::Int(timestamp), span))
}

fn single_inner(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>, CompilerError> {
    pair.into_inner().next().ok_or_else(|| CompilerError::Unsupported("expected inner pair".to_string()))
}
