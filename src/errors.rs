use kaspa_txscript::script_builder::ScriptBuilderError;
use thiserror::Error;

use crate::ast::SourceSpan;
use crate::parser::Rule;
use crate::types::Type;

/// A single semantic diagnostic, one variant per detectable kind. Each
/// carries the structured fields a front end needs to render a message and
/// the source span of the offending node when the parser recorded one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("undefined reference to symbol '{name}'{}", at(.span))]
    UndefinedReference { name: String, span: Option<SourceSpan> },
    #[error("redefinition of function '{name}'{}", at(.span))]
    FunctionRedefinition { name: String, span: Option<SourceSpan> },
    #[error("redefinition of variable '{name}'{}", at(.span))]
    VariableRedefinition { name: String, span: Option<SourceSpan> },
    #[error("unused variable '{name}'{}", at(.span))]
    UnusedVariable { name: String, span: Option<SourceSpan> },
    #[error("operator '{op}' applied to unequal types '{left}' and '{right}'{}", at(.span))]
    UnequalTypes { op: String, left: Type, right: Type, span: Option<SourceSpan> },
    #[error("operator '{op}' applied to unsupported type '{actual}'{}", at(.span))]
    UnsupportedType { op: String, actual: Type, span: Option<SourceSpan> },
    #[error("'split' called on unsupported type '{actual}'{}", at(.span))]
    SplitReceiverType { actual: Type, span: Option<SourceSpan> },
    #[error("'split' called with unsupported index type '{actual}'{}", at(.span))]
    SplitIndexType { actual: Type, span: Option<SourceSpan> },
    #[error(
        "invalid parameter types in call to '{name}': found ({}), expected ({}){}",
        join_types(.actual),
        join_types(.expected),
        at(.span)
    )]
    InvalidParameterTypes { name: String, actual: Vec<Type>, expected: Vec<Type>, span: Option<SourceSpan> },
    #[error("type '{actual}' cannot be assigned to variable '{name}' of type '{expected}'{}", at(.span))]
    AssignTypeMismatch { name: String, actual: Type, expected: Type, span: Option<SourceSpan> },
    #[error("type '{from}' is not castable to type '{to}'{}", at(.span))]
    NotCastable { from: Type, to: Type, span: Option<SourceSpan> },
    #[error("index {index} out of bounds{}", at(.span))]
    IndexOutOfBounds { index: i64, span: Option<SourceSpan> },
    #[error("expected primitive type{}", at(.span))]
    ExpectedPrimitiveType { span: Option<SourceSpan> },
    #[error("incorrect elements in array{}", at(.span))]
    IncorrectArrayElements { span: Option<SourceSpan> },
    #[error("condition always evaluates to {value}{}", at(.span))]
    ConstantCondition { value: bool, span: Option<SourceSpan> },
}

impl CompileError {
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Self::UndefinedReference { span, .. }
            | Self::FunctionRedefinition { span, .. }
            | Self::VariableRedefinition { span, .. }
            | Self::UnusedVariable { span, .. }
            | Self::UnequalTypes { span, .. }
            | Self::UnsupportedType { span, .. }
            | Self::SplitReceiverType { span, .. }
            | Self::SplitIndexType { span, .. }
            | Self::InvalidParameterTypes { span, .. }
            | Self::AssignTypeMismatch { span, .. }
            | Self::NotCastable { span, .. }
            | Self::IndexOutOfBounds { span, .. }
            | Self::ExpectedPrimitiveType { span }
            | Self::IncorrectArrayElements { span }
            | Self::ConstantCondition { span, .. } => *span,
        }
    }
}

fn at(span: &Option<SourceSpan>) -> String {
    match span {
        Some(span) => format!(" at {}:{}", span.line, span.col),
        None => String::new(),
    }
}

fn join_types(types: &[Type]) -> String {
    types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn join_errors(errors: &[CompileError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

/// Pipeline-level failure: a parse error, the collected semantic
/// diagnostics, or a script encoding error from the target machine's
/// builder.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("parse error: {0}")]
    Parse(#[from] pest::error::Error<Rule>),
    #[error("{}", join_errors(.0))]
    Check(Vec<CompileError>),
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),
    #[error("script build error: {0}")]
    ScriptBuild(#[from] ScriptBuilderError),
}
