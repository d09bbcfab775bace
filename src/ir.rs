/// An abstract instruction produced by the instruction selector and
/// consumed by the assembler. Positional ops address the operand stack
/// relative to its top; everything else is a fixed machine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrOp {
    PushInt(i64),
    PushBool(bool),
    PushBytes(Vec<u8>),
    /// Copy the item `depth` positions below the top onto the top.
    Get(usize),
    /// Overwrite the item `depth` positions below the top with the top
    /// value, shrinking the stack by one.
    Replace(usize),
    Op(ScriptOp),
}

/// Fixed machine operations. Most encode to a single opcode; `Size` and
/// `Split` expand to short fixed sequences in the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    If,
    Else,
    EndIf,
    Verify,
    Drop,
    Nip,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,
    Abs,
    Min,
    Max,
    Within,
    Not,
    BoolAnd,
    BoolOr,
    NumEqual,
    NumNotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ByteEqual,
    Cat,
    Size,
    Split,
    Sha256,
    Blake2b,
    CheckSig,
    CheckMultiSig,
    CheckSequence,
    CheckLockTime,
}
