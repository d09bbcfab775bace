use std::fmt;

use serde::{Deserialize, Serialize};

/// The primitive kinds of the language. Byte strings carry a tag so that
/// signatures and keys cannot be mixed up without an explicit cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Int,
    Bool,
    Bytes,
    PubKey,
    Sig,
    DataSig,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "bool" => Some(Self::Bool),
            "bytes" => Some(Self::Bytes),
            "pubkey" => Some(Self::PubKey),
            "sig" => Some(Self::Sig),
            "datasig" => Some(Self::DataSig),
            _ => None,
        }
    }

    pub fn is_byte_like(self) -> bool {
        matches!(self, Self::Bytes | Self::PubKey | Self::Sig | Self::DataSig)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::PubKey => "pubkey",
            Self::Sig => "sig",
            Self::DataSig => "datasig",
        };
        f.write_str(name)
    }
}

/// A resolved expression type. The surface language only has primitives;
/// `Tuple` is the pair produced by `split` and `Array` the homogeneous
/// literal arrays consumed by `checkMultiSig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Primitive(PrimitiveType),
    Tuple,
    Array(PrimitiveType),
}

impl Type {
    pub fn primitive(self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    pub fn is_byte_like(self) -> bool {
        self.primitive().is_some_and(PrimitiveType::is_byte_like)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => primitive.fmt(f),
            Self::Tuple => f.write_str("(bytes, bytes)"),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}

/// Implicit widening: a tagged byte kind may stand in wherever plain bytes
/// are expected. Nothing else converts silently.
pub fn implicitly_convertible(from: PrimitiveType, to: PrimitiveType) -> bool {
    from == to || (from.is_byte_like() && to == PrimitiveType::Bytes)
}

/// The explicit cast table. Numbers on the target machine are already
/// minimally-encoded byte strings, so `int` and `bytes` cast both ways;
/// the tagged byte kinds cast to and from plain bytes.
pub fn explicitly_castable(from: PrimitiveType, to: PrimitiveType) -> bool {
    use PrimitiveType::*;
    match (from, to) {
        (from, to) if from == to => true,
        (Int, Bytes) | (Bytes, Int) => true,
        (PubKey | Sig | DataSig, Bytes) => true,
        (Bytes, PubKey | Sig | DataSig) => true,
        _ => false,
    }
}
