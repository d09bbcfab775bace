//! Compiler for LockScript, a small statically-typed contract language
//! lowered to a locking script for the Kaspa txscript stack machine.
//!
//! The pipeline is strictly sequential: the pest front end ([`ast`])
//! produces a tree, the type checker ([`typecheck`]) annotates it and
//! collects diagnostics, the instruction selector ([`lower`]) turns it into
//! abstract instructions while tracking a simulated operand stack, and the
//! assembler ([`assemble`]) encodes the final script through the machine's
//! own `ScriptBuilder`.

pub mod assemble;
pub mod ast;
pub mod compiler;
pub mod errors;
pub mod ir;
pub mod lower;
pub mod parser;
pub mod symbols;
pub mod typecheck;
pub mod types;
