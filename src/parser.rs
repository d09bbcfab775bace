use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "lockscript.pest"]
pub struct LockScriptParser;
