use serde::Serialize;

use crate::assemble::assemble_program;
use crate::ast::{parse_contract, ContractNode};
use crate::errors::{CompileError, CompilerError};
use crate::lower::lower_contract;
use crate::typecheck::check_contract;

/// Caller-selectable policy for the advisory diagnostic classes. Strict by
/// default: unused bindings and constant conditions fail the compile.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub allow_unused: bool,
    pub allow_constant_conditions: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { allow_unused: false, allow_constant_conditions: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInputAbi {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionAbiEntry {
    pub name: String,
    pub inputs: Vec<FunctionInputAbi>,
}

pub type FunctionAbi = Vec<FunctionAbiEntry>;

#[derive(Debug, Serialize)]
pub struct CompiledContract {
    pub contract_name: String,
    pub script: Vec<u8>,
    pub abi: FunctionAbi,
    pub without_selector: bool,
    #[serde(skip)]
    pub warnings: Vec<CompileError>,
}

impl CompiledContract {
    /// The selector value a caller pushes to invoke `function_name`, or
    /// `None` for single-function contracts, which have no dispatch.
    pub fn function_selector(&self, function_name: &str) -> Option<i64> {
        if self.without_selector {
            return None;
        }
        self.abi.iter().position(|entry| entry.name == function_name).map(|index| index as i64)
    }
}

pub fn compile_contract(source: &str, options: CompileOptions) -> Result<CompiledContract, CompilerError> {
    let mut contract = parse_contract(source)?;
    compile_contract_ast(&mut contract, options)
}

/// Compiles an already-parsed tree. The tree is annotated in place by the
/// type checker before lowering.
pub fn compile_contract_ast(contract: &mut ContractNode, options: CompileOptions) -> Result<CompiledContract, CompilerError> {
    if contract.functions.is_empty() {
        return Err(CompilerError::Unsupported("contract has no functions".to_string()));
    }
    let warnings = check_contract(contract, &options).map_err(CompilerError::Check)?;
    let ir = lower_contract(contract);
    let script = assemble_program(&ir)?;
    Ok(CompiledContract {
        contract_name: contract.name.clone(),
        script,
        abi: build_function_abi(contract),
        without_selector: contract.functions.len() == 1,
        warnings,
    })
}

fn build_function_abi(contract: &ContractNode) -> FunctionAbi {
    contract
        .functions
        .iter()
        .map(|function| FunctionAbiEntry {
            name: function.name.clone(),
            inputs: function
                .params
                .iter()
                .map(|param| FunctionInputAbi { name: param.name.clone(), type_name: param.ty.to_string() })
                .collect(),
        })
        .collect()
}
