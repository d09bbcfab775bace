use crate::ast::SourceSpan;
use crate::errors::CompileError;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Parameter,
    Variable,
    Function,
}

/// A declared name. `ty` is only meaningful for value bindings; function
/// bindings exist solely for redefinition detection.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub ty: Type,
    pub kind: BindingKind,
    pub span: Option<SourceSpan>,
    pub used: bool,
}

#[derive(Debug, Default)]
pub struct Scope {
    bindings: Vec<Binding>,
}

impl Scope {
    /// Value bindings that were declared but never read.
    pub fn unused(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(|binding| !binding.used && binding.kind != BindingKind::Function)
    }
}

/// Lexically scoped name table. The language has no shadowing, so a
/// declaration collides with any binding anywhere up the scope chain.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn exit_scope(&mut self) -> Scope {
        self.scopes.pop().expect("scope entered")
    }

    pub fn declare(&mut self, binding: Binding) -> Result<(), CompileError> {
        if self.lookup(&binding.name).is_some() {
            return Err(match binding.kind {
                BindingKind::Function => CompileError::FunctionRedefinition { name: binding.name, span: binding.span },
                _ => CompileError::VariableRedefinition { name: binding.name, span: binding.span },
            });
        }
        self.scopes.last_mut().expect("scope entered").bindings.push(binding);
        Ok(())
    }

    /// Resolves a name, innermost scope first.
    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.bindings.iter_mut().find(|binding| binding.name == name))
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.bindings.iter().find(|binding| binding.name == name))
    }
}
