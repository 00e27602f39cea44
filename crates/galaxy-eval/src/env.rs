//! Scoped variable environment for the mission interpreter.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use galaxy_types::ast::DeclKind;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Debug)]
struct Scope {
    bindings: RefCell<BTreeMap<String, Binding>>,
    parent: Option<Environment>,
    /// `var` declarations land in the nearest function scope.
    function_scope: bool,
}

/// A chain of scopes shared by reference.
///
/// Closures hold an `Environment` handle, so a variable written through one
/// handle is seen through every other handle to the same scope.
#[derive(Debug, Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    /// The outermost scope of one evaluation.
    pub fn global() -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(BTreeMap::new()),
            parent: None,
            function_scope: true,
        }))
    }

    /// A block scope nested in `self`.
    pub fn child(&self) -> Self {
        self.nested(false)
    }

    /// A function-call scope nested in `self`.
    pub fn function_child(&self) -> Self {
        self.nested(true)
    }

    fn nested(&self, function_scope: bool) -> Self {
        Self(Rc::new(Scope {
            bindings: RefCell::new(BTreeMap::new()),
            parent: Some(self.clone()),
            function_scope,
        }))
    }

    /// Declare a binding according to its declaration keyword.
    ///
    /// `let`/`const` may not redeclare a name in the same scope; `var`
    /// re-declaration simply assigns.
    pub fn declare(&self, name: &str, value: Value, kind: DeclKind) -> EvalResult<()> {
        match kind {
            DeclKind::Var => {
                let scope = self.function_scope();
                scope.0.bindings.borrow_mut().insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: true,
                    },
                );
                Ok(())
            }
            DeclKind::Let | DeclKind::Const => {
                let mut bindings = self.0.bindings.borrow_mut();
                if bindings.contains_key(name) {
                    return Err(EvalError::Redeclared(name.to_string()));
                }
                bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: !kind.is_const(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Define a mutable binding in this scope, replacing any previous one.
    /// Used for parameters, hoisted functions and primitives.
    pub fn define(&self, name: &str, value: Value) {
        self.0.bindings.borrow_mut().insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(binding) = env.0.bindings.borrow().get(name) {
                return Some(binding.value.clone());
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    /// Update a variable in the first scope where it exists.
    pub fn assign(&self, name: &str, value: Value) -> EvalResult<()> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(binding) = env.0.bindings.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(EvalError::ConstAssign(name.to_string()));
                }
                binding.value = value;
                return Ok(());
            }
            scope = env.0.parent.as_ref();
        }
        Err(EvalError::Reference(name.to_string()))
    }

    fn function_scope(&self) -> &Environment {
        let mut env = self;
        while !env.0.function_scope {
            match &env.0.parent {
                Some(parent) => env = parent,
                None => break,
            }
        }
        env
    }
}
