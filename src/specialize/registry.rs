//! One-shot dispatch tables for template declarations.
//!
//! Each declaration name maps to exactly one handler. A handler is moved out
//! of its table the first time its declaration is seen, so a name that
//! appears twice, or that was never registered, is reported instead of
//! silently handled. Once every declaration has been dispatched, `finalize`
//! checks that nothing is left over.

use crate::error::{DeclKind, GenError};
use crate::specialize::Specializer;
use crate::syntax::ast::{FuncDecl, TypeSpec, ValueSpec};
use std::collections::BTreeMap;

pub type FuncHandler = fn(&Specializer, &mut FuncDecl) -> Result<(), GenError>;
pub type TypeHandler = fn(&Specializer, &mut TypeSpec) -> Result<(), GenError>;
pub type ValueHandler = fn(&Specializer, &mut ValueSpec) -> Result<(), GenError>;

/// Handlers for one kind of declaration, keyed by declaration name.
#[derive(Debug, Clone)]
pub struct DeclTable<H> {
    kind: DeclKind,
    entries: BTreeMap<&'static str, H>,
}

impl<H> DeclTable<H> {
    pub fn new(kind: DeclKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, handler: H) -> Self {
        self.entries.insert(name, handler);
        self
    }

    fn take(&mut self, name: &str) -> Result<H, GenError> {
        self.entries.remove(name).ok_or_else(|| GenError::Unrecognized {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn first_remaining(&self) -> Option<GenError> {
        self.entries.keys().next().map(|name| GenError::NeverMatched {
            kind: self.kind,
            name: name.to_string(),
        })
    }
}

/// Lifecycle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Built, nothing dispatched yet.
    Pending,
    /// At least one handler has been taken.
    Consuming,
    /// Finalized with every table drained.
    Complete,
    /// A lookup or handler failed, or finalize found leftovers.
    Aborted,
}

/// Proof that every registered declaration was dispatched exactly once.
#[derive(Debug)]
pub struct Validated {
    _private: (),
}

#[derive(Debug, Clone)]
pub struct Registry {
    funcs: DeclTable<FuncHandler>,
    types: DeclTable<TypeHandler>,
    values: DeclTable<ValueHandler>,
    state: RegistryState,
}

impl Registry {
    pub fn new(
        funcs: DeclTable<FuncHandler>,
        types: DeclTable<TypeHandler>,
        values: DeclTable<ValueHandler>,
    ) -> Self {
        Self {
            funcs,
            types,
            values,
            state: RegistryState::Pending,
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// Handlers not yet taken, across all three tables.
    pub fn remaining(&self) -> usize {
        self.funcs.len() + self.types.len() + self.values.len()
    }

    pub fn take_func(&mut self, name: &str) -> Result<FuncHandler, GenError> {
        self.begin()?;
        let taken = self.funcs.take(name);
        self.settle(taken)
    }

    pub fn take_type(&mut self, name: &str) -> Result<TypeHandler, GenError> {
        self.begin()?;
        let taken = self.types.take(name);
        self.settle(taken)
    }

    pub fn take_value(&mut self, name: &str) -> Result<ValueHandler, GenError> {
        self.begin()?;
        let taken = self.values.take(name);
        self.settle(taken)
    }

    /// Mark the run as failed; every later call reports `RegistryAborted`.
    pub fn abort(&mut self) {
        self.state = RegistryState::Aborted;
    }

    /// Check that every table is drained. Leftovers are reported functions
    /// first, then types, then values, each in name order.
    pub fn finalize(&mut self) -> Result<Validated, GenError> {
        match self.state {
            RegistryState::Aborted => return Err(GenError::RegistryAborted),
            RegistryState::Complete => return Ok(Validated { _private: () }),
            RegistryState::Pending | RegistryState::Consuming => {}
        }

        let leftover = self
            .funcs
            .first_remaining()
            .or_else(|| self.types.first_remaining())
            .or_else(|| self.values.first_remaining());
        match leftover {
            Some(err) => {
                self.abort();
                Err(err)
            }
            None => {
                self.state = RegistryState::Complete;
                Ok(Validated { _private: () })
            }
        }
    }

    fn begin(&mut self) -> Result<(), GenError> {
        match self.state {
            RegistryState::Aborted => Err(GenError::RegistryAborted),
            RegistryState::Complete => {
                self.abort();
                Err(GenError::RegistryAborted)
            }
            RegistryState::Pending | RegistryState::Consuming => {
                self.state = RegistryState::Consuming;
                Ok(())
            }
        }
    }

    fn settle<H>(&mut self, taken: Result<H, GenError>) -> Result<H, GenError> {
        if taken.is_err() {
            self.abort();
        }
        taken
    }
}
