// fun_project_root/fun_core/src/chain.rs
use crate::error::FunResult;
use crate::opcode::Instruction;
use crate::value::{Callable, Key, Value};
use crate::vm;
use std::fmt;
use std::sync::Arc;

/// An immutable, shareable sequence of deferred operations.
///
/// Every builder method returns a new `Chain`; the receiver keeps executing
/// exactly the instructions it had when it was built. Invoking a chain with
/// [`Chain::call`] replays the instructions against the input, in order.
#[derive(Clone)]
pub struct Chain {
    ops: Arc<[Instruction]>,
}

impl Chain {
    /// The identity chain: returns its input unchanged.
    pub fn empty() -> Self {
        Chain {
            ops: Arc::from(Vec::new()),
        }
    }

    pub fn from_instructions(ops: Vec<Instruction>) -> Self {
        Chain { ops: Arc::from(ops) }
    }

    /// Appends one instruction, leaving `self` untouched.
    pub fn then(&self, instruction: Instruction) -> Self {
        let mut ops = Vec::with_capacity(self.ops.len() + 1);
        ops.extend_from_slice(&self.ops);
        ops.push(instruction);
        Chain::from_instructions(ops)
    }

    pub fn call_method(&self, name: &str, args: Option<Vec<Value>>) -> Self {
        self.then(Instruction::CallMethod {
            name: Arc::from(name),
            args: args.map(Arc::from),
        })
    }

    pub fn get_property(&self, name: &str) -> Self {
        self.then(Instruction::GetProperty(Arc::from(name)))
    }

    pub fn get_key(&self, key: impl Into<Key>) -> Self {
        self.then(Instruction::GetKey(key.into()))
    }

    pub fn set_key(&self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.then(Instruction::SetKey(key.into(), value.into()))
    }

    pub fn unset_key(&self, key: impl Into<Key>) -> Self {
        self.then(Instruction::UnsetKey(key.into()))
    }

    pub fn key_exists(&self, key: impl Into<Key>) -> Self {
        self.then(Instruction::KeyExists(key.into()))
    }

    pub fn cond(&self, predicate: Chain, then_branch: Chain, else_branch: Chain) -> Self {
        self.then(Instruction::Cond {
            predicate,
            then_branch,
            else_branch,
        })
    }

    pub fn tap(&self, effect: Chain) -> Self {
        self.then(Instruction::Tap(effect))
    }

    pub fn val(&self, constant: impl Into<Value>) -> Self {
        self.then(Instruction::Val(constant.into()))
    }

    pub fn apply(&self, callable: Callable, bound: Vec<Value>) -> Self {
        self.then(Instruction::Apply {
            callable,
            bound: Arc::from(bound),
        })
    }

    /// `self`'s instructions followed by `other`'s.
    pub fn concat(&self, other: &Chain) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut ops = Vec::with_capacity(self.ops.len() + other.ops.len());
        ops.extend_from_slice(&self.ops);
        ops.extend_from_slice(&other.ops);
        Chain::from_instructions(ops)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when both handles share the same instruction storage.
    pub fn ptr_eq(&self, other: &Chain) -> bool {
        Arc::ptr_eq(&self.ops, &other.ops)
    }

    pub fn call(&self, input: Value) -> FunResult<Value> {
        vm::execute(self, input)
    }

    /// Wraps the chain as a callable that runs it on its last argument
    /// (or on null when called with none).
    pub fn to_callable(&self) -> Callable {
        let chain = self.clone();
        Callable::new("chain", move |args| {
            chain.call(args.last().cloned().unwrap_or(Value::None))
        })
    }
}

impl Default for Chain {
    fn default() -> Self {
        Chain::empty()
    }
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.ops == other.ops
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ops.iter()).finish()
    }
}
