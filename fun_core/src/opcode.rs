// fun_project_root/fun_core/src/opcode.rs
use crate::chain::Chain;
use crate::error::{FunError, FunResult};
use crate::value::{Callable, Key, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    CallMethod = 0,
    GetProperty = 1,
    GetKey = 2,
    Cond = 3,
    Tap = 4,
    Val = 5,
    SetKey = 6,
    UnsetKey = 7,
    KeyExists = 8,
    Apply = 9,
}

impl TryFrom<u8> for OpCode {
    type Error = FunError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => OpCode::CallMethod,
            1 => OpCode::GetProperty,
            2 => OpCode::GetKey,
            3 => OpCode::Cond,
            4 => OpCode::Tap,
            5 => OpCode::Val,
            6 => OpCode::SetKey,
            7 => OpCode::UnsetKey,
            8 => OpCode::KeyExists,
            9 => OpCode::Apply,
            other => return Err(FunError::UnknownOpcode(other)),
        })
    }
}

/// One step of a chain. Each variant carries only what its opcode needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    CallMethod {
        name: Arc<str>,
        args: Option<Arc<[Value]>>, // None and an empty list both mean "no arguments"
    },
    GetProperty(Arc<str>),
    GetKey(Key),
    SetKey(Key, Value),
    UnsetKey(Key),
    KeyExists(Key),
    Cond {
        predicate: Chain,
        then_branch: Chain,
        else_branch: Chain,
    },
    Tap(Chain),
    Val(Value),
    Apply {
        callable: Callable,
        bound: Arc<[Value]>,
    },
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::CallMethod { .. } => OpCode::CallMethod,
            Instruction::GetProperty(_) => OpCode::GetProperty,
            Instruction::GetKey(_) => OpCode::GetKey,
            Instruction::SetKey(..) => OpCode::SetKey,
            Instruction::UnsetKey(_) => OpCode::UnsetKey,
            Instruction::KeyExists(_) => OpCode::KeyExists,
            Instruction::Cond { .. } => OpCode::Cond,
            Instruction::Tap(_) => OpCode::Tap,
            Instruction::Val(_) => OpCode::Val,
            Instruction::Apply { .. } => OpCode::Apply,
        }
    }

    /// Decodes a pre-formed `(tag, arg, extra)` triple.
    pub fn from_raw(raw: RawInstruction) -> FunResult<Instruction> {
        let RawInstruction { tag, arg, extra } = raw;
        let opcode = OpCode::try_from(tag)?;
        let instruction = match opcode {
            OpCode::CallMethod => Instruction::CallMethod {
                name: raw_name(opcode, &arg)?,
                args: match extra {
                    Value::None | Value::Bool(false) => None,
                    Value::List(items) => Some(Arc::from(items.as_slice())),
                    other => return Err(bad_payload(opcode, "argument list", &other)),
                },
            },
            OpCode::GetProperty => Instruction::GetProperty(raw_name(opcode, &arg)?),
            OpCode::GetKey => Instruction::GetKey(raw_key(opcode, &arg)?),
            OpCode::UnsetKey => Instruction::UnsetKey(raw_key(opcode, &arg)?),
            OpCode::KeyExists => Instruction::KeyExists(raw_key(opcode, &arg)?),
            OpCode::SetKey => match &arg {
                Value::List(pair) if pair.len() == 2 => {
                    Instruction::SetKey(raw_key(opcode, &pair[0])?, pair[1].clone())
                }
                other => return Err(bad_payload(opcode, "[key, value] pair", other)),
            },
            OpCode::Cond => {
                let predicate = raw_chain(opcode, &arg)?;
                match &extra {
                    Value::List(branches) if branches.len() == 2 => Instruction::Cond {
                        predicate,
                        then_branch: raw_chain(opcode, &branches[0])?,
                        else_branch: raw_chain(opcode, &branches[1])?,
                    },
                    other => return Err(bad_payload(opcode, "[then, else] pair", other)),
                }
            }
            OpCode::Tap => Instruction::Tap(raw_chain(opcode, &arg)?),
            OpCode::Val => Instruction::Val(arg),
            OpCode::Apply => Instruction::Apply {
                callable: match &arg {
                    Value::Func(func) => func.clone(),
                    other => return Err(bad_payload(opcode, "callable", other)),
                },
                bound: match extra {
                    Value::None => Arc::from(Vec::new()),
                    Value::List(items) => Arc::from(items.as_slice()),
                    other => return Err(bad_payload(opcode, "bound argument list", &other)),
                },
            },
        };
        Ok(instruction)
    }
}

/// The untyped three-slot instruction form accepted at the normalization boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstruction {
    pub tag: u8,
    pub arg: Value,
    pub extra: Value,
}

impl RawInstruction {
    pub fn new(tag: u8, arg: impl Into<Value>, extra: impl Into<Value>) -> Self {
        RawInstruction {
            tag,
            arg: arg.into(),
            extra: extra.into(),
        }
    }
}

fn bad_payload(opcode: OpCode, expected: &str, got: &Value) -> FunError {
    FunError::Construction(format!(
        "{:?} expects {} but got {}",
        opcode,
        expected,
        got.type_name()
    ))
}

fn raw_name(opcode: OpCode, arg: &Value) -> FunResult<Arc<str>> {
    match arg {
        Value::Str(s) => Ok(s.clone()),
        other => Err(bad_payload(opcode, "a name", other)),
    }
}

fn raw_key(opcode: OpCode, arg: &Value) -> FunResult<Key> {
    Key::try_from(arg).map_err(|_| bad_payload(opcode, "a key", arg))
}

fn raw_chain(opcode: OpCode, arg: &Value) -> FunResult<Chain> {
    match arg {
        Value::Func(func) => Ok(Chain::empty().apply(func.clone(), Vec::new())),
        other => Err(bad_payload(opcode, "callable", other)),
    }
}
