// fun_project_root/fun_core/src/vm.rs
use crate::chain::Chain;
use crate::container;
use crate::error::{FunError, FunResult};
use crate::opcode::Instruction;
use crate::value::Value;
use tracing::trace;

/// Folds `chain`'s instructions over `input`, threading one current value.
pub fn execute(chain: &Chain, input: Value) -> FunResult<Value> {
    let mut current = input;
    for (ip, instruction) in chain.instructions().iter().enumerate() {
        trace!(ip, opcode = ?instruction.opcode(), value = %current, "executing instruction");
        current = step(instruction, current)?;
    }
    Ok(current)
}

fn step(instruction: &Instruction, current: Value) -> FunResult<Value> {
    match instruction {
        Instruction::CallMethod { name, args } => {
            let args = args.as_deref().unwrap_or(&[]);
            match &current {
                Value::Object(obj) => obj.call_method(name, args),
                other => Err(FunError::UnsupportedOperation(format!(
                    "cannot call method '{}' on {}",
                    name,
                    other.type_name()
                ))),
            }
        }
        Instruction::GetProperty(name) => match &current {
            Value::Object(obj) => obj.get_property(name),
            other => Err(FunError::UnsupportedOperation(format!(
                "cannot read property '{}' of {}",
                name,
                other.type_name()
            ))),
        },
        Instruction::GetKey(key) => container::get_key(&current, key),
        Instruction::SetKey(key, item) => container::set_key(current, key.clone(), item.clone()),
        Instruction::UnsetKey(key) => container::unset_key(current, key),
        Instruction::KeyExists(key) => container::key_exists(&current, key).map(Value::Bool),
        Instruction::Cond {
            predicate,
            then_branch,
            else_branch,
        } => {
            if predicate.call(current.clone())?.is_truthy() {
                then_branch.call(current)
            } else {
                else_branch.call(current)
            }
        }
        Instruction::Tap(effect) => {
            effect.call(current.clone())?;
            Ok(current)
        }
        Instruction::Val(constant) => Ok(constant.clone()),
        Instruction::Apply { callable, bound } => {
            if bound.is_empty() {
                callable.call(std::slice::from_ref(&current))
            } else {
                let mut args = Vec::with_capacity(bound.len() + 1);
                args.extend_from_slice(bound);
                args.push(current);
                callable.call(&args)
            }
        }
    }
}
