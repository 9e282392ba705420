// fun_project_root/fun_core/src/lib.rs

pub mod ast;
pub mod chain;
pub mod codegen;
pub mod container;
pub mod error;
pub mod factory;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod value;
pub mod vm;

pub use chain::Chain;
pub use error::{FunError, FunResult};
pub use factory::{
    bind, compose, expr, identity, of, pipe, tap, unless, unless_else, val, when, when_else, Step,
};
pub use lexer::is_callable_name;
pub use opcode::{Instruction, OpCode, RawInstruction};
pub use schema::{transform, Reducer, Schema, SharedReducer};
pub use value::{Callable, Indexable, Key, Object, Record, Value};

/// Pipes `input` through `steps` (bare callable names or `$_` expressions),
/// left to right. A single step goes through the memoizing entry point.
pub fn run_steps<S: AsRef<str>>(steps: &[S], input: Value) -> FunResult<Value> {
    let chain = match steps {
        [] => identity(),
        [only] => of(only.as_ref())?,
        many => pipe(many.iter().map(|s| s.as_ref()))?,
    };
    chain.call(input)
}
