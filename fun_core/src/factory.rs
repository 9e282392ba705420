// fun_project_root/fun_core/src/factory.rs
//! Entry points that turn heterogeneous steps into chains.
//!
//! Several steps always compose as a *pipeline*: the first step runs first.
//! [`compose`] is the one exception and uses mathematical order (last step
//! runs first).

use crate::chain::Chain;
use crate::codegen;
use crate::error::{FunError, FunResult};
use crate::lexer::is_callable_name;
use crate::opcode::{Instruction, RawInstruction};
use crate::registry;
use crate::value::{Callable, Value};
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref IDENTITY: Chain = Chain::empty();
    // Entries are never evicted; they live as long as the process.
    static ref EXPRESSIONS: DashMap<String, Chain> = DashMap::new();
    static ref KEYED: DashMap<String, Chain> = DashMap::new();
}

/// One input to the normalizer.
#[derive(Debug, Clone)]
pub enum Step {
    /// A bare callable reference, or else an expression over `$_`.
    Str(Arc<str>),
    Chain(Chain),
    Raw(RawInstruction),
    Func(Callable),
    /// Anything else; only callables, strings, 1-element wrappers and
    /// `[tag, arg, extra]` triples are accepted.
    Value(Value),
}

impl From<&str> for Step {
    fn from(s: &str) -> Self {
        Step::Str(Arc::from(s))
    }
}

impl From<String> for Step {
    fn from(s: String) -> Self {
        Step::Str(Arc::from(s))
    }
}

impl From<Chain> for Step {
    fn from(chain: Chain) -> Self {
        Step::Chain(chain)
    }
}

impl From<&Chain> for Step {
    fn from(chain: &Chain) -> Self {
        Step::Chain(chain.clone())
    }
}

impl From<RawInstruction> for Step {
    fn from(raw: RawInstruction) -> Self {
        Step::Raw(raw)
    }
}

impl From<Callable> for Step {
    fn from(func: Callable) -> Self {
        Step::Func(func)
    }
}

impl From<Value> for Step {
    fn from(value: Value) -> Self {
        Step::Value(value)
    }
}

/// The shared identity chain; every call returns the same instance.
pub fn identity() -> Chain {
    IDENTITY.clone()
}

fn first_writer(cache: &DashMap<String, Chain>, key: &str, chain: Chain) -> Chain {
    cache
        .entry(key.to_string())
        .or_insert_with(|| {
            debug!(key, "caching chain");
            chain
        })
        .clone()
}

/// Compiles `source` into a single-instruction chain, once per distinct string.
/// `"$_"` is the identity chain itself.
pub fn expr(source: &str) -> FunResult<Chain> {
    if source == "$_" {
        return Ok(identity());
    }
    if let Some(hit) = EXPRESSIONS.get(source) {
        return Ok(hit.clone());
    }
    let callable = codegen::compile(source).map_err(|err| {
        err.into_construction(&format!("cannot compile expression '{}'", source))
    })?;
    let chain = Chain::empty().apply(callable, Vec::new());
    Ok(first_writer(&EXPRESSIONS, source, chain))
}

/// Single-step entry point. Chains pass through untouched, strings are
/// memoized so the same string always yields the same chain.
pub fn of(step: impl Into<Step>) -> FunResult<Chain> {
    match step.into() {
        Step::Chain(chain) => Ok(chain),
        Step::Str(s) => keyed(&s),
        Step::Value(Value::Str(s)) => keyed(&s),
        other => pipe([other]),
    }
}

fn keyed(key: &str) -> FunResult<Chain> {
    if let Some(hit) = KEYED.get(key) {
        return Ok(hit.clone());
    }
    let chain = if is_callable_name(key) {
        pipe([Step::from(key)])?
    } else {
        expr(key)?
    };
    Ok(first_writer(&KEYED, key, chain))
}

/// Builds one chain running `steps` left to right.
pub fn pipe<I, S>(steps: I) -> FunResult<Chain>
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    let mut ops = Vec::new();
    for step in steps {
        normalize(step.into(), &mut ops)?;
    }
    Ok(Chain::from_instructions(ops))
}

/// Mathematical composition: `compose([f, g])` runs `g` first, then `f`.
pub fn compose<I, S>(steps: I) -> FunResult<Chain>
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    let mut steps: Vec<Step> = steps.into_iter().map(Into::into).collect();
    steps.reverse();
    pipe(steps)
}

fn not_callable(what: &dyn std::fmt::Display) -> FunError {
    FunError::Construction(format!("{} is not callable", what))
}

fn resolve_name(name: &str) -> FunResult<Callable> {
    registry::lookup(name).ok_or_else(|| not_callable(&name))
}

fn apply_of(callable: Callable) -> Instruction {
    Instruction::Apply {
        callable,
        bound: Arc::from(Vec::new()),
    }
}

fn normalize(step: Step, ops: &mut Vec<Instruction>) -> FunResult<()> {
    match step {
        Step::Str(s) if is_callable_name(&s) => ops.push(apply_of(resolve_name(&s)?)),
        Step::Str(s) => ops.extend_from_slice(expr(&s)?.instructions()),
        Step::Chain(chain) => ops.extend_from_slice(chain.instructions()),
        Step::Raw(raw) => ops.push(Instruction::from_raw(raw)?),
        Step::Func(func) => ops.push(apply_of(func)),
        Step::Value(value) => match value {
            Value::Func(func) => ops.push(apply_of(func)),
            Value::Str(s) => normalize(Step::Str(s), ops)?,
            Value::List(items) => match items.as_slice() {
                [inner] => normalize(Step::Value(inner.clone()), ops)?,
                [Value::Int(tag), arg, extra] if (0..=u8::MAX as i64).contains(tag) => {
                    let raw = RawInstruction::new(*tag as u8, arg.clone(), extra.clone());
                    ops.push(Instruction::from_raw(raw)?)
                }
                _ => return Err(not_callable(&Value::List(items.clone()))),
            },
            other => return Err(not_callable(&other)),
        },
    }
    Ok(())
}

fn resolve_callable(step: Step) -> FunResult<Callable> {
    match step {
        Step::Str(s) if is_callable_name(&s) => resolve_name(&s),
        Step::Func(func) | Step::Value(Value::Func(func)) => Ok(func),
        Step::Chain(chain) => Ok(chain.to_callable()),
        Step::Value(Value::Str(s)) => resolve_callable(Step::Str(s)),
        Step::Value(Value::List(items)) if items.len() == 1 => {
            resolve_callable(Step::Value(items[0].clone()))
        }
        Step::Str(s) => Err(not_callable(&s)),
        Step::Raw(raw) => Err(not_callable(&format!("raw instruction {}", raw.tag))),
        Step::Value(other) => Err(not_callable(&other)),
    }
}

/// A chain that calls `target` with `args` followed by the chain's input.
///
/// A chain target only ever sees one value, so binding arguments to it is
/// rejected rather than silently dropping them.
pub fn bind(target: impl Into<Step>, args: Vec<Value>) -> FunResult<Chain> {
    let target = target.into();
    if matches!(target, Step::Chain(_)) && !args.is_empty() {
        return Err(FunError::Construction(format!(
            "cannot bind {} argument(s) to a chain; chains take a single input",
            args.len()
        )));
    }
    let callable = resolve_callable(target)?;
    Ok(identity().apply(callable, args))
}

/// A chain that ignores its input and yields `value`.
pub fn val(value: impl Into<Value>) -> Chain {
    identity().val(value)
}

/// Runs `steps` (piped) for their effect; the chain yields its input unchanged.
pub fn tap<I, S>(steps: I) -> FunResult<Chain>
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    Ok(identity().tap(pipe(steps)?))
}

/// `cond(input) ? if_true(input) : input`
pub fn when(cond: impl Into<Step>, if_true: impl Into<Step>) -> FunResult<Chain> {
    when_else(cond, if_true, identity())
}

/// `cond(input) ? if_true(input) : if_false(input)`
pub fn when_else(
    cond: impl Into<Step>,
    if_true: impl Into<Step>,
    if_false: impl Into<Step>,
) -> FunResult<Chain> {
    Ok(identity().cond(of(cond)?, of(if_true)?, of(if_false)?))
}

/// `cond(input) ? input : if_false(input)`
pub fn unless(cond: impl Into<Step>, if_false: impl Into<Step>) -> FunResult<Chain> {
    unless_else(cond, if_false, identity())
}

/// `cond(input) ? if_true(input) : if_false(input)`, with the branches
/// given in the opposite order to [`when_else`].
pub fn unless_else(
    cond: impl Into<Step>,
    if_false: impl Into<Step>,
    if_true: impl Into<Step>,
) -> FunResult<Chain> {
    when_else(cond, if_true, if_false)
}

/// `fun![]` is the identity chain, `fun![step]` goes through [`of`] (and its
/// cache), `fun![a, b, ...]` pipes the steps left to right.
#[macro_export]
macro_rules! fun {
    () => {
        ::std::result::Result::Ok::<_, $crate::FunError>($crate::factory::identity())
    };
    ($step:expr $(,)?) => {
        $crate::factory::of($step)
    };
    ($($step:expr),+ $(,)?) => {
        $crate::factory::pipe([$($crate::factory::Step::from($step)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Key;
    use std::sync::Mutex;

    #[test]
    fn zero_steps_is_the_shared_identity() {
        let f = identity();
        assert!(f.ptr_eq(&identity()));
        assert!(f.ptr_eq(&crate::fun![].unwrap()));
        assert_eq!(f.call(Value::Int(42)).unwrap(), Value::Int(42));
        assert_eq!(f.call(Value::None).unwrap(), Value::None);
    }

    #[test]
    fn strings_yield_the_same_chain_each_time() {
        let f = of("is_container").unwrap();
        assert!(f.ptr_eq(&of("is_container").unwrap()));
        assert_eq!(f.call(Value::list(vec![])).unwrap(), Value::Bool(true));
        assert_eq!(f.call(Value::Int(42)).unwrap(), Value::Bool(false));

        let g = of("$_ * 10").unwrap();
        assert!(g.ptr_eq(&of(Value::str("$_ * 10")).unwrap()));
        assert_eq!(g.call(Value::Int(4)).unwrap(), Value::Int(40));
    }

    #[test]
    fn chains_pass_through_of() {
        let f = identity().get_key(0);
        assert!(of(&f).unwrap().ptr_eq(&f));
    }

    #[test]
    fn placeholder_expression_is_identity() {
        assert!(expr("$_").unwrap().ptr_eq(&identity()));
        assert!(of("$_").unwrap().ptr_eq(&identity()));
    }

    #[test]
    fn expressions_are_compiled_once() {
        let f = expr("$_ == 'x'").unwrap();
        assert!(f.ptr_eq(&expr("$_ == 'x'").unwrap()));
        assert_eq!(f.len(), 1);
        assert_eq!(f.call(Value::str("x")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn cache_identity_holds_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| of("$_ + 7").unwrap()))
            .collect();
        let chains: Vec<Chain> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(chains.iter().all(|c| c.ptr_eq(&chains[0])));
    }

    #[test]
    fn pipes_multiple_steps_left_to_right() {
        let f = pipe(["reverse", "flip"]).unwrap();
        let input = Value::list(vec![Value::str("foo"), Value::str("bar")]);
        assert_eq!(f.call(input.clone()).unwrap(), Value::map([("bar", 0), ("foo", 1)]));

        let g = crate::fun!["reverse", "flip"].unwrap();
        assert_eq!(g.call(input).unwrap(), Value::map([("bar", 0), ("foo", 1)]));
    }

    #[test]
    fn compose_runs_right_to_left() {
        let f = compose(["flip", "reverse"]).unwrap();
        let input = Value::list(vec![Value::str("foo"), Value::str("bar")]);
        assert_eq!(f.call(input).unwrap(), Value::map([("bar", 0), ("foo", 1)]));
    }

    #[test]
    fn chains_are_spliced_flat() {
        let first = identity().get_key("a");
        let f = pipe([Step::from(&first), Step::from("$_ * 2")]).unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f.call(Value::map([("a", 21)])).unwrap(), Value::Int(42));
    }

    #[test]
    fn raw_triples_and_wrappers_are_accepted() {
        let raw = Value::list(vec![Value::Int(2), Value::str("k"), Value::None]);
        let wrapped = Value::list(vec![Value::str("upper")]);
        let f = pipe([raw, wrapped]).unwrap();
        assert_eq!(f.call(Value::map([("k", "v")])).unwrap(), Value::str("V"));

        let set = pipe([RawInstruction::new(6, Value::list(vec![Value::str("k"), Value::Int(1)]), Value::None)])
            .unwrap();
        assert_eq!(
            set.instructions(),
            &[Instruction::SetKey(Key::from("k"), Value::Int(1))]
        );
    }

    #[test]
    fn construction_rejects_what_cannot_be_called() {
        assert!(matches!(pipe(["no_such_function"]), Err(FunError::Construction(_))));
        assert!(matches!(pipe([Value::Int(42)]), Err(FunError::Construction(_))));
        assert!(matches!(pipe(["is_array($_)"]), Err(FunError::Construction(_))));
        assert_eq!(
            pipe([Value::Float(1e20)]).unwrap_err(),
            FunError::Construction("100000000000000000000 is not callable".to_string())
        );
        assert!(matches!(
            pipe([RawInstruction::new(99, Value::None, Value::None)]),
            Err(FunError::UnknownOpcode(99))
        ));
    }

    #[test]
    fn bind_places_bound_args_before_the_input() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let test_me = Callable::new("test_me", move |args| {
            sink.lock().unwrap().push(args.to_vec());
            Ok(Value::str("foo"))
        });
        let f = bind(test_me, vec![Value::str("blue"), Value::Int(32)]).unwrap();
        assert_eq!(f.call(Value::str("bar")).unwrap(), Value::str("foo"));
        assert_eq!(f.call(Value::None).unwrap(), Value::str("foo"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                vec![Value::str("blue"), Value::Int(32), Value::str("bar")],
                vec![Value::str("blue"), Value::Int(32), Value::None],
            ]
        );
        assert!(matches!(bind("$_ + 1", vec![]), Err(FunError::Construction(_))));
    }

    #[test]
    fn bind_refuses_arguments_for_chains() {
        let first = identity().get_key(0);
        let err = bind(first.clone(), vec![Value::list(vec![Value::Int(9)])]).unwrap_err();
        assert!(matches!(err, FunError::Construction(_)));

        let bare = bind(first, vec![]).unwrap();
        assert_eq!(bare.call(Value::list(vec![Value::Int(1)])).unwrap(), Value::Int(1));
    }

    #[test]
    fn tap_applies_steps_as_a_side_effect() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let method = Callable::new("method", move |args| {
            sink.lock().unwrap().extend_from_slice(args);
            Ok(Value::Int(43))
        });
        let f = tap([Step::from("$_*2"), Step::from(method)]).unwrap();
        assert_eq!(f.call(Value::Int(42)).unwrap(), Value::Int(42));
        assert_eq!(*seen.lock().unwrap(), vec![Value::Int(84)]);
    }

    #[test]
    fn val_returns_its_value() {
        assert_eq!(val(42).call(Value::Int(27)).unwrap(), Value::Int(42));
    }

    #[test]
    fn when_branches_on_the_condition() {
        let f = when_else("$_==1", "$_*2", "$_+4").unwrap();
        assert_eq!(f.call(Value::Int(1)).unwrap(), Value::Int(2));
        assert_eq!(f.call(Value::Int(2)).unwrap(), Value::Int(6));

        let f = when("$_==2", "$_*3").unwrap();
        assert_eq!(f.call(Value::Int(1)).unwrap(), Value::Int(1));
        assert_eq!(f.call(Value::Int(2)).unwrap(), Value::Int(6));
    }

    #[test]
    fn unless_mirrors_when() {
        let f = unless_else("$_==1", "$_*2", "$_+4").unwrap();
        assert_eq!(f.call(Value::Int(1)).unwrap(), Value::Int(5));
        assert_eq!(f.call(Value::Int(2)).unwrap(), Value::Int(4));

        let f = unless("$_==2", "$_*3").unwrap();
        assert_eq!(f.call(Value::Int(1)).unwrap(), Value::Int(3));
        assert_eq!(f.call(Value::Int(2)).unwrap(), Value::Int(2));
    }
}
