// fun_project_root/fun_core/src/schema.rs
use crate::chain::Chain;
use crate::container;
use crate::error::FunResult;
use crate::factory::{self, Step};
use crate::value::{Callable, Key, Value};
use std::sync::Arc;

/// Folds one schema entry into the output: `(out, name, chain, input) -> out`.
pub type Reducer = dyn Fn(Value, &str, &Chain, &Value) -> FunResult<Value>;

/// A [`Reducer`] that can travel inside a [`Callable`].
pub type SharedReducer = dyn Fn(Value, &str, &Chain, &Value) -> FunResult<Value> + Send + Sync;

/// An ordered set of named chains, applied together to one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entries: Vec<(Arc<str>, Chain)>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Adds (or replaces, keeping its position) the chain for `name`.
    pub fn field(mut self, name: &str, step: impl Into<Step>) -> FunResult<Self> {
        let chain = factory::of(step)?;
        match self.entries.iter_mut().find(|(n, _)| &**n == name) {
            Some(entry) => entry.1 = chain,
            None => self.entries.push((Arc::from(name), chain)),
        }
        Ok(self)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Chain)> {
        self.entries.iter().map(|(n, c)| (&**n, c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a fresh map with one entry per schema field.
    pub fn apply(&self, input: &Value) -> FunResult<Value> {
        transform(self, input, Value::empty_map(), None)
    }

    /// The schema as a callable over its last argument, for use as a chain step.
    pub fn into_callable(self) -> Callable {
        self.into_callable_with(Value::empty_map(), None)
    }

    /// Like [`Schema::into_callable`], but every call starts from `out` and
    /// folds through `reducer` when one is given.
    pub fn into_callable_with(self, out: Value, reducer: Option<Arc<SharedReducer>>) -> Callable {
        Callable::new("schema", move |args| {
            let input = args.last().cloned().unwrap_or(Value::None);
            let reducer = reducer.as_deref().map(|r| r as &Reducer);
            transform(&self, &input, out.clone(), reducer)
        })
    }
}

/// `out[name] = chain(input)` through the usual container dispatch.
pub fn set_field(out: Value, name: &str, chain: &Chain, input: &Value) -> FunResult<Value> {
    let item = chain.call(input.clone())?;
    container::set_key(out, Key::from(name), item)
}

/// Threads `out` through `reducer` for each entry of `schema`, in order.
pub fn transform(
    schema: &Schema,
    input: &Value,
    out: Value,
    reducer: Option<&Reducer>,
) -> FunResult<Value> {
    let default: &Reducer = &set_field;
    let reducer = reducer.unwrap_or(default);
    schema
        .entries()
        .try_fold(out, |out, (name, chain)| reducer(out, name, chain, input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy() -> Schema {
        Schema::new()
            .field("x", "$_*2")
            .and_then(|s| s.field("y", "$_"))
            .unwrap()
    }

    #[test]
    fn defaults_to_an_empty_map() {
        assert_eq!(Schema::new().apply(&Value::Int(42)).unwrap(), Value::empty_map());
    }

    #[test]
    fn maps_the_schema_chains_into_the_output() {
        assert_eq!(
            xy().apply(&Value::Int(42)).unwrap(),
            Value::map([("x", 84), ("y", 42)])
        );
    }

    #[test]
    fn includes_or_overwrites_the_passed_in_output() {
        let out = Value::map([("x", 99), ("z", 21)]);
        let result = transform(&xy(), &Value::Int(42), out, None).unwrap();
        assert_eq!(result, Value::map([("x", 84), ("z", 21), ("y", 42)]));
        let keys: Vec<Key> = match &result {
            Value::Map(m) => m.keys().cloned().collect(),
            other => panic!("expected map, got {:?}", other),
        };
        assert_eq!(keys, vec![Key::from("x"), Key::from("z"), Key::from("y")]);
    }

    #[test]
    fn calls_the_reducer_with_out_name_chain_input() {
        let schema = xy();
        let logger = |out: Value, name: &str, chain: &Chain, input: &Value| -> FunResult<Value> {
            let entry = Value::list(vec![
                out.clone(),
                Value::str(name),
                Value::Int(chain.len() as i64),
                input.clone(),
            ]);
            container::set_key(out.clone(), Key::from(count(&out)), entry)
        };
        fn count(v: &Value) -> usize {
            match v {
                Value::List(items) => items.len(),
                _ => 0,
            }
        }

        let initial = Value::list(vec![Value::str("initial")]);
        let mut expected = logger(initial.clone(), "x", &factory::of("$_*2").unwrap(), &Value::Int(42)).unwrap();
        expected = logger(expected, "y", &factory::identity(), &Value::Int(42)).unwrap();

        let result = transform(&schema, &Value::Int(42), initial, Some(&logger as &Reducer)).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn schema_as_a_chain_step() {
        let chain = factory::pipe([Step::from("$_ + 1"), Step::from(xy().into_callable())]).unwrap();
        assert_eq!(
            chain.call(Value::Int(1)).unwrap(),
            Value::map([("x", 4), ("y", 2)])
        );
    }

    #[test]
    fn schema_callable_keeps_its_output_and_reducer() {
        let seeded = xy().into_callable_with(Value::map([("z", 0)]), None);
        assert_eq!(
            seeded.call(&[Value::Int(3)]).unwrap(),
            Value::map([("z", 0), ("x", 6), ("y", 3)])
        );

        let names_only: Arc<SharedReducer> = Arc::new(|out: Value, name: &str, _chain: &Chain, _input: &Value| {
            container::set_key(out, Key::from(name), Value::str(name))
        });
        let f = xy().into_callable_with(Value::empty_map(), Some(names_only));
        assert_eq!(
            f.call(&[Value::Int(3)]).unwrap(),
            Value::map([("x", "x"), ("y", "y")])
        );
    }

    #[test]
    fn repeated_fields_keep_their_position() {
        let schema = xy().field("x", "$_ + 1").unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(
            schema.apply(&Value::Int(1)).unwrap(),
            Value::map([("x", 2), ("y", 1)])
        );
    }
}
