// fun_project_root/fun_core/src/value.rs
use crate::error::{FunError, FunResult};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered associative container, the "map" half of the plain containers.
pub type ValueMap = IndexMap<Key, Value>;

/// Signature every native callable shares: positional arguments in, one value out.
pub type NativeFn = dyn Fn(&[Value]) -> FunResult<Value> + Send + Sync;

/// Represents a dynamic value flowing through a chain.
#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),            // Arc for cheap cloning across chains and threads
    List(Arc<Vec<Value>>),    // Plain sequential container, copy-on-write
    Map(Arc<ValueMap>),       // Plain associative container, copy-on-write
    Object(Arc<dyn Object>),  // Capability-bearing object, shared by identity
    Func(Callable),
}

/// A key into a plain container or an indexable object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(Arc<str>),
}

impl Key {
    /// String keys that spell a decimal integer ("7", "-3", not "07" or "+7")
    /// are the same key as that integer.
    pub fn from_str_key(s: &str) -> Key {
        match s.parse::<i64>() {
            Ok(i) if i.to_string() == s => Key::Int(i),
            _ => Key::Str(Arc::from(s)),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::Int(*i),
            Key::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::from_str_key(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from_str_key(&s)
    }
}

impl TryFrom<&Value> for Key {
    type Error = FunError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(i) => Ok(Key::Int(*i)),
            Value::Str(s) => Ok(Key::from_str_key(s)),
            Value::Bool(b) => Ok(Key::Int(*b as i64)),
            other => Err(FunError::Type(format!(
                "{} cannot be used as a key",
                other.type_name()
            ))),
        }
    }
}

/// A named, shareable function value. Compared by identity, never by behavior.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl Callable {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> FunResult<Value> + Send + Sync + 'static,
    {
        Callable {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> FunResult<Value> {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<callable:{}>", self.name)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A value exposing named operations instead of being a plain container.
///
/// Every capability defaults to `UnsupportedOperation`, so implementors only
/// override what they actually provide.
pub trait Object: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str {
        "object"
    }

    fn call_method(&self, name: &str, _args: &[Value]) -> FunResult<Value> {
        Err(FunError::UnsupportedOperation(format!(
            "{} has no method '{}'",
            self.type_name(),
            name
        )))
    }

    fn get_property(&self, name: &str) -> FunResult<Value> {
        Err(FunError::UnsupportedOperation(format!(
            "{} has no property '{}'",
            self.type_name(),
            name
        )))
    }

    /// The keyed-access view of this object, if it has one.
    fn as_indexable(&self) -> Option<&dyn Indexable> {
        None
    }
}

/// Keyed access implemented by an object. Writes go through `&self`, so
/// implementors hold their own interior mutability.
pub trait Indexable {
    fn get(&self, key: &Key) -> FunResult<Value>;
    fn set(&self, key: Key, value: Value) -> FunResult<()>;
    fn unset(&self, key: &Key) -> FunResult<()>;
    fn exists(&self, key: &Key) -> FunResult<bool>;
}

/// Plain field-bearing object: named, read-only fields.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: Arc<str>,
    fields: IndexMap<Arc<str>, Value>,
}

impl Record {
    pub fn new(type_name: &str) -> Self {
        Record {
            type_name: Arc::from(type_name),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(Arc::from(name), value.into());
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl Object for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_property(&self, name: &str) -> FunResult<Value> {
        self.fields.get(name).cloned().ok_or_else(|| {
            FunError::UnsupportedOperation(format!(
                "{} has no property '{}'",
                self.type_name, name
            ))
        })
    }
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(items))
    }

    pub fn map<K, V, I>(entries: I) -> Value
    where
        K: Into<Key>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn empty_map() -> Value {
        Value::Map(Arc::new(ValueMap::new()))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(obj) => obj.type_name(),
            Value::Func(_) => "callable",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Object(_) | Value::Func(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.to_string()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Object(obj) => Json::String(format!("<object:{}>", obj.type_name())),
            Value::Func(func) => Json::String(format!("<callable:{}>", func.name())),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(Arc::from(s)),
            Json::Array(items) => Value::list(items.into_iter().map(Value::from).collect()),
            Json::Object(entries) => Value::map(entries.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<Callable> for Value {
    fn from(func: Callable) -> Self {
        Value::Func(func)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

// --- PartialEq Implementation ---
// Plain data compares structurally; objects and callables compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
            (Value::Int(i1), Value::Int(i2)) => i1 == i2,
            (Value::Float(n1), Value::Float(n2)) => n1 == n2,
            (Value::Str(s1), Value::Str(s2)) => s1 == s2,
            (Value::List(l1), Value::List(l2)) => Arc::ptr_eq(l1, l2) || l1 == l2,
            (Value::Map(m1), Value::Map(m2)) => Arc::ptr_eq(m1, m2) || m1 == m2,
            (Value::Object(o1), Value::Object(o2)) => {
                std::ptr::addr_eq(Arc::as_ptr(o1), Arc::as_ptr(o2))
            }
            (Value::Func(f1), Value::Func(f2)) => f1.ptr_eq(f2),
            _ => false,
        }
    }
}

// --- Display Implementation ---
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => {
                // Print integral floats without .0
                if n.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(n) {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
            Value::Object(obj) => write!(f, "<object:{}>", obj.type_name()),
            Value::Func(func) => write!(f, "<callable:{}>", func.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_emptiness_and_zero() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(!Value::empty_map().is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::str("0").is_truthy());
        assert!(Record::new("point").into_value().is_truthy());
    }

    #[test]
    fn maps_compare_by_content_and_objects_by_identity() {
        let a = Value::map([("x", 1), ("y", 2)]);
        let b = Value::map([("y", 2), ("x", 1)]);
        assert_eq!(a, b);

        let r1 = Record::new("r").into_value();
        let r2 = Record::new("r").into_value();
        assert_eq!(r1, r1.clone());
        assert_ne!(r1, r2);
    }

    #[test]
    fn json_conversion_keeps_order() {
        let json: serde_json::Value = serde_json::from_str(r#"{"b": 1, "a": [true, null, 2.5]}"#).unwrap();
        let value = Value::from(json.clone());
        let keys: Vec<Key> = match &value {
            Value::Map(m) => m.keys().cloned().collect(),
            other => panic!("expected map, got {:?}", other),
        };
        assert_eq!(keys, vec![Key::from("b"), Key::from("a")]);
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn record_reads_fields() {
        let rec = Record::new("point").with_field("x", 3);
        assert_eq!(rec.get_property("x"), Ok(Value::Int(3)));
        assert!(matches!(
            rec.get_property("z"),
            Err(FunError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn keys_from_values() {
        assert_eq!(Key::try_from(&Value::Int(2)), Ok(Key::Int(2)));
        assert_eq!(Key::try_from(&Value::Bool(true)), Ok(Key::Int(1)));
        assert!(Key::try_from(&Value::Float(1.5)).is_err());
    }

    #[test]
    fn decimal_strings_are_integer_keys() {
        assert_eq!(Key::from("0"), Key::Int(0));
        assert_eq!(Key::from("-12".to_string()), Key::Int(-12));
        assert_eq!(Key::try_from(&Value::str("7")), Ok(Key::Int(7)));
        assert_eq!(Key::from("07"), Key::Str("07".into()));
        assert_eq!(Key::from("+7"), Key::Str("+7".into()));
        assert_eq!(Key::from("-0"), Key::Str("-0".into()));
        assert_eq!(Key::from("1.5"), Key::Str("1.5".into()));
        assert_eq!(
            Key::from("99999999999999999999"),
            Key::Str("99999999999999999999".into())
        );
    }

    #[test]
    fn json_object_keys_read_back_as_integers() {
        let value = Value::from(serde_json::json!({"0": "x", "name": "y"}));
        assert_eq!(value, Value::map([(Key::Int(0), "x"), (Key::from("name"), "y")]));
        assert_eq!(Value::from(value.to_json()), value);
    }

    #[test]
    fn large_integral_floats_display_exactly() {
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Float(-1e20).to_string(), "-100000000000000000000");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
    }
}
