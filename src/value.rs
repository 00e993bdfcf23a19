//! Runtime values shared by the compiler's constant pool and the VM.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::CompiledFunction;

/// A Monkey runtime value. Aggregates are immutable and shared by reference count.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    /// Keys keep insertion order so printing is deterministic.
    Hash(Rc<IndexMap<HashKey, Value>>),
    Function(Rc<CompiledFunction>),
    Null,
}

/// The subset of values usable as hash keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
}

impl HashKey {
    /// Convert a Value to a HashKey if possible.
    pub fn from_value(value: &Value) -> Option<HashKey> {
        match value {
            Value::Integer(n) => Some(HashKey::Integer(*n)),
            Value::Boolean(b) => Some(HashKey::Boolean(*b)),
            Value::String(s) => Some(HashKey::String(Rc::clone(s))),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            HashKey::Integer(n) => Value::Integer(*n),
            HashKey::Boolean(b) => Value::Boolean(*b),
            HashKey::String(s) => Value::String(Rc::clone(s)),
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::Null => "NULL",
        }
    }

    /// `null` and `false` are falsy; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(elements))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Integer(n) => write!(f, "{}", n),
            HashKey::Boolean(b) => write!(f, "{}", b),
            HashKey::String(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, val) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, val)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => write!(f, "<fn/{}>", function.num_parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(Value::Null.is_null());
        assert!(!Value::Boolean(false).is_null());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::string("a")]),
            Value::array(vec![Value::Integer(1), Value::string("a")])
        );
        assert_ne!(Value::Integer(1), Value::Boolean(true));
        assert_ne!(Value::Null, Value::Boolean(false));
    }

    #[test]
    fn test_hash_keys() {
        assert_eq!(
            HashKey::from_value(&Value::string("k")),
            Some(HashKey::String(Rc::from("k")))
        );
        assert_eq!(HashKey::from_value(&Value::Null), None);
        assert_eq!(HashKey::from_value(&Value::array(vec![])), None);
        assert_eq!(HashKey::Integer(3).to_value(), Value::Integer(3));
    }

    #[test]
    fn test_display() {
        let mut pairs = IndexMap::new();
        pairs.insert(HashKey::Integer(1), Value::Integer(2));
        pairs.insert(HashKey::String(Rc::from("a")), Value::Boolean(true));

        assert_eq!(Value::Hash(Rc::new(pairs)).to_string(), "{1: 2, a: true}");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::Null]).to_string(),
            "[1, null]"
        );
        assert_eq!(Value::string("hi").to_string(), "hi");
    }
}
