//! Typed argument slots.
//!
//! Every type that can appear as a field of an arguments struct (and thus as
//! a parameter of a bound function) implements [`Arg`]. The trait converts
//! text and JSON into the value in place, which is what the input adapters
//! need: they allocate a default arguments struct and then overwrite the
//! fields that have input.
//!
//! Implementations are provided for:
//!
//! | Type | String input | JSON input |
//! |------|--------------|------------|
//! | integers, floats, `char` | trimmed `FromStr` | number or string |
//! | `bool` | `true`/`false`/`t`/`f`/`1`/`0` | bool or string |
//! | `String` | verbatim | string |
//! | [`RawBytes`] | UTF-8 bytes | string or byte array |
//! | `PathBuf` | verbatim path | string |
//! | `Duration` | `1h30m`, `250ms`, ... | nanoseconds or string |
//! | chrono date/time types | ordered format list | string |
//! | `serde_json::Value`, `Map`, `HashMap<String, V>` | JSON document | any |
//! | [`Json<T>`] | JSON document | any |
//! | `Option<T>`, `Box<T>` | recurses, `"nil"` leaves unchanged | recurses, `null` clears |
//! | `Vec<T>`, `[T; N]` | `[a,b,c]` literal | array |
//! | [`Context`], [`Callback<F>`] | ignored | ignored |
//!
//! Use [`from_str_arg!`](crate::from_str_arg) for your own `FromStr` types
//! and [`json_arg!`](crate::json_arg) for your own serde types.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::convert;
use crate::error::ConvertError;

// =============================================================================
// ArgType
// =============================================================================

/// Identity and display name of an argument or parameter type.
///
/// Two `ArgType`s are equal when they describe the same Rust type.
#[derive(Clone, Copy)]
pub struct ArgType {
    id: TypeId,
    name: &'static str,
}

impl ArgType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        ArgType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name.
    pub fn full_name(&self) -> &'static str {
        self.name
    }

    /// The type name without module paths, e.g. `Vec<String>`.
    pub fn name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for ArgType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ArgType {}

impl Hash for ArgType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgType({})", self.name())
    }
}

/// Strips module paths from every path segment of a type name.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
        } else {
            out.push(c);
            if !(c.is_alphanumeric() || c == '_') {
                segment_start = out.len();
            }
        }
    }
    out
}

// =============================================================================
// Arg
// =============================================================================

/// A type that can be assigned from string and JSON input.
///
/// `Default` provides the zero value an argument keeps when no input is
/// given for it.
pub trait Arg: Any + Send + Clone + Default + fmt::Debug {
    /// Callback parameters are not matched against argument fields; the
    /// dispatcher passes a default value in their place.
    const IS_CALLBACK: bool = false;

    /// Overwrites the value with the one parsed from `source`.
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError>;

    /// Overwrites the value with the one converted from a JSON value.
    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError>;
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Error for a JSON value of the wrong kind.
pub fn json_type_mismatch<T: ?Sized + 'static>(value: &Value) -> ConvertError {
    ConvertError::TypeMismatch {
        expected: ArgType::of::<T>().name(),
        actual: format!("JSON {}", json_kind(value)),
    }
}

/// Parses `source` with `FromStr` after trimming whitespace.
pub fn assign_parsed<T>(dest: &mut T, source: &str) -> Result<(), ConvertError>
where
    T: FromStr + 'static,
    T::Err: fmt::Display,
{
    *dest = source
        .trim()
        .parse()
        .map_err(|err: T::Err| ConvertError::Parse {
            input: source.to_string(),
            type_name: ArgType::of::<T>().name(),
            message: err.to_string(),
        })?;
    Ok(())
}

/// JSON conversion for scalars: strings and numbers go through
/// [`Arg::assign_str`], `null` leaves the value unchanged.
pub fn assign_scalar_json<T: Arg>(dest: &mut T, value: Value) -> Result<(), ConvertError> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) => dest.assign_str(&s),
        Value::Number(n) => dest.assign_str(&n.to_string()),
        Value::Bool(b) => dest.assign_str(if b { "true" } else { "false" }),
        other => Err(json_type_mismatch::<T>(&other)),
    }
}

/// Parses `source` as a JSON document.
pub fn assign_json_str<T: DeserializeOwned>(dest: &mut T, source: &str) -> Result<(), ConvertError> {
    *dest = serde_json::from_str(source)?;
    Ok(())
}

/// Deserializes an already parsed JSON value.
pub fn assign_json_value<T: DeserializeOwned>(dest: &mut T, value: Value) -> Result<(), ConvertError> {
    *dest = serde_json::from_value(value)?;
    Ok(())
}

/// Implements [`Arg`] for types parsed with `FromStr`.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default)]
/// struct Port(u16);
/// impl std::str::FromStr for Port { /* ... */ }
///
/// cmdbind::from_str_arg!(Port);
/// ```
#[macro_export]
macro_rules! from_str_arg {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Arg for $ty {
                fn assign_str(&mut self, source: &str) -> ::std::result::Result<(), $crate::ConvertError> {
                    $crate::__private::assign_parsed(self, source)
                }

                fn assign_json(&mut self, value: $crate::__private::Value) -> ::std::result::Result<(), $crate::ConvertError> {
                    $crate::__private::assign_scalar_json(self, value)
                }
            }
        )+
    };
}

/// Implements [`Arg`] for serde types, parsing string input as JSON.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Point { x: i32, y: i32 }
///
/// cmdbind::json_arg!(Point);
/// ```
#[macro_export]
macro_rules! json_arg {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Arg for $ty {
                fn assign_str(&mut self, source: &str) -> ::std::result::Result<(), $crate::ConvertError> {
                    $crate::__private::assign_json_str(self, source)
                }

                fn assign_json(&mut self, value: $crate::__private::Value) -> ::std::result::Result<(), $crate::ConvertError> {
                    $crate::__private::assign_json_value(self, value)
                }
            }
        )+
    };
}

from_str_arg!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

impl Arg for bool {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        *self = convert::parse_bool(source)?;
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        assign_scalar_json(self, value)
    }
}

impl Arg for String {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        source.clone_into(self);
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => {
                *self = s;
                Ok(())
            }
            other => Err(json_type_mismatch::<String>(&other)),
        }
    }
}

impl Arg for PathBuf {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        *self = PathBuf::from(source);
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => self.assign_str(&s),
            other => Err(json_type_mismatch::<PathBuf>(&other)),
        }
    }
}

/// Raw bytes, assigned from the UTF-8 bytes of the input string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBytes(pub Vec<u8>);

impl Arg for RawBytes {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        self.0 = source.as_bytes().to_vec();
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => {
                self.0 = s.into_bytes();
                Ok(())
            }
            array @ Value::Array(_) => assign_json_value(&mut self.0, array),
            other => Err(json_type_mismatch::<RawBytes>(&other)),
        }
    }
}

impl Arg for Duration {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        *self = convert::parse_duration(source)?;
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => self.assign_str(&s),
            Value::Number(n) => match n.as_u64() {
                Some(nanos) => {
                    *self = Duration::from_nanos(nanos);
                    Ok(())
                }
                None => Err(ConvertError::Parse {
                    input: n.to_string(),
                    type_name: "Duration".into(),
                    message: "expected a non-negative number of nanoseconds".into(),
                }),
            },
            other => Err(json_type_mismatch::<Duration>(&other)),
        }
    }
}

macro_rules! time_arg {
    ($ty:ty, $parse:path) => {
        impl Arg for $ty {
            fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
                *self = $parse(source)?;
                Ok(())
            }

            fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
                match value {
                    Value::Null => Ok(()),
                    Value::String(s) => self.assign_str(&s),
                    other => Err(json_type_mismatch::<$ty>(&other)),
                }
            }
        }
    };
}

time_arg!(DateTime<Utc>, convert::parse_utc);
time_arg!(DateTime<FixedOffset>, convert::parse_fixed_offset);
time_arg!(NaiveDateTime, convert::parse_naive_date_time);
time_arg!(NaiveDate, convert::parse_date);

impl Arg for Value {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        assign_json_str(self, source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        *self = value;
        Ok(())
    }
}

impl Arg for serde_json::Map<String, Value> {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        assign_json_str(self, source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::Object(map) => {
                *self = map;
                Ok(())
            }
            other => Err(json_type_mismatch::<Self>(&other)),
        }
    }
}

impl<V> Arg for HashMap<String, V>
where
    V: DeserializeOwned + Clone + fmt::Debug + Send + 'static,
{
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        assign_json_str(self, source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        assign_json_value(self, value)
    }
}

impl<V> Arg for BTreeMap<String, V>
where
    V: DeserializeOwned + Clone + fmt::Debug + Send + 'static,
{
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        assign_json_str(self, source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        assign_json_value(self, value)
    }
}

/// Wrapper for struct-like arguments given as JSON objects.
///
/// Serializes and derefs transparently to the inner value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Arg for Json<T>
where
    T: DeserializeOwned + Clone + Default + fmt::Debug + Send + 'static,
{
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        assign_json_str(&mut self.0, source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        assign_json_value(&mut self.0, value)
    }
}

/// The literal `"nil"` leaves the option unchanged, including a value that
/// is already present. Anything else allocates the value if needed and
/// assigns into it.
impl<T: Arg> Arg for Option<T> {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        if source == "nil" {
            return Ok(());
        }
        self.get_or_insert_with(T::default).assign_str(source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).assign_json(value)
    }
}

impl<T: Arg> Arg for Box<T> {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        (**self).assign_str(source)
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        (**self).assign_json(value)
    }
}

impl<T: Arg> Arg for Vec<T> {
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        let fields = convert::slice_literal_fields(source)?;
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            let mut value = T::default();
            value.assign_str(field)?;
            values.push(value);
        }
        *self = values;
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::Null => {
                self.clear();
                Ok(())
            }
            Value::String(s) => self.assign_str(&s),
            Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let mut value = T::default();
                    value.assign_json(item)?;
                    values.push(value);
                }
                *self = values;
                Ok(())
            }
            other => Err(json_type_mismatch::<Self>(&other)),
        }
    }
}

impl<T: Arg, const N: usize> Arg for [T; N]
where
    [T; N]: Default,
{
    fn assign_str(&mut self, source: &str) -> Result<(), ConvertError> {
        let fields = convert::slice_literal_fields(source)?;
        if fields.len() != N {
            return Err(ConvertError::ArrayLength {
                input: source.to_string(),
                expected: N,
                actual: fields.len(),
            });
        }
        for (slot, field) in self.iter_mut().zip(&fields) {
            slot.assign_str(field)?;
        }
        Ok(())
    }

    fn assign_json(&mut self, value: Value) -> Result<(), ConvertError> {
        match value {
            Value::String(s) => self.assign_str(&s),
            Value::Array(items) => {
                let actual = items.len();
                if actual != N {
                    return Err(ConvertError::ArrayLength {
                        input: Value::Array(items).to_string(),
                        expected: N,
                        actual,
                    });
                }
                for (slot, item) in self.iter_mut().zip(items) {
                    slot.assign_json(item)?;
                }
                Ok(())
            }
            other => Err(json_type_mismatch::<Self>(&other)),
        }
    }
}

impl Arg for Context {
    fn assign_str(&mut self, _source: &str) -> Result<(), ConvertError> {
        Ok(())
    }

    fn assign_json(&mut self, _value: Value) -> Result<(), ConvertError> {
        Ok(())
    }
}

// =============================================================================
// Callback
// =============================================================================

/// A callback parameter.
///
/// Callback parameters are skipped when a function is matched against its
/// arguments struct and receive an empty `Callback` at call time, which
/// the function can test with [`Callback::get`].
pub struct Callback<F: ?Sized>(pub Option<Arc<F>>);

impl<F: ?Sized> Callback<F> {
    pub fn new(f: Arc<F>) -> Self {
        Callback(Some(f))
    }

    pub fn get(&self) -> Option<&F> {
        self.0.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Callback(self.0.clone())
    }
}

impl<F: ?Sized> Default for Callback<F> {
    fn default() -> Self {
        Callback(None)
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback")
            .field(&if self.is_set() { "set" } else { "none" })
            .finish()
    }
}

impl<F: ?Sized + Send + Sync + 'static> Arg for Callback<F> {
    const IS_CALLBACK: bool = true;

    fn assign_str(&mut self, _source: &str) -> Result<(), ConvertError> {
        Ok(())
    }

    fn assign_json(&mut self, _value: Value) -> Result<(), ConvertError> {
        Ok(())
    }
}

// =============================================================================
// Type-erased slots
// =============================================================================

/// Object-safe view of an [`Arg`].
///
/// Implemented for every `Arg`; the descriptor and adapters work with
/// `&mut dyn ArgSlot` to fill struct fields whose types they do not know.
pub trait ArgSlot: Send + fmt::Debug {
    fn arg_type(&self) -> ArgType;

    fn set_from_str(&mut self, source: &str) -> Result<(), ConvertError>;

    fn set_from_json(&mut self, value: Value) -> Result<(), ConvertError>;

    /// Assigns a value of exactly the slot's type, or a `Box` of it.
    fn set_from_any(&mut self, value: Box<dyn Any + Send>) -> Result<(), ConvertError>;

    /// Moves the current value out, leaving the default behind.
    fn take_boxed(&mut self) -> Box<dyn ArgSlot>;

    fn clone_boxed(&self) -> Box<dyn ArgSlot>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Arg> ArgSlot for T {
    fn arg_type(&self) -> ArgType {
        ArgType::of::<T>()
    }

    fn set_from_str(&mut self, source: &str) -> Result<(), ConvertError> {
        <T as Arg>::assign_str(self, source)
    }

    fn set_from_json(&mut self, value: Value) -> Result<(), ConvertError> {
        <T as Arg>::assign_json(self, value)
    }

    fn set_from_any(&mut self, value: Box<dyn Any + Send>) -> Result<(), ConvertError> {
        let value = match value.downcast::<T>() {
            Ok(v) => {
                *self = *v;
                return Ok(());
            }
            Err(value) => value,
        };
        match value.downcast::<Box<T>>() {
            Ok(v) => {
                *self = **v;
                Ok(())
            }
            Err(_) => Err(ConvertError::TypeMismatch {
                expected: ArgType::of::<T>().name(),
                actual: "a value of another type".into(),
            }),
        }
    }

    fn take_boxed(&mut self) -> Box<dyn ArgSlot> {
        Box::new(std::mem::take(self))
    }

    fn clone_boxed(&self) -> Box<dyn ArgSlot> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A type-erased argument value, as passed to bound functions and result
/// handlers.
pub struct ArgValue(Box<dyn ArgSlot>);

impl ArgValue {
    pub fn new<T: Arg>(value: T) -> Self {
        ArgValue(Box::new(value))
    }

    pub(crate) fn from_boxed(slot: Box<dyn ArgSlot>) -> Self {
        ArgValue(slot)
    }

    pub fn arg_type(&self) -> ArgType {
        self.0.arg_type()
    }

    pub fn is<T: Arg>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Arg>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    /// Moves the value out if it has type `T`.
    pub fn take<T: Arg>(self) -> Result<T, ArgType> {
        let ty = self.arg_type();
        self.0.into_any().downcast::<T>().map(|v| *v).map_err(|_| ty)
    }
}

impl Clone for ArgValue {
    fn clone(&self) -> Self {
        ArgValue(self.0.clone_boxed())
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
