//! Type-erased function results.

use std::any::Any;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::arg::ArgType;

trait ErasedResult: Send {
    fn to_json(&self) -> Result<Value, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Serialize + Send + 'static> ErasedResult for T {
    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A value returned by a bound function.
///
/// Keeps the typed value for callers that know what to expect and offers a
/// JSON view for handlers that don't.
pub struct ResultValue {
    value: Box<dyn ErasedResult>,
    ty: ArgType,
}

impl ResultValue {
    pub fn new<T: Serialize + Send + 'static>(value: T) -> Self {
        ResultValue {
            value: Box::new(value),
            ty: ArgType::of::<T>(),
        }
    }

    pub fn result_type(&self) -> ArgType {
        self.ty
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value.as_any().is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }

    /// Moves the value out if it has type `T`.
    pub fn take<T: 'static>(self) -> Option<T> {
        self.value.into_any().downcast::<T>().ok().map(|v| *v)
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        self.value.to_json()
    }
}

impl Serialize for ResultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl fmt::Debug for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(json) => write!(f, "ResultValue({}: {json})", self.ty),
            Err(_) => write!(f, "ResultValue({})", self.ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Debug, PartialEq)]
    struct Status {
        code: u16,
    }

    #[test]
    fn test_typed_access() {
        let value = ResultValue::new(Status { code: 200 });
        assert!(value.is::<Status>());
        assert_eq!(value.downcast_ref::<Status>(), Some(&Status { code: 200 }));
        assert_eq!(value.result_type().name(), "Status");
        assert_eq!(value.take::<Status>().unwrap(), Status { code: 200 });
    }

    #[test]
    fn test_take_wrong_type() {
        assert_eq!(ResultValue::new(5u8).take::<String>(), None);
    }

    #[test]
    fn test_json_view() {
        let value = ResultValue::new(vec![Status { code: 1 }]);
        assert_eq!(value.to_json().unwrap(), json!([{"code": 1}]));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[{"code":1}]"#);
    }
}
