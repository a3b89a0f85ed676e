//! Input formats.
//!
//! Each adapter allocates a fresh arguments struct, fills the fields that
//! have input and returns one value per argument in argument order. Fields
//! without input keep their default value. The first conversion failure
//! aborts with an error naming the argument.

use std::any::Any;
use std::collections::HashMap;

use serde_json::Value;

use crate::arg::{ArgSlot, ArgValue};
use crate::args::{ArgField, ArgsDef, ArgsInstance};
use crate::error::{BuildError, Error};

fn field_slot<'a>(
    def: &ArgsDef,
    instance: &'a mut dyn ArgsInstance,
    field: &ArgField,
) -> Result<&'a mut dyn ArgSlot, Error> {
    instance.slot(field.path()).ok_or_else(|| {
        Error::Build(BuildError::InvalidFieldPath {
            outer: def.outer_type().name(),
            name: field.name().to_string(),
            field_type: field.arg_type().name(),
        })
    })
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

impl ArgsDef {
    fn fill<F>(&self, mut assign: F) -> Result<Vec<ArgValue>, Error>
    where
        F: FnMut(usize, &ArgField, &mut dyn ArgSlot) -> Result<(), Error>,
    {
        let mut instance = self.new_instance();
        for (index, field) in self.args().iter().enumerate() {
            let slot = field_slot(self, instance.as_mut(), field)?;
            assign(index, field, slot)?;
        }
        self.args()
            .iter()
            .map(|field| {
                field_slot(self, instance.as_mut(), field)
                    .map(|slot| ArgValue::from_boxed(slot.take_boxed()))
            })
            .collect()
    }

    /// Positional strings: the i-th string goes to the i-th argument.
    ///
    /// Missing strings leave defaults, extra strings are ignored.
    pub fn values_from_strings<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<ArgValue>, Error> {
        self.fill(|index, field, slot| match args.get(index) {
            Some(source) => slot
                .set_from_str(source.as_ref())
                .map_err(|err| Error::convert(field.name(), err)),
            None => Ok(()),
        })
    }

    /// Strings by argument name. Unknown names are ignored.
    pub fn values_from_string_map(
        &self,
        args: &HashMap<String, String>,
    ) -> Result<Vec<ArgValue>, Error> {
        self.fill(|_, field, slot| match args.get(field.name()) {
            Some(source) => slot
                .set_from_str(source)
                .map_err(|err| Error::convert(field.name(), err)),
            None => Ok(()),
        })
    }

    /// Typed values by argument name.
    ///
    /// A value must have exactly the argument's type, or be a `Box` of it.
    /// Unknown names are ignored.
    pub fn values_from_value_map(
        &self,
        mut args: HashMap<String, Box<dyn Any + Send>>,
    ) -> Result<Vec<ArgValue>, Error> {
        self.fill(|_, field, slot| match args.remove(field.name()) {
            Some(value) => slot
                .set_from_any(value)
                .map_err(|err| Error::convert(field.name(), err)),
            None => Ok(()),
        })
    }

    /// A JSON document: either an array of positional values or an object
    /// keyed by argument name.
    ///
    /// Extra array elements and unknown object keys are ignored.
    pub fn values_from_json(&self, json: &[u8]) -> Result<Vec<ArgValue>, Error> {
        let trimmed = trim_ascii_whitespace(json);
        if trimmed.len() < 2 {
            return Err(Error::InvalidJson {
                input: String::from_utf8_lossy(json).into_owned(),
            });
        }

        if trimmed[0] == b'[' {
            let mut items: Vec<Value> = serde_json::from_slice(trimmed)?;
            items.truncate(self.num_args());
            let mut items = items.into_iter();
            return self.fill(|_, field, slot| match items.next() {
                Some(value) => slot
                    .set_from_json(value)
                    .map_err(|err| Error::convert(field.name(), err)),
                None => Ok(()),
            });
        }

        let mut object: serde_json::Map<String, Value> = serde_json::from_slice(trimmed)?;
        self.fill(|_, field, slot| match object.remove(field.name()) {
            Some(value) => slot
                .set_from_json(value)
                .map_err(|err| Error::convert(field.name(), err)),
            None => Ok(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;

    #[derive(Default)]
    struct CommandArgs {
        int0: i32,
        str1: String,
        bool2: bool,
        list3: Vec<i32>,
    }

    impl Args for CommandArgs {
        fn arg_fields() -> Vec<ArgField> {
            vec![
                ArgField::new::<i32>("int0", "", 0),
                ArgField::new::<String>("str1", "", 1),
                ArgField::new::<bool>("bool2", "", 2),
                ArgField::new::<Vec<i32>>("list3", "", 3),
            ]
        }

        fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
            match path {
                [0] => Some(&mut self.int0 as &mut dyn ArgSlot),
                [1] => Some(&mut self.str1 as &mut dyn ArgSlot),
                [2] => Some(&mut self.bool2 as &mut dyn ArgSlot),
                [3] => Some(&mut self.list3 as &mut dyn ArgSlot),
                _ => None,
            }
        }
    }

    fn def() -> std::sync::Arc<ArgsDef> {
        ArgsDef::of::<CommandArgs>().unwrap()
    }

    fn unpack(values: Vec<ArgValue>) -> (i32, String, bool, Vec<i32>) {
        let mut values = values.into_iter();
        (
            values.next().unwrap().take().unwrap(),
            values.next().unwrap().take().unwrap(),
            values.next().unwrap().take().unwrap(),
            values.next().unwrap().take().unwrap(),
        )
    }

    // =========================================================================
    // Positional strings
    // =========================================================================

    #[test]
    fn test_strings_all() {
        let values = def()
            .values_from_strings(&["123", "Hello World!", "true", "[1,2,3]"])
            .unwrap();
        assert_eq!(
            unpack(values),
            (123, "Hello World!".to_string(), true, vec![1, 2, 3])
        );
    }

    #[test]
    fn test_strings_partial_leaves_defaults() {
        let values = def().values_from_strings(&["7"]).unwrap();
        assert_eq!(unpack(values), (7, String::new(), false, vec![]));
    }

    #[test]
    fn test_strings_extra_ignored() {
        let values = def()
            .values_from_strings(&["1", "a", "f", "[]", "surplus"])
            .unwrap();
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_strings_error_names_argument() {
        let err = def().values_from_strings(&["1", "a", "perhaps"]).unwrap_err();
        match err {
            Error::Convert { arg, .. } => assert_eq!(arg, "bool2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_each_call_gets_fresh_values() {
        let first = def().values_from_strings(&["5", "x"]).unwrap();
        let second = def().values_from_strings::<&str>(&[]).unwrap();
        assert_eq!(unpack(first).0, 5);
        assert_eq!(unpack(second).0, 0);
    }

    // =========================================================================
    // String map
    // =========================================================================

    #[test]
    fn test_string_map_ignores_unknown_keys() {
        let args: HashMap<String, String> = [
            ("int0", "123"),
            ("str1", "Hello World!"),
            ("bool2", "true"),
            ("unknown", "whatever"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let values = def().values_from_string_map(&args).unwrap();
        assert_eq!(
            unpack(values),
            (123, "Hello World!".to_string(), true, vec![])
        );
    }

    // =========================================================================
    // Value map
    // =========================================================================

    #[test]
    fn test_value_map_exact_types() {
        let mut args: HashMap<String, Box<dyn Any + Send>> = HashMap::new();
        args.insert("int0".into(), Box::new(9i32));
        args.insert("list3".into(), Box::new(Box::new(vec![4, 5])));
        let values = def().values_from_value_map(args).unwrap();
        assert_eq!(unpack(values), (9, String::new(), false, vec![4, 5]));
    }

    #[test]
    fn test_value_map_rejects_other_types() {
        let mut args: HashMap<String, Box<dyn Any + Send>> = HashMap::new();
        args.insert("int0".into(), Box::new(9i64));
        let err = def().values_from_value_map(args).unwrap_err();
        assert!(matches!(err, Error::Convert { ref arg, .. } if arg == "int0"));
    }

    // =========================================================================
    // JSON
    // =========================================================================

    #[test]
    fn test_json_array() {
        let values = def()
            .values_from_json(br#" [123, "Hello", "true", [1, 2], "extra"] "#)
            .unwrap();
        assert_eq!(unpack(values), (123, "Hello".to_string(), true, vec![1, 2]));
    }

    #[test]
    fn test_json_short_array_leaves_defaults() {
        let values = def().values_from_json(b"[1]").unwrap();
        assert_eq!(unpack(values), (1, String::new(), false, vec![]));
    }

    #[test]
    fn test_json_object() {
        let values = def()
            .values_from_json(br#"{"str1": "named", "bool2": true, "other": 1}"#)
            .unwrap();
        assert_eq!(unpack(values), (0, "named".to_string(), true, vec![]));
    }

    #[test]
    fn test_json_too_short() {
        assert!(matches!(
            def().values_from_json(b" { "),
            Err(Error::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_json_malformed() {
        assert!(matches!(
            def().values_from_json(b"{int0: 1}"),
            Err(Error::Json(_))
        ));
        assert!(matches!(def().values_from_json(b"42"), Err(Error::Json(_))));
    }

    #[test]
    fn test_json_wrong_type_names_argument() {
        let err = def().values_from_json(br#"{"list3": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, Error::Convert { ref arg, .. } if arg == "list3"));
    }
}
