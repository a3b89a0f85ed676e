//! Arguments structs and their descriptors.
//!
//! An arguments struct declares, through its fields, the ordered names and
//! types of a command's arguments. It is usually derived:
//!
//! ```rust,ignore
//! use cmdbind::Args;
//!
//! #[derive(Args, Default)]
//! struct CopyArgs {
//!     #[arg(description = "file to copy")]
//!     source: PathBuf,
//!     #[arg(name = "dest")]
//!     destination: PathBuf,
//!     #[arg(flatten)]
//!     common: CommonArgs,
//! }
//! ```
//!
//! [`ArgsDef::of`] derives the [`ArgsDef`] descriptor for such a type once
//! and caches it for the rest of the process.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::arg::{Arg, ArgSlot, ArgType};
use crate::error::BuildError;

/// A struct whose fields describe a command's arguments.
///
/// Use `#[derive(Args)]` rather than implementing this by hand.
pub trait Args: Default + Send + 'static {
    /// The flattened argument fields in declaration order.
    fn arg_fields() -> Vec<ArgField>;

    /// The field at `path`, as returned by [`ArgField::path`].
    fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot>;
}

/// Commands without arguments use the unit type.
impl Args for () {
    fn arg_fields() -> Vec<ArgField> {
        Vec::new()
    }

    fn arg_slot(&mut self, _path: &[usize]) -> Option<&mut dyn ArgSlot> {
        None
    }
}

/// Arguments struct for commands that take no arguments.
pub type NoArgs = ();

/// One argument of an arguments struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgField {
    name: String,
    description: String,
    path: Vec<usize>,
    ty: ArgType,
    tags: Vec<(String, String)>,
}

impl ArgField {
    /// Describes the field with declaration index `index` and type `T`.
    pub fn new<T: Arg>(name: impl Into<String>, description: impl Into<String>, index: usize) -> Self {
        ArgField {
            name: name.into(),
            description: description.into(),
            path: vec![index],
            ty: ArgType::of::<T>(),
            tags: Vec::new(),
        }
    }

    /// Attaches a free-form `key = value` tag, replacing an earlier value.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some(tag) => tag.1 = value,
            None => self.tags.push((key, value)),
        }
        self
    }

    /// Prepends the index of the struct field this one is flattened from.
    pub fn prefixed(mut self, index: usize) -> Self {
        self.path.insert(0, index);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Field indices leading from the outer struct to this field.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn arg_type(&self) -> ArgType {
        self.ty
    }

    /// The tag `key`. `name` and `description` are answered from the field
    /// unless tagged explicitly; an empty description counts as missing.
    pub fn tag(&self, key: &str) -> Option<&str> {
        if let Some((_, value)) = self.tags.iter().find(|(k, _)| k == key) {
            return Some(value.as_str());
        }
        match key {
            "name" => Some(self.name.as_str()),
            "description" if !self.description.is_empty() => Some(self.description.as_str()),
            _ => None,
        }
    }

    /// Explicit tags in declaration order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A freshly allocated arguments struct, erased.
pub(crate) trait ArgsInstance {
    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot>;
}

impl<A: Args> ArgsInstance for A {
    fn slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
        self.arg_slot(path)
    }
}

fn new_instance<A: Args>() -> Box<dyn ArgsInstance> {
    Box::new(A::default())
}

/// Descriptor of an arguments struct: its ordered, named, typed arguments.
///
/// Obtained with [`ArgsDef::of`], which derives the descriptor on first use
/// and returns the cached one afterwards.
pub struct ArgsDef {
    outer_type: ArgType,
    fields: Vec<ArgField>,
    new_instance: fn() -> Box<dyn ArgsInstance>,
}

static REGISTRY: Lazy<RwLock<HashMap<TypeId, Arc<ArgsDef>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

impl ArgsDef {
    /// Returns the descriptor of `A`, deriving and caching it on first use.
    ///
    /// Concurrent first use is safe: the first descriptor stored wins and
    /// every caller gets that one.
    pub fn of<A: Args>() -> Result<Arc<ArgsDef>, BuildError> {
        let key = TypeId::of::<A>();
        if let Some(def) = REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(def));
        }

        let def = Arc::new(Self::derive::<A>()?);
        let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
        let def = registry.entry(key).or_insert(def);
        tracing::debug!(
            outer = %def.outer_type,
            num_args = def.num_args(),
            "derived arguments descriptor"
        );
        Ok(Arc::clone(def))
    }

    /// Like [`ArgsDef::of`], inferring the type from a value.
    pub fn of_value<A: Args>(_args: &A) -> Result<Arc<ArgsDef>, BuildError> {
        Self::of::<A>()
    }

    /// Like [`ArgsDef::of`], panicking on an invalid arguments struct.
    pub fn must_of<A: Args>() -> Arc<ArgsDef> {
        match Self::of::<A>() {
            Ok(def) => def,
            Err(err) => panic!("{err}"),
        }
    }

    /// Descriptor for commands without arguments.
    pub fn none() -> Arc<ArgsDef> {
        Self::must_of::<NoArgs>()
    }

    fn derive<A: Args>() -> Result<ArgsDef, BuildError> {
        let outer_type = ArgType::of::<A>();
        let fields = A::arg_fields();

        let mut names = HashSet::new();
        for field in &fields {
            if !names.insert(field.name()) {
                return Err(BuildError::DuplicateArgName {
                    outer: outer_type.name(),
                    name: field.name.clone(),
                });
            }
        }

        let mut probe = A::default();
        for field in &fields {
            let resolves = probe
                .arg_slot(field.path())
                .is_some_and(|slot| slot.arg_type() == field.ty);
            if !resolves {
                return Err(BuildError::InvalidFieldPath {
                    outer: outer_type.name(),
                    name: field.name.clone(),
                    field_type: field.ty.name(),
                });
            }
        }

        Ok(ArgsDef {
            outer_type,
            fields,
            new_instance: new_instance::<A>,
        })
    }

    pub fn outer_type(&self) -> ArgType {
        self.outer_type
    }

    pub fn num_args(&self) -> usize {
        self.fields.len()
    }

    pub fn args(&self) -> &[ArgField] {
        &self.fields
    }

    pub fn arg(&self, index: usize) -> Option<&ArgField> {
        self.fields.get(index)
    }

    pub fn arg_name(&self, index: usize) -> Option<&str> {
        self.arg(index).map(ArgField::name)
    }

    pub fn arg_description(&self, index: usize) -> Option<&str> {
        self.arg(index).map(ArgField::description)
    }

    pub fn arg_type(&self, index: usize) -> Option<ArgType> {
        self.arg(index).map(ArgField::arg_type)
    }

    /// Tag `key` of argument `index`, see [`ArgField::tag`].
    pub fn arg_tag(&self, index: usize, key: &str) -> Option<&str> {
        self.arg(index)?.tag(key)
    }

    /// Index of the argument called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// True if any argument has a description.
    pub fn has_descriptions(&self) -> bool {
        self.fields.iter().any(|f| !f.description.is_empty())
    }

    pub(crate) fn new_instance(&self) -> Box<dyn ArgsInstance> {
        (self.new_instance)()
    }
}

/// Renders the arguments as `<name:type> <name:type> ...`.
impl fmt::Display for ArgsDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "<{}:{}>", field.name, field.ty)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ArgsDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgsDef")
            .field("outer_type", &self.outer_type)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hand-written impls; the derive is covered by tests/args_derive.rs.

    #[derive(Default)]
    struct Inner {
        verbose: bool,
    }

    impl Args for Inner {
        fn arg_fields() -> Vec<ArgField> {
            vec![ArgField::new::<bool>("verbose", "print more", 0)
                .with_tag("env", "VERBOSE")
                .with_tag("flag", "v")]
        }

        fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
            match path {
                [0] => Some(&mut self.verbose as &mut dyn ArgSlot),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct Outer {
        count: i32,
        name: String,
        inner: Inner,
    }

    impl Args for Outer {
        fn arg_fields() -> Vec<ArgField> {
            let mut fields = vec![
                ArgField::new::<i32>("count", "", 0),
                ArgField::new::<String>("name", "", 1),
            ];
            fields.extend(Inner::arg_fields().into_iter().map(|f| f.prefixed(2)));
            fields
        }

        fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
            match path {
                [0] => Some(&mut self.count as &mut dyn ArgSlot),
                [1] => Some(&mut self.name as &mut dyn ArgSlot),
                [2, rest @ ..] => self.inner.arg_slot(rest),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct Duplicate {
        a: i32,
    }

    impl Args for Duplicate {
        fn arg_fields() -> Vec<ArgField> {
            vec![ArgField::new::<i32>("a", "", 0), ArgField::new::<i32>("a", "", 0)]
        }

        fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
            match path {
                [0] => Some(&mut self.a as &mut dyn ArgSlot),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct WrongType {
        a: i32,
    }

    impl Args for WrongType {
        fn arg_fields() -> Vec<ArgField> {
            vec![ArgField::new::<i64>("a", "", 0)]
        }

        fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
            match path {
                [0] => Some(&mut self.a as &mut dyn ArgSlot),
                _ => None,
            }
        }
    }

    #[test]
    fn test_flattened_fields() {
        let def = ArgsDef::of::<Outer>().unwrap();
        assert_eq!(def.num_args(), 3);
        assert_eq!(def.arg_name(0), Some("count"));
        assert_eq!(def.arg_name(2), Some("verbose"));
        assert_eq!(def.args()[2].path(), &[2, 0]);
        assert_eq!(def.arg_description(2), Some("print more"));
        assert_eq!(def.arg_type(1), Some(ArgType::of::<String>()));
        assert_eq!(def.index_of("name"), Some(1));
        assert!(def.has_descriptions());
    }

    #[test]
    fn test_arg_tags() {
        let def = ArgsDef::of::<Outer>().unwrap();
        assert_eq!(def.arg_tag(2, "env"), Some("VERBOSE"));
        assert_eq!(def.arg_tag(2, "flag"), Some("v"));
        assert_eq!(def.arg_tag(2, "description"), Some("print more"));
        assert_eq!(def.arg_tag(0, "name"), Some("count"));
        assert_eq!(def.arg_tag(0, "description"), None);
        assert_eq!(def.arg_tag(0, "env"), None);
        assert_eq!(def.arg_tag(9, "name"), None);
        assert_eq!(
            def.args()[2].tags().collect::<Vec<_>>(),
            vec![("env", "VERBOSE"), ("flag", "v")]
        );
    }

    #[test]
    fn test_with_tag_replaces() {
        let field = ArgField::new::<u8>("level", "", 0)
            .with_tag("env", "A")
            .with_tag("env", "B");
        assert_eq!(field.tag("env"), Some("B"));
        assert_eq!(field.tags().count(), 1);
    }

    #[test]
    fn test_cached_descriptor_is_shared() {
        let a = ArgsDef::of::<Outer>().unwrap();
        let b = ArgsDef::of_value(&Outer::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_first_use_yields_one_descriptor() {
        #[derive(Default)]
        struct Fresh {
            x: u8,
        }

        impl Args for Fresh {
            fn arg_fields() -> Vec<ArgField> {
                vec![ArgField::new::<u8>("x", "", 0)]
            }

            fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
                match path {
                    [0] => Some(&mut self.x as &mut dyn ArgSlot),
                    _ => None,
                }
            }
        }

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| ArgsDef::of::<Fresh>().unwrap()))
            .collect();
        let defs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for def in &defs[1..] {
            assert!(Arc::ptr_eq(&defs[0], def));
        }
    }

    #[test]
    fn test_display() {
        let def = ArgsDef::of::<Outer>().unwrap();
        assert_eq!(
            def.to_string(),
            "<count:i32> <name:String> <verbose:bool>"
        );
        assert_eq!(ArgsDef::none().to_string(), "");
    }

    #[test]
    fn test_no_args() {
        let def = ArgsDef::none();
        assert_eq!(def.num_args(), 0);
        assert!(!def.has_descriptions());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = ArgsDef::of::<Duplicate>().unwrap_err();
        assert!(matches!(err, BuildError::DuplicateArgName { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        let err = ArgsDef::of::<WrongType>().unwrap_err();
        assert!(matches!(err, BuildError::InvalidFieldPath { .. }));
    }

    #[test]
    fn test_instance_slots() {
        let def = ArgsDef::of::<Outer>().unwrap();
        let mut instance = def.new_instance();
        let slot = instance.slot(&[2, 0]).unwrap();
        slot.set_from_str("true").unwrap();
        assert!(slot.as_any().downcast_ref::<bool>().copied().unwrap());
        assert!(instance.slot(&[5]).is_none());
    }
}
