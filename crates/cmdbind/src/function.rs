//! Calling functions through a uniform value-list convention.
//!
//! [`Function`] is implemented for every `Fn` with up to eight parameters
//! whose parameter types implement [`Arg`]. Two return shapes are
//! supported:
//!
//! - `Fn(..) -> T`: `T` is the single result, `()` means no results.
//! - `Fn(..) -> Result<T, E>`: the function has an error slot. `Err(e)`
//!   becomes the call error and no results; `Ok(t)` is handled as above.
//!
//! The marker type parameter only exists to keep the two families of impls
//! apart and is always inferred.

use std::any::TypeId;
use std::marker::PhantomData;

use serde::Serialize;

use crate::arg::{short_type_name, Arg, ArgType, ArgValue};
use crate::error::{CallError, ConvertError, Error};
use crate::result::ResultValue;

/// Marker for functions returning a plain value.
pub struct Plain<Sig>(PhantomData<Sig>);

/// Marker for functions returning `Result`.
pub struct Fallible<Sig>(PhantomData<Sig>);

/// Type and role of one function parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo {
    ty: ArgType,
    is_callback: bool,
    zero: fn() -> ArgValue,
}

fn zero_value<P: Arg>() -> ArgValue {
    ArgValue::new(P::default())
}

impl ParamInfo {
    pub fn of<P: Arg>() -> Self {
        ParamInfo {
            ty: ArgType::of::<P>(),
            is_callback: P::IS_CALLBACK,
            zero: zero_value::<P>,
        }
    }

    pub fn arg_type(&self) -> ArgType {
        self.ty
    }

    pub fn is_callback(&self) -> bool {
        self.is_callback
    }

    /// The parameter type's default value.
    pub fn zero_value(&self) -> ArgValue {
        (self.zero)()
    }
}

/// Results and error of one call.
#[derive(Debug, Default)]
pub struct CallResult {
    pub results: Vec<ResultValue>,
    pub call_error: Option<CallError>,
}

impl CallResult {
    fn from_value<T: Serialize + Send + 'static>(value: T) -> Self {
        let results = if TypeId::of::<T>() == TypeId::of::<()>() {
            Vec::new()
        } else {
            vec![ResultValue::new(value)]
        };
        CallResult {
            results,
            call_error: None,
        }
    }

    fn failed(err: CallError) -> Self {
        CallResult {
            results: Vec::new(),
            call_error: Some(err),
        }
    }
}

/// A function callable with a list of [`ArgValue`]s.
pub trait Function<Marker>: Send + Sync + 'static {
    /// Parameter types in declaration order.
    fn params() -> Vec<ParamInfo>;

    /// Name of the return type, e.g. `Result<Status, io::Error>`.
    fn return_type_name() -> String;

    fn has_error_result() -> bool;

    /// Calls the function with exactly one value per parameter.
    fn call(&self, args: Vec<ArgValue>) -> Result<CallResult, Error>;

    /// Rust-like rendering of the signature, e.g. `fn(i32, String) -> bool`.
    fn signature() -> String {
        let params: Vec<String> = Self::params().iter().map(|p| p.ty.name()).collect();
        let ret = Self::return_type_name();
        if ret == "()" {
            format!("fn({})", params.join(", "))
        } else {
            format!("fn({}) -> {}", params.join(", "), ret)
        }
    }
}

type Values = std::iter::Enumerate<std::vec::IntoIter<ArgValue>>;

fn next_param<P: Arg>(values: &mut Values) -> Result<P, Error> {
    let expected = ArgType::of::<P>();
    let (index, value) = values.next().ok_or_else(|| {
        Error::convert(
            "<missing>",
            ConvertError::TypeMismatch {
                expected: expected.name(),
                actual: "no value".into(),
            },
        )
    })?;
    value.take::<P>().map_err(|actual| {
        Error::convert(
            format!("parameter {index}"),
            ConvertError::TypeMismatch {
                expected: expected.name(),
                actual: actual.name(),
            },
        )
    })
}

macro_rules! impl_function {
    ($($P:ident),*) => {
        impl<Func, R, $($P,)*> Function<Plain<fn($($P,)*) -> R>> for Func
        where
            Func: Fn($($P),*) -> R + Send + Sync + 'static,
            R: Serialize + Send + 'static,
            $($P: Arg,)*
        {
            fn params() -> Vec<ParamInfo> {
                vec![$(ParamInfo::of::<$P>(),)*]
            }

            fn return_type_name() -> String {
                short_type_name(std::any::type_name::<R>())
            }

            fn has_error_result() -> bool {
                false
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<ArgValue>) -> Result<CallResult, Error> {
                let mut values = args.into_iter().enumerate();
                $(let $P = next_param::<$P>(&mut values)?;)*
                Ok(CallResult::from_value((self)($($P),*)))
            }
        }

        impl<Func, T, E, $($P,)*> Function<Fallible<fn($($P,)*) -> Result<T, E>>> for Func
        where
            Func: Fn($($P),*) -> Result<T, E> + Send + Sync + 'static,
            T: Serialize + Send + 'static,
            E: Into<anyhow::Error> + 'static,
            $($P: Arg,)*
        {
            fn params() -> Vec<ParamInfo> {
                vec![$(ParamInfo::of::<$P>(),)*]
            }

            fn return_type_name() -> String {
                short_type_name(std::any::type_name::<Result<T, E>>())
            }

            fn has_error_result() -> bool {
                true
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<ArgValue>) -> Result<CallResult, Error> {
                let mut values = args.into_iter().enumerate();
                $(let $P = next_param::<$P>(&mut values)?;)*
                Ok(match (self)($($P),*) {
                    Ok(value) => CallResult::from_value(value),
                    Err(err) => CallResult::failed(CallError::new(err)),
                })
            }
        }
    };
}

impl_function!();
impl_function!(P1);
impl_function!(P1, P2);
impl_function!(P1, P2, P3);
impl_function!(P1, P2, P3, P4);
impl_function!(P1, P2, P3, P4, P5);
impl_function!(P1, P2, P3, P4, P5, P6);
impl_function!(P1, P2, P3, P4, P5, P6, P7);
impl_function!(P1, P2, P3, P4, P5, P6, P7, P8);
