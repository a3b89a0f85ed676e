//! Binding a function to an arguments descriptor.
//!
//! [`FuncDispatcher::new`] checks, once, that the function's parameters
//! line up with the descriptor's arguments:
//!
//! - a leading [`Context`] parameter is skipped and receives the invocation
//!   context at call time;
//! - [`Callback`](crate::Callback) parameters are skipped and receive an
//!   empty callback;
//! - the remaining parameters must match the arguments one to one, by
//!   position and type.
//!
//! Afterwards the dispatcher is immutable and can be shared across threads.

use std::fmt;
use std::sync::Arc;

use crate::arg::{ArgType, ArgValue};
use crate::args::ArgsDef;
use crate::context::Context;
use crate::error::{BuildError, Error};
use crate::function::{CallResult, Function, ParamInfo};
use crate::handler::SharedHandler;
use crate::result::ResultValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamRole {
    Context,
    Callback,
    Arg,
}

type CallFn = dyn Fn(Vec<ArgValue>) -> Result<CallResult, Error> + Send + Sync;

/// A function validated against an [`ArgsDef`], ready to be called with
/// argument values.
#[derive(Clone)]
pub struct FuncDispatcher {
    def: Arc<ArgsDef>,
    signature: String,
    params: Vec<(ParamInfo, ParamRole)>,
    has_error_result: bool,
    func: Arc<CallFn>,
}

impl FuncDispatcher {
    pub fn new<F, M>(def: Arc<ArgsDef>, func: F) -> Result<Self, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        let signature = F::signature();
        let context_type = ArgType::of::<Context>();

        let params: Vec<(ParamInfo, ParamRole)> = F::params()
            .into_iter()
            .enumerate()
            .map(|(index, param)| {
                let role = if index == 0 && param.arg_type() == context_type {
                    ParamRole::Context
                } else if param.is_callback() {
                    ParamRole::Callback
                } else {
                    ParamRole::Arg
                };
                (param, role)
            })
            .collect();

        let matchable: Vec<(usize, &ParamInfo)> = params
            .iter()
            .enumerate()
            .filter(|(_, (_, role))| *role == ParamRole::Arg)
            .map(|(index, (param, _))| (index, param))
            .collect();

        if matchable.len() != def.num_args() {
            return Err(BuildError::ArgCountMismatch {
                outer: def.outer_type().name(),
                num_fields: def.num_args(),
                signature,
                num_params: matchable.len(),
            });
        }

        for (field, (index, param)) in def.args().iter().zip(&matchable) {
            if field.arg_type() != param.arg_type() {
                return Err(BuildError::ArgTypeMismatch {
                    outer: def.outer_type().name(),
                    field: field.name().to_string(),
                    field_type: field.arg_type().name(),
                    index: *index,
                    signature,
                    param_type: param.arg_type().name(),
                });
            }
        }

        Ok(FuncDispatcher {
            def,
            signature,
            params,
            has_error_result: F::has_error_result(),
            func: Arc::new(move |args| <F as Function<M>>::call(&func, args)),
        })
    }

    /// Like [`FuncDispatcher::new`], panicking on a mismatch.
    pub fn must_new<F, M>(def: Arc<ArgsDef>, func: F) -> Self
    where
        F: Function<M>,
        M: 'static,
    {
        match Self::new(def, func) {
            Ok(disp) => disp,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn args_def(&self) -> &Arc<ArgsDef> {
        &self.def
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Number of argument values [`FuncDispatcher::call`] expects.
    pub fn num_args(&self) -> usize {
        self.def.num_args()
    }

    pub fn has_context_arg(&self) -> bool {
        self.params
            .first()
            .is_some_and(|(_, role)| *role == ParamRole::Context)
    }

    /// Positions of callback parameters in the function's parameter list.
    pub fn callback_positions(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, (_, role))| *role == ParamRole::Callback)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_error_result(&self) -> bool {
        self.has_error_result
    }

    /// Calls the function with one value per argument.
    ///
    /// The context and empty callbacks are spliced in at their positions.
    /// A call error returned by the function is part of the `Ok` value;
    /// `Err` means the call could not be made.
    pub fn call(&self, ctx: &Context, values: Vec<ArgValue>) -> Result<CallResult, Error> {
        if values.len() != self.num_args() {
            return Err(Error::ValueCount {
                signature: self.signature.clone(),
                expected: self.num_args(),
                actual: values.len(),
            });
        }

        let mut values = values.into_iter();
        let mut call_args = Vec::with_capacity(self.params.len());
        for (param, role) in &self.params {
            match role {
                ParamRole::Context => call_args.push(ArgValue::new(ctx.clone())),
                ParamRole::Callback => call_args.push(param.zero_value()),
                ParamRole::Arg => {
                    if let Some(value) = values.next() {
                        call_args.push(value);
                    }
                }
            }
        }

        tracing::trace!(
            signature = %self.signature,
            num_args = call_args.len(),
            "calling function"
        );
        (self.func)(call_args)
    }

    /// Calls the function and passes arguments, results and call error to
    /// each handler in order.
    ///
    /// The first handler error that is not the call error itself stops the
    /// chain and is returned. Otherwise the call error, if any, is returned
    /// after all handlers ran.
    pub fn call_with_results_handlers(
        &self,
        ctx: &Context,
        values: Vec<ArgValue>,
        handlers: &[SharedHandler],
    ) -> Result<(), Error> {
        let CallResult {
            results,
            call_error,
        } = self.call(ctx, values.clone())?;

        for handler in handlers {
            if let Err(err) =
                handler.handle_results(&self.def, &values, &results, call_error.as_ref())
            {
                if !err.is_call_error(call_error.as_ref()) {
                    return Err(err);
                }
            }
        }

        match call_error {
            Some(err) => Err(Error::Call(err)),
            None => Ok(()),
        }
    }

    /// Calls the function and returns its results, or its error.
    pub fn call_and_return_results(
        &self,
        ctx: &Context,
        values: Vec<ArgValue>,
    ) -> Result<Vec<ResultValue>, Error> {
        let CallResult {
            results,
            call_error,
        } = self.call(ctx, values)?;
        match call_error {
            Some(err) => Err(Error::Call(err)),
            None => Ok(results),
        }
    }
}

impl fmt::Debug for FuncDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncDispatcher")
            .field("signature", &self.signature)
            .field("args", &self.def.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::{ArgSlot, Callback};
    use crate::args::{ArgField, Args};
    use crate::error::CallError;
    use crate::handler::handler_fn;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TwoArgs {
        count: i32,
        label: String,
    }

    impl Args for TwoArgs {
        fn arg_fields() -> Vec<ArgField> {
            vec![
                ArgField::new::<i32>("count", "", 0),
                ArgField::new::<String>("label", "", 1),
            ]
        }

        fn arg_slot(&mut self, path: &[usize]) -> Option<&mut dyn ArgSlot> {
            match path {
                [0] => Some(&mut self.count as &mut dyn ArgSlot),
                [1] => Some(&mut self.label as &mut dyn ArgSlot),
                _ => None,
            }
        }
    }

    fn def() -> Arc<ArgsDef> {
        ArgsDef::of::<TwoArgs>().unwrap()
    }

    fn values(count: i32, label: &str) -> Vec<ArgValue> {
        vec![ArgValue::new(count), ArgValue::new(label.to_string())]
    }

    // =========================================================================
    // Build-time validation
    // =========================================================================

    #[test]
    fn test_matching_function() {
        let disp = FuncDispatcher::new(def(), |_: i32, _: String| ()).unwrap();
        assert_eq!(disp.num_args(), 2);
        assert!(!disp.has_context_arg());
        assert!(!disp.has_error_result());
        assert_eq!(disp.signature(), "fn(i32, String)");
    }

    #[test]
    fn test_count_mismatch() {
        let err = FuncDispatcher::new(def(), |_: i32| ()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::ArgCountMismatch {
                num_fields: 2,
                num_params: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_type_mismatch_names_field_and_position() {
        let err = FuncDispatcher::new(def(), |_: i32, _: bool| ()).unwrap_err();
        match err {
            BuildError::ArgTypeMismatch {
                field,
                field_type,
                index,
                param_type,
                ..
            } => {
                assert_eq!(field, "label");
                assert_eq!(field_type, "String");
                assert_eq!(index, 1);
                assert_eq!(param_type, "bool");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_context_and_callbacks_are_skipped() {
        type Progress = Callback<dyn Fn(u8) + Send + Sync>;
        let disp = FuncDispatcher::new(
            def(),
            |_: Context, _: i32, _: Progress, _: String| -> Result<(), std::io::Error> { Ok(()) },
        )
        .unwrap();
        assert!(disp.has_context_arg());
        assert!(disp.has_error_result());
        assert_eq!(disp.callback_positions(), vec![2]);
    }

    #[test]
    fn test_context_only_first() {
        let err = FuncDispatcher::new(def(), |_: i32, _: Context, _: String| ()).unwrap_err();
        assert!(matches!(err, BuildError::ArgCountMismatch { .. }));
    }

    // =========================================================================
    // Calls
    // =========================================================================

    #[test]
    fn test_call_receives_values_and_context() {
        struct Tag(&'static str);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let disp = FuncDispatcher::new(def(), move |ctx: Context, n: i32, s: String| {
            let tag = ctx.value::<Tag>().map(|t| t.0);
            *sink.lock().unwrap() = Some((tag, n, s));
        })
        .unwrap();

        let ctx = Context::new().with_value(Tag("req-1"));
        disp.call(&ctx, values(3, "x")).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Some("req-1"), 3, "x".to_string()))
        );
    }

    #[test]
    fn test_call_passes_empty_callback() {
        type Notify = Callback<dyn Fn() + Send + Sync>;
        let disp =
            FuncDispatcher::new(def(), |_: i32, cb: Notify, _: String| cb.is_set()).unwrap();
        let results = disp
            .call_and_return_results(&Context::new(), values(1, "a"))
            .unwrap();
        assert_eq!(results[0].downcast_ref::<bool>(), Some(&false));
    }

    #[test]
    fn test_call_wrong_value_count() {
        let disp = FuncDispatcher::new(def(), |_: i32, _: String| ()).unwrap();
        let err = disp
            .call(&Context::new(), vec![ArgValue::new(1)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ValueCount {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_call_and_return_results_error() {
        let disp = FuncDispatcher::new(def(), |n: i32, _: String| -> Result<i32, anyhow::Error> {
            anyhow::ensure!(n > 0, "n must be positive");
            Ok(n)
        })
        .unwrap();
        let ok = disp
            .call_and_return_results(&Context::new(), values(2, ""))
            .unwrap();
        assert_eq!(ok[0].downcast_ref::<i32>(), Some(&2));

        let err = disp
            .call_and_return_results(&Context::new(), values(0, ""))
            .unwrap_err();
        assert_eq!(err.to_string(), "n must be positive");
    }

    // =========================================================================
    // Handler chain
    // =========================================================================

    #[test]
    fn test_handlers_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&log);
        let second = Arc::clone(&log);
        let handlers = vec![
            handler_fn(move |_, _, results, _| {
                first.lock().unwrap().push(format!("first {}", results.len()));
                Ok(())
            }),
            handler_fn(move |_, args, _, _| {
                second.lock().unwrap().push(format!("second {}", args.len()));
                Ok(())
            }),
        ];
        let disp = FuncDispatcher::new(def(), |n: i32, _: String| n).unwrap();
        disp.call_with_results_handlers(&Context::new(), values(1, ""), &handlers)
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first 1", "second 2"]);
    }

    #[test]
    fn test_handler_error_stops_chain() {
        let reached = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&reached);
        let handlers = vec![
            handler_fn(|_, _, _, _| Err(Error::handler(anyhow::anyhow!("sink closed")))),
            handler_fn(move |_, _, _, _| {
                *flag.lock().unwrap() = true;
                Ok(())
            }),
        ];
        let disp = FuncDispatcher::new(def(), |_: i32, _: String| ()).unwrap();
        let err = disp
            .call_with_results_handlers(&Context::new(), values(1, ""), &handlers)
            .unwrap_err();
        assert!(matches!(err, Error::Handler(_)));
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_call_error_passed_through_by_handler_is_reported_once() {
        let handlers = vec![handler_fn(|_, _, _, call_error: Option<&CallError>| {
            match call_error {
                Some(err) => Err(Error::Call(err.clone())),
                None => Ok(()),
            }
        })];
        let disp = FuncDispatcher::new(def(), |_: i32, _: String| -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("not found"))
        })
        .unwrap();
        let err = disp
            .call_with_results_handlers(&Context::new(), values(1, ""), &handlers)
            .unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert!(err.as_call_error().is_some());
    }

    #[test]
    fn test_call_error_results_not_passed_to_handlers() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let handlers = vec![handler_fn(move |_, _, results, call_error| {
            *sink.lock().unwrap() = Some((results.len(), call_error.is_some()));
            Ok(())
        })];
        let disp = FuncDispatcher::new(def(), |n: i32, _: String| -> Result<i32, anyhow::Error> {
            Err(anyhow::anyhow!("failed with {n}"))
        })
        .unwrap();
        let err = disp
            .call_with_results_handlers(&Context::new(), values(4, ""), &handlers)
            .unwrap_err();
        assert_eq!(err.to_string(), "failed with 4");
        assert_eq!(*seen.lock().unwrap(), Some((0, true)));
    }
}
