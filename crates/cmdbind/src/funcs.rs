//! Callable front ends, one per input format.
//!
//! | Input | Through handlers | Returning results |
//! |-------|------------------|-------------------|
//! | positional strings | [`StringArgsFunc`] | [`StringArgsResultValuesFunc`] |
//! | strings by name | [`StringMapArgsFunc`] | [`StringMapArgsResultValuesFunc`] |
//! | typed values by name | [`MapArgsFunc`] | [`MapArgsResultValuesFunc`] |
//! | JSON document | [`JsonArgsFunc`] | [`JsonArgsResultValuesFunc`] |
//!
//! The handler variants pass results to their result handlers and return
//! only the error. The results variants return the results to the caller,
//! for transports that pick their own output format.
//!
//! All of them are built from an [`ArgsDef`]:
//!
//! ```rust,ignore
//! let def = ArgsDef::of::<GreetArgs>()?;
//! let greet = def.string_args_func(greet, vec![println()])?;
//! greet.call(&Context::new(), &["World"])?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::args::ArgsDef;
use crate::context::Context;
use crate::dispatcher::FuncDispatcher;
use crate::error::{BuildError, Error};
use crate::function::Function;
use crate::handler::SharedHandler;
use crate::result::ResultValue;

macro_rules! handler_func {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            dispatcher: Arc<FuncDispatcher>,
            handlers: Arc<[SharedHandler]>,
        }

        impl $name {
            pub fn new(dispatcher: FuncDispatcher, handlers: Vec<SharedHandler>) -> Self {
                $name {
                    dispatcher: Arc::new(dispatcher),
                    handlers: handlers.into(),
                }
            }

            pub fn dispatcher(&self) -> &FuncDispatcher {
                &self.dispatcher
            }

            pub fn args_def(&self) -> &Arc<ArgsDef> {
                self.dispatcher.args_def()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("dispatcher", &self.dispatcher)
                    .field("handlers", &self.handlers.len())
                    .finish()
            }
        }
    };
}

macro_rules! results_func {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            dispatcher: Arc<FuncDispatcher>,
        }

        impl $name {
            pub fn new(dispatcher: FuncDispatcher) -> Self {
                $name {
                    dispatcher: Arc::new(dispatcher),
                }
            }

            pub fn dispatcher(&self) -> &FuncDispatcher {
                &self.dispatcher
            }

            pub fn args_def(&self) -> &Arc<ArgsDef> {
                self.dispatcher.args_def()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("dispatcher", &self.dispatcher)
                    .finish()
            }
        }
    };
}

handler_func!(
    /// Called with positional string arguments.
    StringArgsFunc
);
handler_func!(
    /// Called with string arguments keyed by argument name.
    StringMapArgsFunc
);
handler_func!(
    /// Called with typed values keyed by argument name.
    MapArgsFunc
);
handler_func!(
    /// Called with a JSON array or object.
    JsonArgsFunc
);
results_func!(StringArgsResultValuesFunc);
results_func!(StringMapArgsResultValuesFunc);
results_func!(MapArgsResultValuesFunc);
results_func!(JsonArgsResultValuesFunc);

fn must<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

impl StringArgsFunc {
    pub fn call<S: AsRef<str>>(&self, ctx: &Context, args: &[S]) -> Result<(), Error> {
        let values = self.args_def().values_from_strings(args)?;
        self.dispatcher
            .call_with_results_handlers(ctx, values, &self.handlers)
    }

    pub fn must_call<S: AsRef<str>>(&self, ctx: &Context, args: &[S]) {
        must(self.call(ctx, args))
    }
}

impl StringMapArgsFunc {
    pub fn call(&self, ctx: &Context, args: &HashMap<String, String>) -> Result<(), Error> {
        let values = self.args_def().values_from_string_map(args)?;
        self.dispatcher
            .call_with_results_handlers(ctx, values, &self.handlers)
    }

    pub fn must_call(&self, ctx: &Context, args: &HashMap<String, String>) {
        must(self.call(ctx, args))
    }
}

impl MapArgsFunc {
    pub fn call(
        &self,
        ctx: &Context,
        args: HashMap<String, Box<dyn Any + Send>>,
    ) -> Result<(), Error> {
        let values = self.args_def().values_from_value_map(args)?;
        self.dispatcher
            .call_with_results_handlers(ctx, values, &self.handlers)
    }

    pub fn must_call(&self, ctx: &Context, args: HashMap<String, Box<dyn Any + Send>>) {
        must(self.call(ctx, args))
    }
}

impl JsonArgsFunc {
    pub fn call(&self, ctx: &Context, json: &[u8]) -> Result<(), Error> {
        let values = self.args_def().values_from_json(json)?;
        self.dispatcher
            .call_with_results_handlers(ctx, values, &self.handlers)
    }

    pub fn must_call(&self, ctx: &Context, json: &[u8]) {
        must(self.call(ctx, json))
    }
}

impl StringArgsResultValuesFunc {
    pub fn call<S: AsRef<str>>(
        &self,
        ctx: &Context,
        args: &[S],
    ) -> Result<Vec<ResultValue>, Error> {
        let values = self.args_def().values_from_strings(args)?;
        self.dispatcher.call_and_return_results(ctx, values)
    }
}

impl StringMapArgsResultValuesFunc {
    pub fn call(
        &self,
        ctx: &Context,
        args: &HashMap<String, String>,
    ) -> Result<Vec<ResultValue>, Error> {
        let values = self.args_def().values_from_string_map(args)?;
        self.dispatcher.call_and_return_results(ctx, values)
    }
}

impl MapArgsResultValuesFunc {
    pub fn call(
        &self,
        ctx: &Context,
        args: HashMap<String, Box<dyn Any + Send>>,
    ) -> Result<Vec<ResultValue>, Error> {
        let values = self.args_def().values_from_value_map(args)?;
        self.dispatcher.call_and_return_results(ctx, values)
    }
}

impl JsonArgsResultValuesFunc {
    pub fn call(&self, ctx: &Context, json: &[u8]) -> Result<Vec<ResultValue>, Error> {
        let values = self.args_def().values_from_json(json)?;
        self.dispatcher.call_and_return_results(ctx, values)
    }
}

macro_rules! must_func {
    ($must:ident => $build:ident -> $ty:ty $(, $handlers:ident)?) => {
        #[doc = concat!("Like [`ArgsDef::", stringify!($build), "`], panicking on a mismatch.")]
        pub fn $must<F, M>(self: &Arc<Self>, func: F $(, $handlers: Vec<SharedHandler>)?) -> $ty
        where
            F: Function<M>,
            M: 'static,
        {
            match self.$build(func $(, $handlers)?) {
                Ok(f) => f,
                Err(err) => panic!("{err}"),
            }
        }
    };
}

impl ArgsDef {
    fn dispatcher<F, M>(self: &Arc<Self>, func: F) -> Result<FuncDispatcher, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        FuncDispatcher::new(Arc::clone(self), func)
    }

    pub fn string_args_func<F, M>(
        self: &Arc<Self>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) -> Result<StringArgsFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(StringArgsFunc::new(self.dispatcher(func)?, handlers))
    }

    pub fn string_map_args_func<F, M>(
        self: &Arc<Self>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) -> Result<StringMapArgsFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(StringMapArgsFunc::new(self.dispatcher(func)?, handlers))
    }

    pub fn map_args_func<F, M>(
        self: &Arc<Self>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) -> Result<MapArgsFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(MapArgsFunc::new(self.dispatcher(func)?, handlers))
    }

    pub fn json_args_func<F, M>(
        self: &Arc<Self>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) -> Result<JsonArgsFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(JsonArgsFunc::new(self.dispatcher(func)?, handlers))
    }

    pub fn string_args_result_values_func<F, M>(
        self: &Arc<Self>,
        func: F,
    ) -> Result<StringArgsResultValuesFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(StringArgsResultValuesFunc::new(self.dispatcher(func)?))
    }

    pub fn string_map_args_result_values_func<F, M>(
        self: &Arc<Self>,
        func: F,
    ) -> Result<StringMapArgsResultValuesFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(StringMapArgsResultValuesFunc::new(self.dispatcher(func)?))
    }

    pub fn map_args_result_values_func<F, M>(
        self: &Arc<Self>,
        func: F,
    ) -> Result<MapArgsResultValuesFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(MapArgsResultValuesFunc::new(self.dispatcher(func)?))
    }

    pub fn json_args_result_values_func<F, M>(
        self: &Arc<Self>,
        func: F,
    ) -> Result<JsonArgsResultValuesFunc, BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        Ok(JsonArgsResultValuesFunc::new(self.dispatcher(func)?))
    }

    must_func!(must_string_args_func => string_args_func -> StringArgsFunc, handlers);
    must_func!(must_string_map_args_func => string_map_args_func -> StringMapArgsFunc, handlers);
    must_func!(must_map_args_func => map_args_func -> MapArgsFunc, handlers);
    must_func!(must_json_args_func => json_args_func -> JsonArgsFunc, handlers);
    must_func!(
        must_string_args_result_values_func => string_args_result_values_func
            -> StringArgsResultValuesFunc
    );
    must_func!(
        must_string_map_args_result_values_func => string_map_args_result_values_func
            -> StringMapArgsResultValuesFunc
    );
    must_func!(
        must_map_args_result_values_func => map_args_result_values_func
            -> MapArgsResultValuesFunc
    );
    must_func!(
        must_json_args_result_values_func => json_args_result_values_func
            -> JsonArgsResultValuesFunc
    );
}
