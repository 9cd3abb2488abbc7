//! Binding a plain function to a set of flags, and calling it.

use crate::config::Config;
use crate::context::Context;
use crate::decl::DeclCutter;
use crate::error::{CallFault, Error, Result};
use crate::flag::{FlagFactory, FlagSpec, FlagValue};
use crate::flagset::FlagSet;
use crate::handler::{Handler, ParamType, ReturnShape};
use crate::locate::{function_name, locate, FunctionDescriptor, SourceHint};
use crate::logger::Logger;
use crate::signature::FuncInfo;
use std::any::{type_name, Any};
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

type Invoke = dyn Fn(Vec<FlagValue>) -> std::result::Result<Box<dyn Any>, CallFault> + Send + Sync;

/// A function bound to the flags its parameters map to.
///
/// Built with [`TargetFunction::new`] or the [`target!`](macro@crate::target)
/// macro. Parameters become flags named after them; a leading [`Context`]
/// parameter is passed through instead.
pub struct TargetFunction {
    name: String,
    descriptor: FunctionDescriptor,
    info: FuncInfo,
    takes_context: bool,
    flagset: FlagSet,
    shape: ReturnShape,
    output: ParamType,
    invoke: Box<Invoke>,
    logger: Logger,
}

impl fmt::Debug for TargetFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetFunction")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("flags", &self.flagset.flags())
            .field("takes_context", &self.takes_context)
            .finish()
    }
}

impl TargetFunction {
    /// Validate `f` and build its flags.
    ///
    /// Fails with [`Error::BadTargetFunction`] when `f` is not a named
    /// function, returns something other than `()` or a unit `Result`, cannot
    /// be found in source, is variadic, or takes a parameter type no flag
    /// exists for.
    pub fn new<F, Args>(f: F, hint: SourceHint, config: Config) -> Result<Self>
    where
        F: Handler<Args>,
        Args: 'static,
    {
        let logger = config.logger();
        let full_name = function_name::<F>()
            .map_err(|e| Error::bad_target_from(type_name::<F>(), "not function", e))?;

        let output = f.output();
        let shape = ReturnShape::of(output).ok_or_else(|| {
            Error::bad_target(&full_name, format!("unexpected return type {}", output))
        })?;

        let build_info = |e| Error::bad_target_from(&full_name, "build func info", e);
        let (descriptor, source) = locate(&f, &hint).map_err(build_info)?;
        let decl = DeclCutter::new(&source, descriptor.line())
            .cut()
            .map_err(build_info)?;
        let info = FuncInfo::parse(&decl).map_err(build_info)?;
        logger.trace(format_args!("{}: {}", descriptor, decl));

        let params = f.params();
        validate_declaration(&full_name, &info, &params)?;
        let takes_context = params.first().is_some_and(ParamType::is::<Context>);

        let name = config
            .command_name()
            .map(str::to_string)
            .unwrap_or_else(|| info.name().to_string());
        let mut flagset = FlagSet::new(name.clone(), config.error_handling());
        flagset.set_usage(info.doc());

        let factory = FlagFactory::new(config.custom_flags());
        let skip = usize::from(takes_context);
        for (i, (ty, param)) in params.iter().zip(info.params()).enumerate().skip(skip) {
            let constructor = factory.constructor(*ty).ok_or_else(|| {
                Error::bad_target(
                    &full_name,
                    format!(
                        "unsupported type {} of {} th arg {}",
                        param.ty(),
                        i + 1,
                        param.name()
                    ),
                )
            })?;
            flagset
                .add(constructor(param.name()))
                .map_err(|e| Error::bad_target_from(&full_name, "build flags", e))?;
        }

        logger.debug(format_args!(
            "bind {} as {} with flags [{}]",
            full_name,
            name,
            flag_names(flagset.flags())
        ));
        Ok(Self {
            name,
            descriptor,
            info,
            takes_context,
            flagset,
            shape,
            output,
            invoke: Box::new(move |args: Vec<FlagValue>| f.call(args)),
            logger,
        })
    }

    /// Name the binding is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    pub fn doc(&self) -> &str {
        self.info.doc()
    }

    pub fn flags(&self) -> &[FlagSpec] {
        self.flagset.flags()
    }

    pub fn takes_context(&self) -> bool {
        self.takes_context
    }

    pub fn print_usage(&self) {
        self.flagset.print_usage();
    }

    pub fn call<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        self.call_with_context(Context::background(), args)
    }

    /// Parse `args`, decode every flag and call the function.
    ///
    /// `ctx` is handed to the function when it takes a leading [`Context`]
    /// and dropped otherwise. An error the function returns comes back as
    /// [`Error::Returned`]; everything else that goes wrong, including a
    /// panic inside the function, is an [`Error::CallFailure`].
    pub fn call_with_context<S: AsRef<str>>(&mut self, ctx: Context, args: &[S]) -> Result<()> {
        self.logger.debug(format_args!(
            "call {} with {:?}",
            self.name,
            args.iter().map(AsRef::as_ref).collect::<Vec<&str>>()
        ));
        self.flagset
            .parse(args)
            .map_err(|e| Error::call_failure(&self.name, CallFault::Parse(e)))?;
        let rest = self.flagset.rest();
        if !rest.is_empty() {
            self.logger
                .debug(format_args!("{} ignores arguments {:?}", self.name, rest));
        }

        let mut values: Vec<FlagValue> = Vec::with_capacity(self.flags().len() + 1);
        if self.takes_context {
            values.push(Box::new(ctx));
        }
        for (i, spec) in self.flagset.flags().iter().enumerate() {
            let value = self.flagset.value(i).map_err(|source| {
                Error::call_failure(
                    &self.name,
                    CallFault::Retrieve {
                        position: i + 1,
                        name: spec.name().to_string(),
                        source: Box::new(source),
                    },
                )
            })?;
            values.push(value);
        }

        let invoke = &self.invoke;
        let returned = match quietly(|| panic::catch_unwind(AssertUnwindSafe(|| invoke(values)))) {
            Ok(returned) => returned.map_err(|cause| Error::call_failure(&self.name, cause))?,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.logger
                    .debug(format_args!("{} panicked: {}", self.name, message));
                return Err(Error::call_failure(&self.name, CallFault::Panic(message)));
            }
        };
        match self.shape.settle(returned, self.output) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.logger.debug(format_args!("{} returned {:#}", self.name, err));
                Err(Error::Returned(err))
            }
            Err(fault) => Err(Error::call_failure(&self.name, fault)),
        }
    }
}

/// Checks on the parsed declaration against the callable's own signature.
fn validate_declaration(full_name: &str, info: &FuncInfo, params: &[ParamType]) -> Result<()> {
    if info.is_variadic() {
        return Err(Error::bad_target(full_name, "variadic function"));
    }
    if !full_name.ends_with(&format!("::{}", info.name())) && full_name != info.name() {
        return Err(Error::bad_target(
            full_name,
            format!("declaration found is {}", info.name()),
        ));
    }
    if info.num_in() != params.len() {
        return Err(Error::bad_target(
            full_name,
            format!(
                "declaration has {} params, function takes {}",
                info.num_in(),
                params.len()
            ),
        ));
    }
    Ok(())
}

fn flag_names(flags: &[FlagSpec]) -> String {
    flags
        .iter()
        .map(FlagSpec::name)
        .collect::<Vec<_>>()
        .join(", ")
}

thread_local! {
    static IN_CALL: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Run `f` with the panic hook muted on this thread. Panics on other threads,
/// and on this one outside `f`, still reach the previous hook.
fn quietly<R>(f: impl FnOnce() -> R) -> R {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_CALL.with(Cell::get) {
                previous(info);
            }
        }));
    });
    let outer = IN_CALL.with(|flag| flag.replace(true));
    let out = f();
    IN_CALL.with(|flag| flag.set(outer));
    out
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
