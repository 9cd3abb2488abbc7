//! Turn plain functions into command-line subcommands.
//!
//! A function's parameters become flags named after them. The names are
//! recovered from the function's own declaration: the binder finds the
//! source file, cuts the declaration out and parses it with `syn`. Each
//! parameter type picks a flag kind: `bool`, the integer and float widths,
//! `String`, or a registered [`CustomFlag`].
//!
//! ```no_run
//! use fncli::{target, Cli};
//!
//! /// Adds numbers.
//! fn add(x: i64, y: i64) {
//!     println!("{}", x + y);
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut cli = Cli::new("calc");
//!     cli.add(target!(add)?);
//!     cli.start::<&str>(&[])?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod custom;
pub mod decl;
pub mod error;
pub mod flag;
pub mod flagset;
pub mod handler;
pub mod locate;
pub mod logger;
pub mod signature;
pub mod target;

pub use cli::{Cli, Reaction};
pub use config::{Config, ErrorHandling};
pub use context::Context;
pub use custom::{CustomFlag, CustomFlagRegistry, CustomHandler};
pub use error::{BoxError, CallFault, Error, Result};
pub use flag::{FlagFactory, FlagKind, FlagSpec, FlagType, FlagValue, IntWidth};
pub use handler::{Handler, ParamType, ReturnShape};
pub use locate::{FunctionDescriptor, SourceHint};
pub use logger::{Level, Logger};
pub use signature::FuncInfo;
pub use target::TargetFunction;

/// Bind a function declared in the calling crate.
///
/// `target!(f)` uses the default [`Config`]; `target!(f, config)` uses the
/// given one.
#[macro_export]
macro_rules! target {
    ($f:expr) => {
        $crate::TargetFunction::new($f, $crate::source_hint!(), $crate::Config::new())
    };
    ($f:expr, $config:expr) => {
        $crate::TargetFunction::new($f, $crate::source_hint!(), $config)
    };
}
