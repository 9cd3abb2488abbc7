//! A set of bound functions dispatched by their name.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::target::TargetFunction;
use std::collections::BTreeMap;
use std::fmt;

/// What [`Cli::start`] does with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    pub print_usage: bool,
    pub return_error: bool,
}

impl Default for Reaction {
    fn default() -> Self {
        Self {
            print_usage: true,
            return_error: true,
        }
    }
}

type OnError = dyn Fn(&Error) -> Reaction + Send + Sync;
type Usage = dyn Fn() + Send + Sync;

/// Subcommands made of functions: the first argument picks the function,
/// the rest become its flags.
pub struct Cli {
    name: String,
    commands: BTreeMap<String, TargetFunction>,
    on_error: Box<OnError>,
    usage: Option<Box<Usage>>,
    logger: Logger,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("name", &self.name)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Cli {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: BTreeMap::new(),
            on_error: Box::new(|_| Reaction::default()),
            usage: None,
            logger: Logger::default(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `target` under its name, replacing a command of the same name.
    pub fn add(&mut self, target: TargetFunction) -> &mut Self {
        let name = target.name().to_string();
        self.logger.debug(format_args!(
            "add command {} ({}) to {}",
            name,
            target.full_name(),
            self.name
        ));
        if self.commands.insert(name.clone(), target).is_some() {
            self.logger.debug(format_args!("command {} replaced", name));
        }
        self
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&TargetFunction> {
        self.commands.get(name)
    }

    /// Decide per error whether to print usage and whether to return it.
    pub fn on_error<F>(&mut self, on_error: F) -> &mut Self
    where
        F: Fn(&Error) -> Reaction + Send + Sync + 'static,
    {
        self.on_error = Box::new(on_error);
        self
    }

    /// Replace the default usage line.
    pub fn set_usage<F>(&mut self, usage: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.usage = Some(Box::new(usage));
        self
    }

    pub fn start<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        self.start_with_context(Context::background(), args)
    }

    /// Run the command named by `args[0]` with the remaining arguments.
    /// Empty `args` means the process arguments without the program name.
    pub fn start_with_context<S: AsRef<str>>(&mut self, ctx: Context, args: &[S]) -> Result<()> {
        let args: Vec<String> = if args.is_empty() {
            std::env::args().skip(1).collect()
        } else {
            args.iter().map(|a| a.as_ref().to_string()).collect()
        };
        let Err(err) = self.dispatch(ctx, &args) else {
            return Ok(());
        };
        let reaction = (self.on_error)(&err);
        if reaction.print_usage {
            self.print_usage(&err);
        }
        if reaction.return_error {
            return Err(err);
        }
        Ok(())
    }

    fn dispatch(&mut self, ctx: Context, args: &[String]) -> Result<()> {
        let (name, rest) = args.split_first().ok_or(Error::NotEnoughArguments)?;
        let command = self
            .commands
            .get_mut(name)
            .ok_or_else(|| Error::CommandNotFound(name.clone()))?;
        self.logger
            .debug(format_args!("call {} with {:?}", command.name(), rest));
        command.call_with_context(ctx, rest)
    }

    fn print_usage(&self, err: &Error) {
        eprintln!("Error: {}", err);
        match &self.usage {
            Some(usage) => usage(),
            None => eprintln!("{}", self.default_usage()),
        }
    }

    /// `Usage: <name> {a,b,c}` over the sorted command names.
    pub fn default_usage(&self) -> String {
        format!(
            "Usage: {} {{{}}}",
            self.name,
            self.commands().collect::<Vec<_>>().join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ErrorHandling};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn greet(name: String) -> anyhow::Result<()> {
        if name.is_empty() {
            anyhow::bail!("no name");
        }
        Ok(())
    }

    fn noop() {}

    fn bind_as<F, Args>(f: F, command: &str) -> TargetFunction
    where
        F: crate::handler::Handler<Args>,
        Args: 'static,
    {
        let config = Config::new()
            .with_error_handling(ErrorHandling::Silent)
            .with_command_name(command)
            .with_logger(Logger::silent());
        TargetFunction::new(f, crate::source_hint!(), config).unwrap()
    }

    fn quiet_cli() -> Cli {
        let mut cli = Cli::new("tool").with_logger(Logger::silent());
        cli.on_error(|_| Reaction {
            print_usage: false,
            return_error: true,
        });
        cli
    }

    #[test]
    fn dispatches_by_name() {
        let mut cli = quiet_cli();
        cli.add(bind_as(greet, "greet")).add(bind_as(noop, "noop"));
        cli.start(&["greet", "-name", "x"]).unwrap();
        cli.start(&["noop"]).unwrap();
        let err = cli.start(&["greet"]).unwrap_err();
        assert_eq!(err.to_string(), "no name");
    }

    #[test]
    fn unknown_command() {
        let mut cli = quiet_cli();
        cli.add(bind_as(noop, "noop"));
        let err = cli.start(&["nope"]).unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(ref name) if name == "nope"));
        assert_eq!(err.to_string(), "command not found nope");
    }

    #[test]
    fn default_usage_is_sorted() {
        let mut cli = quiet_cli();
        cli.add(bind_as(noop, "zeta")).add(bind_as(greet, "alpha"));
        assert_eq!(cli.default_usage(), "Usage: tool {alpha,zeta}");
        assert_eq!(cli.commands().collect::<Vec<_>>(), ["alpha", "zeta"]);
    }

    #[test]
    fn add_replaces_same_name() {
        let mut cli = quiet_cli();
        cli.add(bind_as(noop, "run")).add(bind_as(greet, "run"));
        assert_eq!(cli.commands().count(), 1);
        assert_eq!(cli.get("run").map(|t| t.flags().len()), Some(1));
    }

    #[test]
    fn reaction_controls_return_and_usage() {
        let usage_calls = Arc::new(AtomicUsize::new(0));
        let seen = usage_calls.clone();
        let mut cli = Cli::new("tool").with_logger(Logger::silent());
        cli.add(bind_as(noop, "noop"));
        cli.set_usage(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        cli.on_error(|err| Reaction {
            print_usage: true,
            return_error: !matches!(err, Error::CommandNotFound(_)),
        });
        assert!(cli.start(&["missing"]).is_ok());
        assert_eq!(usage_calls.load(Ordering::SeqCst), 1);
        assert!(cli.start(&["noop", "-x"]).is_err());
        assert_eq!(usage_calls.load(Ordering::SeqCst), 2);
    }
}
