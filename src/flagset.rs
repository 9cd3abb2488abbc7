//! The flag-parsing engine of one binding, built on clap's builder API.
//!
//! Flags may be spelled with a single dash (`-name value`, `-name=value`) as well as
//! `--name value` / `--name=value`. Single-dash spellings of registered flags
//! are rewritten to the double-dash form before clap sees them. Parsing stops
//! at the first argument that is not a flag; it and everything after it are
//! kept as the remaining arguments.

use crate::config::ErrorHandling;
use crate::error::{Error, Result};
use crate::flag::{FlagSpec, FlagValue};
use clap::{Arg, ArgAction, ArgMatches, Command};

// Not spellable as a Rust identifier, so no parameter can collide with them.
const HELP_ID: &str = "-help";
const REST_ID: &str = "-rest";

#[derive(Debug)]
pub struct FlagSet {
    name: String,
    error_handling: ErrorHandling,
    usage: Option<String>,
    flags: Vec<FlagSpec>,
    matches: Option<ArgMatches>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>, error_handling: ErrorHandling) -> Self {
        Self {
            name: name.into(),
            error_handling,
            usage: None,
            flags: Vec::new(),
            matches: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    /// Text shown above the flag list in help output. Empty text is ignored.
    pub fn set_usage(&mut self, usage: impl Into<String>) {
        let usage = usage.into();
        self.usage = (!usage.trim().is_empty()).then_some(usage);
    }

    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub fn add(&mut self, spec: FlagSpec) -> Result<()> {
        if self.lookup(spec.name()).is_some() {
            return Err(Error::DuplicateFlag(spec.name().to_string()));
        }
        self.flags.push(spec);
        Ok(())
    }

    pub fn flags(&self) -> &[FlagSpec] {
        &self.flags
    }

    fn lookup(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.name() == name)
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.name.clone())
            .no_binary_name(true)
            .disable_help_flag(true)
            .args_override_self(true);
        if let Some(usage) = &self.usage {
            cmd = cmd.about(usage.clone());
        }
        for spec in &self.flags {
            cmd = cmd.arg(spec.arg());
        }
        // A parameter named `help` shadows the long help flag.
        let help = Arg::new(HELP_ID)
            .short('h')
            .action(ArgAction::Help)
            .help("Print help");
        let help = if self.lookup("help").is_some() {
            help
        } else {
            help.long("help")
        };
        let rest = Arg::new(REST_ID)
            .value_name("ARGS")
            .value_parser(clap::value_parser!(String))
            .action(ArgAction::Append)
            .num_args(1..)
            .trailing_var_arg(true)
            .hide(true);
        cmd.arg(help).arg(rest)
    }

    /// Rewrite `-name[=v]` to `--name[=v]` for registered flags. Values that
    /// follow a value-taking flag, everything after `--` and everything from
    /// the first non-flag argument on are left alone.
    pub fn normalize_args<S: AsRef<str>>(&self, args: &[S]) -> Vec<String> {
        let mut out = Vec::with_capacity(args.len());
        let mut iter = args.iter().map(AsRef::as_ref);
        while let Some(arg) = iter.next() {
            if arg == "--" {
                out.push(arg.to_string());
                out.extend(iter.map(str::to_string));
                break;
            }
            let Some(body) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
                out.push(arg.to_string());
                out.extend(iter.map(str::to_string));
                break;
            };
            let (name, inline) = match body.split_once('=') {
                Some((name, _)) => (name, true),
                None => (body, false),
            };
            match self.lookup(name) {
                Some(spec) => {
                    out.push(format!("--{}", body));
                    if spec.takes_value() && !inline {
                        if let Some(value) = iter.next() {
                            out.push(value.to_string());
                        }
                    }
                }
                None if name == "help" => out.push("--help".to_string()),
                None => out.push(arg.to_string()),
            }
        }
        out
    }

    /// Parse `args` into the registered flags, replacing any earlier result.
    ///
    /// On failure the configured [`ErrorHandling`] decides what happens:
    /// `Exit` ends the process through clap, `Continue` prints the error and
    /// the usage before returning it, `Silent` only returns it.
    pub fn parse<S: AsRef<str>>(&mut self, args: &[S]) -> std::result::Result<(), clap::Error> {
        self.matches = None;
        let args = self.normalize_args(args);
        let err = match self.command().try_get_matches_from(args) {
            Ok(matches) => {
                self.matches = Some(matches);
                return Ok(());
            }
            Err(err) => err,
        };
        match self.error_handling {
            ErrorHandling::Exit => err.exit(),
            ErrorHandling::Continue => {
                let _ = err.print();
                if err.kind() != clap::error::ErrorKind::DisplayHelp {
                    self.print_usage();
                }
                Err(err)
            }
            ErrorHandling::Silent => Err(err),
        }
    }

    /// Arguments left after the flags: the first non-flag argument and
    /// everything after it, or everything after `--`.
    pub fn rest(&self) -> Vec<String> {
        self.matches
            .as_ref()
            .and_then(|m| m.get_many::<String>(REST_ID))
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    }

    /// Decoded value of the `i`-th flag; its zero value before any parse.
    pub fn value(&self, i: usize) -> Result<FlagValue> {
        let spec = self
            .flags
            .get(i)
            .ok_or_else(|| Error::FlagLookup(format!("no flag at position {}", i + 1)))?;
        match &self.matches {
            Some(matches) => spec.decode(matches),
            None => Ok(spec.zero()),
        }
    }

    pub fn print_usage(&self) {
        eprintln!("{}", self.command().render_help());
    }
}
