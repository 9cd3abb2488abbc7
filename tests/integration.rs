use fncli::{
    target, CallFault, Cli, Config, CustomFlag, CustomFlagRegistry, Error, ErrorHandling, Logger,
    TargetFunction,
};
use std::cell::RefCell;

thread_local! {
    static SEEN: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(value: String) {
    SEEN.with(|seen| seen.borrow_mut().push(value));
}

fn take_seen() -> Vec<String> {
    SEEN.with(|seen| seen.take())
}

fn config() -> Config {
    Config::new()
        .with_error_handling(ErrorHandling::Silent)
        .with_logger(Logger::silent())
}

/// Temperature in degrees Celsius, written like `21.5C`.
#[derive(Debug, Clone, Default, PartialEq)]
struct Celsius(f64);

impl CustomFlag for Celsius {
    type Err = anyhow::Error;

    fn unmarshal_flag(raw: &str) -> anyhow::Result<Self> {
        let degrees = raw
            .strip_suffix('C')
            .ok_or_else(|| anyhow::anyhow!("missing unit in {}", raw))?;
        Ok(Celsius(degrees.parse()?))
    }

    fn flag_zero() -> Self {
        Celsius(20.0)
    }
}

/// Add two numbers.
fn add(x: i64, y: i64) {
    record((x + y).to_string());
}

fn thermostat(room: String, target: Celsius, dry_run: bool) {
    record(format!("{} {} {}", room, target.0, dry_run));
}

fn checked(limit: u8) -> Result<(), Error> {
    if limit > 100 {
        return Err(Error::FlagLookup(format!("limit {} too high", limit)));
    }
    record(limit.to_string());
    Ok(())
}

fn wide(_v: u128) {}

fn bind_thermostat() -> TargetFunction {
    let mut registry = CustomFlagRegistry::new();
    registry.register::<Celsius>();
    target!(thermostat, config().with_custom_flags(registry)).unwrap()
}

#[test]
fn binds_top_level_function() {
    let mut add = target!(add, config()).unwrap();
    assert_eq!(add.name(), "add");
    assert_eq!(add.full_name(), "integration::add");
    assert_eq!(add.doc(), "Add two numbers.");
    assert!(add.descriptor().file().ends_with("tests/integration.rs"));

    add.call(&["-x", "40", "-y", "2"]).unwrap();
    assert_eq!(take_seen(), ["42"]);
}

#[test]
fn custom_flag_default_and_value() {
    let mut t = bind_thermostat();
    let names: Vec<&str> = t.flags().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["room", "target", "dry_run"]);

    t.call(&["-room", "kitchen"]).unwrap();
    t.call(&["-room", "hall", "-target", "18.5C", "-dry_run"]).unwrap();
    assert_eq!(take_seen(), ["kitchen 20 false", "hall 18.5 true"]);
}

#[test]
fn custom_flag_failure_names_argument() {
    let mut t = bind_thermostat();
    let err = t.call(&["-target", "18.5F"]).unwrap_err();
    match &err {
        Error::CallFailure {
            command,
            cause: CallFault::Retrieve { position, name, .. },
        } => {
            assert_eq!(command, "thermostat");
            assert_eq!(*position, 2);
            assert_eq!(name, "target");
        }
        other => panic!("unexpected {}", other),
    }
    assert!(err.to_string().contains("missing unit in 18.5F"));
    assert!(take_seen().is_empty());
}

#[test]
fn crate_error_is_returned() {
    let mut t = target!(checked, config()).unwrap();
    t.call(&["-limit", "7"]).unwrap();
    assert_eq!(take_seen(), ["7"]);
    let err = t.call(&["-limit", "200"]).unwrap_err();
    assert!(matches!(err, Error::Returned(_)));
    assert_eq!(err.to_string(), "flag lookup: limit 200 too high");
}

#[test]
fn unsupported_parameter_type() {
    let err = target!(wide, config()).unwrap_err();
    assert!(matches!(err, Error::BadTargetFunction { .. }));
}

#[test]
fn cli_over_bound_functions() {
    let mut cli = Cli::new("tool").with_logger(Logger::silent());
    cli.add(target!(add, config()).unwrap())
        .add(bind_thermostat());
    cli.on_error(|_| fncli::Reaction {
        print_usage: false,
        return_error: true,
    });

    cli.start(&["add", "-x", "1", "-y", "-3"]).unwrap();
    cli.start(&["thermostat", "-room", "attic", "-target=5C"]).unwrap();
    assert_eq!(take_seen(), ["-2", "attic 5 false"]);

    assert!(matches!(
        cli.start(&["sub"]),
        Err(Error::CommandNotFound(_))
    ));
}

#[test]
fn command_name_from_config() {
    let t = target!(add, config().with_command_name("plus")).unwrap();
    assert_eq!(t.name(), "plus");
}
