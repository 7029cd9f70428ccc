use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ArgError {
    #[error("Invalid boolean flag: {:?}", .0)]
    InvalidBool(String),
    #[error("Flag -{} is missing an argument", .0)]
    MissingArg(String),
    #[error("Flag -{} expects a number, got {:?}", .0, .1)]
    InvalidNumber(String, String),
    #[error("Unknown flag -{}", .0)]
    UnknownFlag(String),
    #[error("Unexpected argument {:?}", .0)]
    UnexpectedArg(String),
}

/// `-flag` and `-flag=yes` switch on, `-flag=no` switches off.
fn parse_switch(value: Option<&str>) -> Result<bool, ArgError> {
    match value {
        None | Some("true" | "yes") => Ok(true),
        Some("false" | "no") => Ok(false),
        Some(s) => Err(ArgError::InvalidBool(s.into())),
    }
}

/// Milliseconds given inline (`-flag=N`) or as the following argument.
fn parse_millis(
    flag: &str, inline: Option<&str>, args: &mut impl Iterator<Item = String>,
) -> Result<Duration, ArgError> {
    let value = match inline {
        Some(v) => v.to_owned(),
        None => args.next().ok_or_else(|| ArgError::MissingArg(flag.into()))?,
    };
    value.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ArgError::InvalidNumber(flag.into(), value))
}

pub const USAGE: &str = "\
usage: {} [-early-break] [-tick-ms=N] [-cancel-after-ms=N]

  -early-break         root routine stops early and yields 32
  -tick-ms=N           milliseconds between ticks (default 16)
  -cancel-after-ms=N   cancel the routine after N milliseconds
";

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub early_break: bool,
    pub tick: Duration,
    pub cancel_after: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            early_break: false,
            tick: Duration::from_millis(16),
            cancel_after: None,
        }
    }
}

/// Parse the command line; `Ok(None)` means usage was printed and the
/// program should exit.
pub fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Option<Options>, ArgError> {
    let arg0 = args.next().unwrap_or_else(|| "sample".into());
    let mut opts = Options::default();

    while let Some(arg) = args.next() {
        let Some(flag) = arg.strip_prefix('-') else {
            return Err(ArgError::UnexpectedArg(arg));
        };
        let (flag, inline) = match flag.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (flag, None),
        };

        match flag {
            "h" | "help" => {
                print!("{}", USAGE.replacen("{}", &arg0, 1));
                return Ok(None);
            },
            "early-break" => opts.early_break = parse_switch(inline)?,
            "tick-ms" => opts.tick = parse_millis(flag, inline, &mut args)?,
            "cancel-after-ms" => opts.cancel_after = Some(parse_millis(flag, inline, &mut args)?),
            _ => return Err(ArgError::UnknownFlag(flag.into())),
        }
    }

    Ok(Some(opts))
}
