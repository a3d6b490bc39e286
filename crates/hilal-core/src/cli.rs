use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};
use crate::config::Config;

const DEFAULT_COMMAND: &str = "show";

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hilal",
    version,
    about = "Hilal: Gregorian month calendar with Hijri dates and holidays",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "hilalrc")]
    pub hilalrc: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.KEY=VALUE` and `rc.KEY:VALUE` words out of the argument list
/// before clap sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));

            if let Some((k, v)) = parsed {
                if k.is_empty() {
                    return Err(anyhow!("empty key in override: {s}"));
                }
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    /// The first word names the command when it is a command or a unique
    /// prefix of one. Otherwise every word is an argument to the default
    /// command, so `hilal 2026-03` shows March.
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let configured = cfg
            .get("default.command")
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        let known = known_command_names();
        let default_command = expand_command_abbrev(configured.trim(), &known)
            .ok_or_else(|| anyhow!("invalid 'default.command' setting: {configured}"))?
            .to_string();

        let Some(first) = tokens.first() else {
            debug!(command = %default_command, "no explicit command, using default");
            return Ok(Self {
                command: default_command,
                command_args: vec![],
            });
        };

        if let Some(full) = expand_command_abbrev(first, &known) {
            debug!(token = %first, expanded = %full, "resolved command token");
            return Ok(Self {
                command: full.to_string(),
                command_args: tokens[1..].to_vec(),
            });
        }

        debug!(command = %default_command, "arguments passed to default command");
        Ok(Self {
            command: default_command,
            command_args: tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn pulls_positional_overrides() {
        let pre = preprocess_args(&os(&["hilal", "rc.lang=en", "show", "rc.color:off", "2026-03"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, os(&["hilal", "show", "2026-03"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.lang".to_string(), "en".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
        assert!(preprocess_args(&os(&["hilal", "rc.=x"])).is_err());
    }

    #[test]
    fn global_flags_parse() {
        let cli = GlobalCli::parse_from(os(&[
            "hilal",
            "-vv",
            "--rc",
            "lang=en",
            "--hilalrc",
            "/tmp/rc",
            "next",
        ]));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "lang");
        assert_eq!(cli.hilalrc, Some(PathBuf::from("/tmp/rc")));
        assert_eq!(cli.rest, os(&["next"]));
    }

    #[test]
    fn resolves_command_words() {
        let cfg = Config::defaults();
        let inv = Invocation::parse(&cfg, vec![]).expect("empty");
        assert_eq!(inv.command, "show");

        let inv = Invocation::parse(&cfg, os(&["br", "2026-03"])).expect("prefix");
        assert_eq!(inv.command, "browse");
        assert_eq!(inv.command_args, vec!["2026-03".to_string()]);

        let inv = Invocation::parse(&cfg, os(&["2026-03"])).expect("month only");
        assert_eq!(inv.command, "show");
        assert_eq!(inv.command_args, vec!["2026-03".to_string()]);

        // "holiday" and "holidays" share a prefix
        let inv = Invocation::parse(&cfg, os(&["holi"])).expect("ambiguous");
        assert_eq!(inv.command, "show");
        let inv = Invocation::parse(&cfg, os(&["holiday", "today"])).expect("exact");
        assert_eq!(inv.command, "holiday");
    }

    #[test]
    fn default_command_is_configurable() {
        let mut cfg = Config::defaults();
        cfg.apply_overrides(vec![("default.command".to_string(), "legend".to_string())]);
        let inv = Invocation::parse(&cfg, vec![]).expect("default");
        assert_eq!(inv.command, "legend");

        cfg.apply_overrides(vec![("default.command".to_string(), "bogus".to_string())]);
        assert!(Invocation::parse(&cfg, vec![]).is_err());
    }
}
