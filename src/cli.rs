use std::time::Duration;

use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Parser};

use crate::address::{AddrError, TargetAddr};
use crate::config::Config;
use crate::transport::PROTOCOLS;

const ABOUT: &str = "Send records of random data in JSON format to an address at a fixed interval";

const LONG_ABOUT: &str = "\
Send simple records of random data in JSON format to an address at a fixed interval, for testing.

Each record is a JSON object with three key/value pairs: 'id', 'data' and 'timestamp', followed \
by any custom pairs given with --data. The id is the one based sequence number of the record. \
The data is a pseudo random ASCII string, 32 bytes long by default. The timestamp is the UTC time \
at which the record was sent. Records are newline terminated.

Defaults can also be set in ./swampit.toml (or the file named by SWAMPIT_CONFIG) and through \
SWAMPIT_* environment variables, e.g. SWAMPIT_COUNT=0.";

const EXAMPLES: &str = "\
EXAMPLES:
    # Send 10000 records to 172.16.98.47:3012
    swampit -c 10000 172.16.98.47:3012

    # Send 100 records with a data size of 1024 and watch them being sent
    swampit -v -c 100 -s 1024 172.16.98.47:3012

    # Send 20 records over udp, 2 seconds apart, and listen for them with nc
    swampit -c 20 -i 2 -p udp 127.0.0.1:8989 &
    nc -l -u 127.0.0.1 8989";

#[derive(Parser, Debug)]
#[command(
    name = "swampit",
    version,
    about = ABOUT,
    long_about = LONG_ABOUT,
    after_help = EXAMPLES
)]
pub struct Args {
    /// Send this many records and stop, 0 runs forever [default: 10]
    #[arg(short = 'c', long, value_name = "NUM")]
    pub count: Option<u64>,

    /// Add a custom key/value pair to every record, can be repeated
    #[arg(
        short = 'd',
        long = "data",
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        allow_hyphen_values = true,
        action = ArgAction::Append
    )]
    pub data: Vec<String>,

    /// Do not send anything
    #[arg(long)]
    pub dryrun: bool,

    /// Seconds between sends, fractions allowed [default: 1]
    #[arg(short = 'i', long, value_name = "SECS", allow_negative_numbers = true)]
    pub interval: Option<f64>,

    /// Network protocol [default: tcp]
    #[arg(
        short = 'p',
        long,
        value_name = "PROTOCOL",
        value_parser = PossibleValuesParser::new(PROTOCOLS),
        overrides_with = "unchecked_protocol"
    )]
    pub protocol: Option<String>,

    /// Network protocol, without checking it against the known protocols
    #[arg(
        short = 'P',
        long = "Protocol",
        value_name = "PROTOCOL",
        overrides_with = "protocol"
    )]
    pub unchecked_protocol: Option<String>,

    /// Size of the random data in each record [default: 32]
    #[arg(short = 's', long, value_name = "SIZE", allow_negative_numbers = true)]
    pub size: Option<i64>,

    /// Increase verbosity: -v logs each record, -vv also the bytes written
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Exit on socket write errors instead of warning and carrying on
    #[arg(short = 'x', long)]
    pub exit_on_write_error: bool,

    /// Target address, host:port or [ipv6]:port
    #[arg(value_name = "ADDRESS")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Everything the sender needs for a run, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Always present unless `dry_run` is set.
    pub target: Option<TargetAddr>,
    pub count: u64,
    pub interval: Duration,
    pub size: usize,
    pub verbosity: u8,
    pub protocol: String,
    pub pairs: Vec<KeyValue>,
    pub dry_run: bool,
    pub exit_on_write_error: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("values less than {min} not allowed for '{option}': {value}")]
    BelowMinimum {
        option: &'static str,
        min: &'static str,
        value: String,
    },
    #[error("invalid number for '{option}': '{value}'")]
    InvalidNumber { option: &'static str, value: String },
    #[error("invalid protocol specified '{0}', known protocols: {known}", known = PROTOCOLS.join(", "))]
    InvalidProtocol(String),
    #[error("missing target address, expected host:port or [ipv6]:port")]
    MissingAddress,
    #[error(transparent)]
    Address(#[from] AddrError),
}

impl Settings {
    /// Merges the command line over the configured defaults.
    pub fn new(args: Args, config: &Config) -> Result<Self, SettingsError> {
        let count = args.count.unwrap_or(config.count);

        let interval = args.interval.unwrap_or(config.interval);
        if interval < 0.0 {
            return Err(SettingsError::BelowMinimum {
                option: "--interval",
                min: "0",
                value: interval.to_string(),
            });
        }
        let interval =
            Duration::try_from_secs_f64(interval).map_err(|_| SettingsError::InvalidNumber {
                option: "--interval",
                value: interval.to_string(),
            })?;

        let size = match args.size {
            Some(size) if size < 1 => {
                return Err(SettingsError::BelowMinimum {
                    option: "--size",
                    min: "1",
                    value: size.to_string(),
                })
            }
            Some(size) => usize::try_from(size).map_err(|_| SettingsError::InvalidNumber {
                option: "--size",
                value: size.to_string(),
            })?,
            None if config.size < 1 => {
                return Err(SettingsError::BelowMinimum {
                    option: "size",
                    min: "1",
                    value: config.size.to_string(),
                })
            }
            None => config.size,
        };

        // `-p` was already checked by clap; `-P` is deliberately left alone.
        let protocol = match (args.protocol, args.unchecked_protocol) {
            (Some(protocol), _) | (None, Some(protocol)) => protocol,
            (None, None) if PROTOCOLS.contains(&config.protocol.as_str()) => {
                config.protocol.clone()
            }
            (None, None) => return Err(SettingsError::InvalidProtocol(config.protocol.clone())),
        };

        let mut pairs = Vec::with_capacity(args.data.len() / 2);
        let mut data = args.data.into_iter();
        while let (Some(key), Some(value)) = (data.next(), data.next()) {
            pairs.push(KeyValue { key, value });
        }

        let target = match (args.address, args.dryrun) {
            (Some(address), false) => Some(address.parse::<TargetAddr>()?),
            (None, false) => return Err(SettingsError::MissingAddress),
            // Nothing is dialed in a dry run, so the address is carried along unchecked
            // when it happens to parse and dropped otherwise.
            (address, true) => address.and_then(|address| address.parse().ok()),
        };

        Ok(Self {
            target,
            count,
            interval,
            size,
            verbosity: args.verbose,
            protocol,
            pairs,
            dry_run: args.dryrun,
            exit_on_write_error: args.exit_on_write_error || config.exit_on_write_error,
        })
    }
}

/// One-line description of a command line error, without clap's usage footer.
pub fn usage_error(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    let first = first.strip_prefix("error: ").unwrap_or(first);
    format!("{first} (see --help)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Settings, SettingsError> {
        let args = Args::try_parse_from(std::iter::once("swampit").chain(args.iter().copied()))
            .unwrap();
        Settings::new(args, &Config::default())
    }

    fn parse_err(args: &[&str]) -> clap::Error {
        Args::try_parse_from(std::iter::once("swampit").chain(args.iter().copied())).unwrap_err()
    }

    #[test]
    fn defaults() {
        let sut = parse(&["127.0.0.1:9999"]).unwrap();
        assert_eq!(sut.count, 10);
        assert_eq!(sut.interval, Duration::from_secs(1));
        assert_eq!(sut.size, 32);
        assert_eq!(sut.protocol, "tcp");
        assert_eq!(sut.verbosity, 0);
        assert!(sut.pairs.is_empty());
        assert!(!sut.dry_run);
        assert!(!sut.exit_on_write_error);
        assert_eq!(sut.target.unwrap().to_string(), "127.0.0.1:9999");
    }

    #[test]
    fn all_options() {
        let sut = parse(&[
            "-c", "0", "-i", "0.25", "-s", "1", "-p", "udp6", "-vv", "-x", "-d", "env", "test",
            "--data", "zone", "b", "[::1]:80",
        ])
        .unwrap();
        assert_eq!(sut.count, 0);
        assert_eq!(sut.interval, Duration::from_millis(250));
        assert_eq!(sut.size, 1);
        assert_eq!(sut.protocol, "udp6");
        assert_eq!(sut.verbosity, 2);
        assert!(sut.exit_on_write_error);
        assert_eq!(
            sut.pairs,
            vec![
                KeyValue {
                    key: "env".to_string(),
                    value: "test".to_string()
                },
                KeyValue {
                    key: "zone".to_string(),
                    value: "b".to_string()
                },
            ]
        );
    }

    #[test]
    fn long_options() {
        let sut = parse(&[
            "--count", "3", "--interval", "0", "--size", "64", "--protocol", "tcp4", "--verbose",
            "--exit-on-write-error", "--dryrun",
        ])
        .unwrap();
        assert_eq!(sut.count, 3);
        assert_eq!(sut.interval, Duration::ZERO);
        assert_eq!(sut.size, 64);
        assert_eq!(sut.protocol, "tcp4");
        assert_eq!(sut.verbosity, 1);
        assert!(sut.exit_on_write_error);
        assert!(sut.dry_run);
        assert!(sut.target.is_none());
    }

    #[test]
    fn numeric_validations() {
        assert!(matches!(
            parse(&["-s", "0", "--dryrun"]),
            Err(SettingsError::BelowMinimum { option: "--size", .. })
        ));
        assert!(matches!(
            parse(&["-i", "-0.5", "--dryrun"]),
            Err(SettingsError::BelowMinimum {
                option: "--interval",
                ..
            })
        ));
        assert!(matches!(
            parse(&["-i", "inf", "--dryrun"]),
            Err(SettingsError::InvalidNumber { .. })
        ));
        assert_eq!(parse_err(&["-c", "ten"]).kind(), ErrorKind::ValueValidation);
        assert_eq!(parse_err(&["-i", "soon"]).kind(), ErrorKind::ValueValidation);
        assert_eq!(parse_err(&["-c"]).kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn protocol_validations() {
        assert_eq!(parse_err(&["-p", "sctp"]).kind(), ErrorKind::InvalidValue);
        let sut = parse(&["-P", "sctp", "--dryrun"]).unwrap();
        assert_eq!(sut.protocol, "sctp");
        // The last protocol flag wins.
        let sut = parse(&["-P", "sctp", "-p", "udp", "--dryrun"]).unwrap();
        assert_eq!(sut.protocol, "udp");

        let config = Config {
            protocol: "carrier-pigeon".to_string(),
            ..Config::default()
        };
        let args = Args::try_parse_from(["swampit", "--dryrun"]).unwrap();
        assert!(matches!(
            Settings::new(args, &config),
            Err(SettingsError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn address_validations() {
        assert!(matches!(
            parse(&["1.2.3.4:70000"]),
            Err(SettingsError::Address(AddrError::InvalidPort(_)))
        ));
        assert!(matches!(
            parse(&["badhost!:80"]),
            Err(SettingsError::Address(AddrError::Malformed(_)))
        ));
        assert!(matches!(parse(&[]), Err(SettingsError::MissingAddress)));
        assert_eq!(
            parse_err(&["1.2.3.4:80", "1.2.3.5:80"]).kind(),
            ErrorKind::UnknownArgument
        );
        // Addresses are only checked when something will be dialed.
        assert!(parse(&["--dryrun", "badhost!:80"]).unwrap().target.is_none());
        assert!(parse(&["--dryrun", "localhost:80"]).unwrap().target.is_some());
    }

    #[test]
    fn data_needs_a_key_and_a_value() {
        assert_eq!(
            parse_err(&["--dryrun", "-d", "env"]).kind(),
            ErrorKind::WrongNumberOfValues
        );
    }

    #[test]
    fn data_takes_the_next_two_arguments_verbatim() {
        let sut = parse(&[
            "--dryrun", "-d", "delta", "-1", "-d", "flag", "-x", "-d", "-k", "v",
        ])
        .unwrap();
        let pairs: Vec<(&str, &str)> = sut
            .pairs
            .iter()
            .map(|kv| (kv.key.as_str(), kv.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("delta", "-1"), ("flag", "-x"), ("-k", "v")]);
        // `-x` was a value here, not the flag.
        assert!(!sut.exit_on_write_error);
    }

    #[test]
    fn invalid_protocol_message_lists_the_known_ones() {
        let err = SettingsError::InvalidProtocol("sctp".to_string());
        assert_eq!(
            err.to_string(),
            "invalid protocol specified 'sctp', known protocols: tcp, tcp4, tcp6, udp, udp4, udp6"
        );
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = parse_err(&["--bogus", "1.2.3.4:80"]);
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        let message = usage_error(&err);
        assert!(message.starts_with("unexpected argument '--bogus'"));
        assert!(!message.contains('\n'));
    }

    #[test]
    fn help_and_version_are_not_errors() {
        let help = parse_err(&["-h"]);
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        assert!(!help.use_stderr());
        let version = parse_err(&["-V"]);
        assert_eq!(version.kind(), ErrorKind::DisplayVersion);
        assert!(!version.use_stderr());
    }

    #[test]
    fn config_supplies_defaults_and_flags_win() {
        let config = Config {
            count: 0,
            interval: 0.5,
            size: 8,
            protocol: "udp".to_string(),
            exit_on_write_error: true,
            ..Config::default()
        };
        let args = Args::try_parse_from(["swampit", "--dryrun"]).unwrap();
        let sut = Settings::new(args, &config).unwrap();
        assert_eq!(sut.count, 0);
        assert_eq!(sut.interval, Duration::from_millis(500));
        assert_eq!(sut.size, 8);
        assert_eq!(sut.protocol, "udp");
        assert!(sut.exit_on_write_error);

        let args = Args::try_parse_from(["swampit", "--dryrun", "-c", "2", "-s", "4", "-p", "tcp"])
            .unwrap();
        let sut = Settings::new(args, &config).unwrap();
        assert_eq!(sut.count, 2);
        assert_eq!(sut.size, 4);
        assert_eq!(sut.protocol, "tcp");
    }
}
