use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use bpaf::{Bpaf, Parser};
use ct0045r::abi::{BANNER, COMMANDS};
use ct0045r::packet::{encode_pointer, tilt_response};
use ct0045r::{Session, SessionConfig};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use wctablet_core::{Diagnostics, PointerSample};

use crate::config::Config;
use crate::device::{device_kind, DeviceKind};
use crate::host::{Host, TokioTimer};
use crate::pointer::sample_stream;

mod config;
mod device;
mod host;
mod pointer;

#[derive(Clone, Debug, Bpaf)]
enum Link {
    Line {
        /// Serial device or pty connected to the host
        #[bpaf(long("line"), argument("PATH"))]
        path: PathBuf,
    },
    /// Use stdin and stdout as the line
    #[bpaf(long("stdio"))]
    Stdio,
}

#[derive(Clone, Debug, Bpaf)]
struct LineArgs {
    /// Line speed used to pace output, overriding the config file
    #[bpaf(long, argument("BAUD"))]
    baud: Option<u32>,
    /// Bytes the line accepts per tick, overriding the config file
    #[bpaf(long, argument("BYTES"))]
    burst: Option<usize>,
    /// Fixed tick interval such as 1ms, ignoring the line speed
    #[bpaf(long, argument("DURATION"))]
    interval: Option<humantime::Duration>,
}

/// Utility for parsing a byte from bpaf: `0xcc`, a decimal value or a single character
#[derive(Debug, Clone, Copy)]
struct HexByte(u8);
impl Display for HexByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}
impl FromStr for HexByte {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u8::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|e| format!("invalid hex byte {s}: {e}"));
        }
        if let Ok(n) = s.parse::<u8>() {
            return Ok(Self(n));
        }
        match s.as_bytes() {
            [b] => Ok(Self(*b)),
            _ => Err(format!("expected a byte, got {s}")),
        }
    }
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Config file to use instead of the platform default
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    /// Log more detail, repeat for trace output
    #[bpaf(short, long, req_flag(()), count)]
    verbose: usize,
    #[bpaf(external(device_kind))]
    device: DeviceKind,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Clone, Debug, Bpaf)]
enum Command {
    /// Emulate the tablet on a line until the host hangs up or ctrl-c
    #[bpaf(command)]
    Run {
        #[bpaf(external)]
        link: Link,
        /// Pointer samples, one `x y [z [buttons]]` per line
        #[bpaf(long, argument("PATH"))]
        pointer: Option<PathBuf>,
        #[bpaf(external)]
        line_args: LineArgs,
    },
    /// Feed captured host bytes through a fresh session and print everything it sends
    #[bpaf(command)]
    Replay {
        /// Raw bytes sent by the host
        #[bpaf(positional("PATH"), guard(|p| p.exists(), "file not found"))]
        path: PathBuf,
    },
    /// List the host commands the tablet recognizes
    #[bpaf(command)]
    Commands,
    /// Print the coordinate packet for a pen position
    #[bpaf(command)]
    Encode {
        #[bpaf(positional("X"))]
        x: u16,
        #[bpaf(positional("Y"))]
        y: u16,
    },
    /// Print the response to a tilt query
    #[bpaf(command)]
    Tilt {
        /// Parameter byte of the query
        #[bpaf(positional("PARAM"))]
        param: HexByte,
    },
    /// Print the power-up banner
    #[bpaf(command)]
    Banner,
}

/// Space separated hex, 16 bytes per line
fn hex(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|chunk| {
            chunk
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Log to stderr, keeping stdout free for the line in stdio mode
fn init_logging(verbose: usize, filter: &str) {
    let fallback = match verbose {
        0 => filter.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(
    kind: DeviceKind,
    mut config: Config,
    link: Link,
    pointer: Option<PathBuf>,
    args: LineArgs,
) -> Result<Diagnostics, Box<dyn Error>> {
    if let Some(baud) = args.baud {
        config.line.baud = baud;
    }
    if let Some(burst) = args.burst {
        config.line.burst = burst;
    }
    if let Some(interval) = args.interval {
        config.line.transmit_interval = Some(interval.into());
    }

    let pointer = match pointer {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            info!("reading pointer samples from {}", path.display());
            Some(sample_stream(BufReader::new(file)))
        },
        None => None,
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let (timer, expired) = TokioTimer::new();
    let device = kind.open(config.session_config(), timer)?;
    info!(%kind, baud = config.line.baud, burst = config.line.burst, "opened device");

    match link {
        Link::Line { path } => {
            let file = tokio::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .await?;
            let (reader, writer) = tokio::io::split(file);
            Host::new(device, expired, writer, config.line.burst)
                .run(reader, pointer, shutdown)
                .await
        },
        Link::Stdio => {
            Host::new(device, expired, tokio::io::stdout(), config.line.burst)
                .run(tokio::io::stdin(), pointer, shutdown)
                .await
        },
    }
}

/// Every byte a fresh session sends in response to `input`, banner included
fn replay(config: SessionConfig, input: &[u8]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut session = Session::new(config)?;
    for &byte in input {
        match session.receive(byte) {
            Ok(Some(command)) => info!(%command, "recognized"),
            Ok(None) => {},
            Err(e) => warn!(error = %e, "reply dropped"),
        }
    }
    Ok(session.drain_tick(usize::MAX))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli().run();
    let (config, created) = match &cli.config {
        Some(path) => (Config::load(path)?, None),
        None => Config::load_or_create()?,
    };
    init_logging(cli.verbose, &config.logging.filter);
    if let Some(path) = created {
        info!("created default config at {}", path.display());
    }

    match cli.command {
        Command::Run {
            link,
            pointer,
            line_args,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            let diagnostics = rt.block_on(run(cli.device, config, link, pointer, line_args))?;
            eprintln!("{diagnostics}");
        },
        Command::Replay { path } => {
            let input = std::fs::read(path)?;
            println!("{}", hex(&replay(config.session_config(), &input)?));
        },
        Command::Commands => {
            for pattern in COMMANDS {
                println!("{:<10} {}", pattern.name, pattern.command);
            }
        },
        Command::Encode { x, y } => {
            println!("{}", hex(&encode_pointer(&PointerSample::new(x, y))));
        },
        Command::Tilt { param } => {
            println!("{param}: {}", hex(&tilt_response(param.0)));
        },
        Command::Banner => println!("{}", hex(&BANNER)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ct0045r::abi::{CONFIG_STRING, MODEL_STRING};

    use super::*;

    #[test]
    fn parses_byte_arguments() {
        assert_eq!("0xcc".parse::<HexByte>().unwrap().0, 0xcc);
        assert_eq!("64".parse::<HexByte>().unwrap().0, 64);
        assert_eq!("@".parse::<HexByte>().unwrap().0, b'@');
        assert!("0x100".parse::<HexByte>().is_err());
        assert!("ab".parse::<HexByte>().is_err());
    }

    #[test]
    fn hex_wraps_lines() {
        assert_eq!(hex(&[0xe0, 0x01]), "e0 01");
        assert_eq!(hex(&[0; 17]).lines().count(), 2);
    }

    #[test]
    fn replay_includes_banner_and_replies() {
        let out = replay(SessionConfig::default(), b"~#~#RE\n").unwrap();
        assert_eq!(out, [&BANNER[..], &MODEL_STRING[..], &CONFIG_STRING[..]].concat());
    }

    #[test]
    fn cli_parses_run() {
        let cli = cli()
            .run_inner(&["run", "--stdio", "--burst", "4", "--interval", "2ms"])
            .unwrap();
        assert_eq!(cli.device, DeviceKind::Ct0045r);
        match cli.command {
            Command::Run {
                link: Link::Stdio,
                pointer: None,
                line_args,
            } => {
                assert_eq!(line_args.burst, Some(4));
                assert_eq!(
                    line_args.interval.map(std::time::Duration::from),
                    Some(std::time::Duration::from_millis(2))
                );
            },
            other => panic!("unexpected command {other:?}"),
        }
    }
}
