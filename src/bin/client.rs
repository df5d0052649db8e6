#![forbid(unsafe_code)]

//! Headless TubeKit client. Opens a page address, restores its selection
//! against the backend, then reads commands from stdin:
//!
//! ```text
//! play <url or id>      channel <url or id>      playlist <url or id>
//! pick <n>              show    address    status    help    quit
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;
use tubekit::address::AddressState;
use tubekit::client::HttpDataSource;
use tubekit::config::{DEFAULT_CONFIG_PATH, load_runtime_settings_from};
use tubekit::orchestrator::{Action, App, Dispatcher, FeedKind};
use tubekit::page::{Page, ResultClick};
use url::Url;

const HELP: &str = "commands: play <input>, channel <input>, playlist <input>, pick <n>, show, address, status, quit";

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a TubeKit page from the terminal.")]
struct ClientArgs {
    #[arg(
        long = "page",
        value_name = "URL",
        default_value = "http://127.0.0.1:8000/",
        help = "Page address to open, including any v/channel/playlist parameters"
    )]
    page: String,
    #[arg(long = "api-base", value_name = "URL", help = "Backend base URL")]
    api_base: Option<String>,
    #[arg(
        long = "timeout",
        value_name = "SECS",
        help = "Request timeout in seconds (default: wait indefinitely)"
    )]
    timeout: Option<u64>,
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(Action),
    Show,
    Address,
    Status,
    Help,
    Quit,
    Nothing,
}

fn main() -> Result<()> {
    tubekit::init_logging();
    let args = ClientArgs::parse();
    let settings = load_runtime_settings_from(&args.config)?;

    let api_base = args.api_base.unwrap_or(settings.api_base);
    let api_base = Url::parse(&api_base).with_context(|| format!("parsing API base {api_base}"))?;
    let address = AddressState::parse(&args.page)
        .with_context(|| format!("parsing page address {}", args.page))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    let local = LocalSet::new();
    local.block_on(
        &runtime,
        session(data_source(api_base, args.timeout), address),
    )
}

/// Without `--timeout` requests wait as long as the backend takes.
fn data_source(api_base: Url, timeout_secs: Option<u64>) -> HttpDataSource {
    match timeout_secs {
        Some(secs) => HttpDataSource::with_timeout(api_base, Duration::from_secs(secs)),
        None => HttpDataSource::new(api_base),
    }
}

async fn session(data: HttpDataSource, address: AddressState) -> Result<()> {
    let dispatcher = Dispatcher::new(App::new(data, Page::new(address)));
    dispatcher.dispatch(Action::Bootstrap);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let app = dispatcher.app();
        match parse_command(&line) {
            Ok(Command::Run(action)) => {
                dispatcher.dispatch(action);
            }
            Ok(Command::Show) => println!("{}", app.with_page(|page| page.to_html())),
            Ok(Command::Address) => {
                println!("{}", app.with_page(|page| page.address().to_string()))
            }
            Ok(Command::Status) => {
                let status = app.with_page(|page| page.status().clone());
                match (status.text.is_empty(), status.error) {
                    (true, _) => println!("(no status)"),
                    (false, true) => println!("error: {}", status.text),
                    (false, false) => println!("{}", status.text),
                }
            }
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Ok(Command::Nothing) => {}
            Err(message) => eprintln!("{message}"),
        }
    }
    Ok(())
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));

    let command = match word {
        "" => Command::Nothing,
        "play" => Command::Run(Action::PlayVideo {
            input: rest.to_owned(),
        }),
        "channel" => Command::Run(Action::LoadFeed {
            kind: FeedKind::Channel,
            input: rest.to_owned(),
        }),
        "playlist" => Command::Run(Action::LoadFeed {
            kind: FeedKind::Playlist,
            input: rest.to_owned(),
        }),
        "pick" => {
            let position: usize = rest
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("pick expects a result number, got {rest:?}"))?;
            Command::Run(Action::PickResult {
                index: position - 1,
                click: ResultClick::Entry,
            })
        }
        "show" => Command::Show,
        "address" => Command::Address,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command {other:?}; {HELP}")),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions() {
        assert_eq!(
            parse_command("  play https://youtu.be/dQw4w9WgXcQ "),
            Ok(Command::Run(Action::PlayVideo {
                input: "https://youtu.be/dQw4w9WgXcQ".into()
            }))
        );
        assert_eq!(
            parse_command("playlist PLabc"),
            Ok(Command::Run(Action::LoadFeed {
                kind: FeedKind::Playlist,
                input: "PLabc".into()
            }))
        );
        assert_eq!(
            parse_command("channel"),
            Ok(Command::Run(Action::LoadFeed {
                kind: FeedKind::Channel,
                input: String::new()
            }))
        );
    }

    #[test]
    fn pick_is_one_based() {
        assert_eq!(
            parse_command("pick 2"),
            Ok(Command::Run(Action::PickResult {
                index: 1,
                click: ResultClick::Entry
            }))
        );
        assert!(parse_command("pick 0").is_err());
        assert!(parse_command("pick two").is_err());
    }

    #[test]
    fn parses_view_commands() {
        assert_eq!(parse_command(""), Ok(Command::Nothing));
        assert_eq!(parse_command("show"), Ok(Command::Show));
        assert_eq!(parse_command("address"), Ok(Command::Address));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
        assert!(parse_command("rewind").unwrap_err().contains("rewind"));
    }

    #[test]
    fn requests_only_time_out_when_asked() {
        let base = Url::parse("http://127.0.0.1:8000/").unwrap();
        let args = ClientArgs::parse_from(["client"]);
        assert_eq!(data_source(base.clone(), args.timeout).timeout(), None);

        let args = ClientArgs::parse_from(["client", "--timeout", "30"]);
        assert_eq!(
            data_source(base, args.timeout).timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn cli_defaults() {
        let args = ClientArgs::parse_from(["client"]);
        assert_eq!(args.page, "http://127.0.0.1:8000/");
        assert_eq!(args.api_base, None);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
