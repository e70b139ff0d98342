//! storefront-beacon CLI: report a page view or event, or print the
//! installation's client id.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use storefront_beacon::store::shop_domain;
use storefront_beacon::{BeaconConfig, Event, FileStore, HttpClient, PageView, Reporter};

const USAGE: &str = "usage: storefront-beacon [--config PATH] <command>

commands:
  client-id                                  print the installation's client id
  pageview <path> [--domain D] [--title T]   report a page view
  event <category> <action> [label] [value]  report an event";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    ClientId,
    PageView {
        path: String,
        domain: Option<String>,
        title: Option<String>,
    },
    Event {
        category: String,
        action: String,
        label: String,
        value: i64,
    },
}

/// Take the value following `flag` out of `args`.
fn take_flag(args: &mut Vec<String>, flag: &str) -> anyhow::Result<Option<String>> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if i + 1 >= args.len() {
        bail!("{flag} needs a value\n\n{USAGE}");
    }
    let value = args.remove(i + 1);
    args.remove(i);
    Ok(Some(value))
}

fn parse_command(mut args: Vec<String>) -> anyhow::Result<Command> {
    if args.is_empty() {
        bail!("missing command\n\n{USAGE}");
    }
    let command = args.remove(0);

    match command.as_str() {
        "client-id" => Ok(Command::ClientId),
        "pageview" => {
            let domain = take_flag(&mut args, "--domain")?;
            let title = take_flag(&mut args, "--title")?;
            match args.as_slice() {
                [path] => Ok(Command::PageView {
                    path: path.clone(),
                    domain,
                    title,
                }),
                _ => bail!("pageview takes exactly one path\n\n{USAGE}"),
            }
        }
        "event" => match args.as_slice() {
            [category, action, rest @ ..] if rest.len() <= 2 => {
                let label = rest.first().cloned().unwrap_or_default();
                let value = match rest.get(1) {
                    Some(v) => v
                        .parse::<i64>()
                        .with_context(|| format!("event value must be an integer, got {v:?}"))?,
                    None => 0,
                };
                Ok(Command::Event {
                    category: category.clone(),
                    action: action.clone(),
                    label,
                    value,
                })
            }
            _ => bail!("event takes a category, an action, and optional label and value\n\n{USAGE}"),
        },
        other => bail!("unknown command {other:?}\n\n{USAGE}"),
    }
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config_path = take_flag(&mut args, "--config")?
        .or_else(|| std::env::var("BEACON_CONFIG").ok())
        .unwrap_or_else(|| "storefront-beacon.toml".to_string());

    let command = parse_command(args)?;
    let config = BeaconConfig::load(&config_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // Initialize tracing (OTLP export is optional, falls back to fmt-only)
        let tracing_guard = beacon_tracing::init_tracing(&config.tracing);

        tracing::debug!(
            config_path = %config_path,
            endpoint = %config.collector.endpoint,
            otlp = tracing_guard.is_exporting(),
            "Starting storefront-beacon"
        );

        run(config, command).await
    })
}

async fn run(config: BeaconConfig, command: Command) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.collector.timeout_secs))
        .build()?;

    let store = Arc::new(FileStore::new(&config.store.path));
    tracing::debug!(store = %store.path().display(), "Using config store");
    let reporter = Reporter::new(HttpClient::new(client), store, &config.collector);

    let delivery = match command {
        Command::ClientId => {
            println!("{}", reporter.client_id().await?);
            return Ok(());
        }
        Command::PageView {
            path,
            domain,
            title,
        } => {
            let domain = match domain.or(config.shop.domain) {
                Some(domain) => domain,
                None => shop_domain(reporter.store())?.unwrap_or_else(|| {
                    tracing::warn!("No shop domain configured, reporting an empty host");
                    String::new()
                }),
            };
            let mut page = PageView::new(path, domain);
            if let Some(title) = title {
                page = page.with_title(title);
            }
            reporter.track_page_view(&page).await?
        }
        Command::Event {
            category,
            action,
            label,
            value,
        } => {
            let event = Event::new(category, action)
                .with_label(label)
                .with_value(value);
            reporter.track_event(&event).await?
        }
    };

    tracing::debug!(delivery = ?delivery, stats = ?reporter.stats(), "Hit reported");
    println!("{}", serde_json::to_string(&reporter.stats())?);
    Ok(())
}
