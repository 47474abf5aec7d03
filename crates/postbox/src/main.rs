//! postbox - command-line IMAP client.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use postbox_imap::{Client, Config, ImapStream, Security, connect, utf7};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "postbox", version, about = "Talk to an IMAP server")]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ServerArgs {
    /// Server hostname.
    #[arg(long, global = true, env = "POSTBOX_HOST")]
    host: Option<String>,

    /// Server port [default: 993, or 143 with --plain].
    #[arg(long, global = true, env = "POSTBOX_PORT")]
    port: Option<u16>,

    /// Connect without TLS.
    #[arg(long, global = true)]
    plain: bool,

    /// Login name.
    #[arg(long, global = true, env = "POSTBOX_USER")]
    user: Option<String>,

    /// Login password.
    #[arg(long, global = true, env = "POSTBOX_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Connect timeout in seconds.
    #[arg(long, global = true, default_value_t = 30, value_name = "SECS")]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a mailbox name to Modified UTF-7.
    Encode {
        /// Unicode mailbox name.
        name: String,
    },
    /// Decode a Modified UTF-7 mailbox name.
    Decode {
        /// Wire form of the name.
        wire: String,
    },
    /// List mailboxes.
    List {
        /// Mailbox pattern.
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Show message counts for a mailbox.
    Status {
        /// Mailbox name.
        mailbox: String,
    },
    /// Search a mailbox and print matching sequence numbers.
    Search {
        /// Mailbox name.
        mailbox: String,
        /// Search criteria, e.g. `UNSEEN` or `FROM alice` [default: ALL].
        criteria: Vec<String>,
    },
    /// Print raw messages.
    Fetch {
        /// Mailbox name.
        mailbox: String,
        /// Sequence set, e.g. `1:5`.
        set: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postbox=info,postbox_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Encode { name } => println!("{}", utf7::encode(&name)),
        Command::Decode { wire } => println!("{}", utf7::decode(&wire)?),
        command => {
            let mut client = open(&cli.server).await?;
            let result = run(&mut client, command).await;
            if let Err(err) = client.logout().await {
                debug!(%err, "logout failed");
            }
            result?;
        }
    }

    Ok(())
}

async fn open(args: &ServerArgs) -> anyhow::Result<Client<ImapStream>> {
    let host = args.host.as_deref().context("--host is required")?;
    let user = args.user.as_deref().context("--user is required")?;
    let password = args
        .password
        .as_deref()
        .context("--password or POSTBOX_PASSWORD is required")?;

    let mut builder = Config::builder(host)
        .security(if args.plain {
            Security::None
        } else {
            Security::Implicit
        })
        .connect_timeout(Duration::from_secs(args.timeout));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    let config = builder.build();

    let mut client = connect(&config)
        .await
        .with_context(|| format!("connecting to {}:{}", config.host, config.port))?;
    client.login(user, password).await.context("login failed")?;

    Ok(client)
}

async fn run(client: &mut Client<ImapStream>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { pattern } => {
            for entry in client.list("", &pattern).await? {
                let delimiter = entry.delimiter.map(String::from).unwrap_or_default();
                println!("{delimiter}\t{}", entry.mailbox);
            }
        }
        Command::Status { mailbox } => {
            let status = client
                .status(&mailbox, &["MESSAGES", "RECENT", "UNSEEN"])
                .await?;
            for (item, value) in status {
                println!("{item}\t{value}");
            }
        }
        Command::Search { mailbox, criteria } => {
            client.examine(&mailbox).await?;
            let ids = client.search(&criteria.join(" ")).await?;
            info!(count = ids.len(), "search finished");
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            println!("{}", ids.join(" "));
        }
        Command::Fetch { mailbox, set } => {
            client.examine(&mailbox).await?;
            let messages = client.fetch(&set).await?;
            let mut stdout = std::io::stdout().lock();
            for (seq, body) in messages {
                writeln!(stdout, "--- message {seq} ({} bytes)", body.len())?;
                stdout.write_all(&body)?;
                writeln!(stdout)?;
            }
        }
        Command::Encode { .. } | Command::Decode { .. } => bail!("no server needed"),
    }

    Ok(())
}
