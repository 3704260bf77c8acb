use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ndhcpd::{Config, DhcpServer, Result, parse_pool_spec};

#[derive(Parser)]
#[command(name = "ndhcpd")]
#[command(author, version, about = "A minimal DHCP server", long_about = None)]
struct Cli {
    /// Network interface to serve on (e.g. eth0).
    #[arg(short, long)]
    interface: Option<String>,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// One line of the administrative command language.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// `i<name>`: bind to an interface (takes effect on the next start).
    SetInterface(String),
    /// `a<ip>[-<ip2>][/<mask>]`: add addresses to the pool.
    AddPool(String),
    /// `ips`: list the configured addresses.
    ListIps,
    /// `start`: start serving.
    Start,
    /// `stop`: stop serving and forget all leases.
    Stop,
    /// `quit`: stop and exit.
    Quit,
    /// `help`: print the command summary.
    Help,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        "start" => Command::Start,
        "stop" => Command::Stop,
        "quit" | "exit" => Command::Quit,
        "ips" => Command::ListIps,
        "help" | "?" => Command::Help,
        _ => {
            if let Some(rest) = line.strip_prefix('i') {
                Command::SetInterface(rest.trim().to_string())
            } else if let Some(rest) = line.strip_prefix('a') {
                Command::AddPool(rest.trim().to_string())
            } else {
                Command::Unknown(line.to_string())
            }
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  i<name>                   bind to interface <name>");
    println!("  a<ip>[-<ip2>][/<mask>]    add address(es) to the pool");
    println!("  ips                       list configured addresses");
    println!("  start                     start serving");
    println!("  stop                      stop serving, forget leases");
    println!("  quit                      stop and exit");
}

/// Runs one command. Returns false when the loop should exit.
async fn dispatch(server: &mut DhcpServer, command: Command) -> bool {
    match command {
        Command::SetInterface(name) => {
            if name.is_empty() {
                server.set_interface(None);
                info!("Interface binding cleared");
            } else {
                info!("Binding to interface {}", name);
                server.set_interface(Some(name));
            }
        }
        Command::AddPool(spec) => match parse_pool_spec(&spec) {
            Ok(pool) => {
                server.add_range(pool.from, pool.to, pool.raw_mask).await;
                info!("Added {} - {} to the pool", pool.from, pool.to);
            }
            Err(parse_error) => error!("{}", parse_error),
        },
        Command::ListIps => {
            for ip in server.ips().await {
                println!("{}", ip);
            }
        }
        Command::Start => {
            if let Err(start_error) = server.start().await {
                error!("Failed to start: {}", start_error);
            }
        }
        Command::Stop => server.stop().await,
        Command::Quit => return false,
        Command::Help => print_help(),
        Command::Empty => {}
        Command::Unknown(line) => {
            error!("Unknown command '{}', try 'help'", line);
        }
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = Config {
        interface: cli.interface,
        ..Config::default()
    };
    let mut server = DhcpServer::new(config);

    info!("ndhcpd ready, type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !dispatch(&mut server, parse_command(&line)).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, stopping server...");
                break;
            }
        }
    }

    server.stop().await;
    Ok(())
}
