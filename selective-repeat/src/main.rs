//! Entry point for `selective-repeat`.
//!
//! Parses CLI arguments and dispatches into the emulator or one side of a
//! UDP transfer. All protocol work is delegated to library modules; `main.rs`
//! owns only process setup (logging, argument parsing).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use selective_repeat::endpoint::{self, EndpointConfig};
use selective_repeat::simulator::{Simulator, SimulatorConfig};
use selective_repeat::socket::Socket;
use selective_repeat::{Message, SrConfig, RTT, WINDOW_SIZE};

/// Selective-Repeat ARQ over an unreliable channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Args)]
struct ProtocolArgs {
    /// Maximum number of unacknowledged packets.
    #[arg(short, long, default_value_t = WINDOW_SIZE)]
    window: usize,
    /// Retransmission timeout in time units.
    #[arg(long, default_value_t = RTT)]
    rtt: f64,
}

impl ProtocolArgs {
    fn config(&self) -> Result<SrConfig> {
        Ok(SrConfig::new(self.window, self.rtt)?)
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Run a transfer through the emulated lossy channel.
    Simulate {
        /// Number of messages to generate.
        #[arg(short, long, default_value_t = 20)]
        messages: usize,
        /// Packet loss probability.
        #[arg(long, default_value_t = 0.0)]
        loss: f64,
        /// Packet corruption probability.
        #[arg(long, default_value_t = 0.0)]
        corrupt: f64,
        /// Average time between messages from the application.
        #[arg(long, default_value_t = 10.0)]
        lambda: f64,
        /// RNG seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Abandon the run after this much simulated time.
        #[arg(long, default_value_t = 1.0e7)]
        max_time: f64,
        #[command(flatten)]
        protocol: ProtocolArgs,
    },
    /// Act as entity A and send numbered messages over UDP.
    Send {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        /// Address of the receiver (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: SocketAddr,
        /// Number of messages to send.
        #[arg(short, long, default_value_t = 20)]
        count: usize,
        /// Milliseconds per protocol time unit.
        #[arg(long, default_value_t = 10)]
        time_unit_ms: u64,
        #[command(flatten)]
        protocol: ProtocolArgs,
    },
    /// Act as entity B and print messages received over UDP.
    Receive {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        /// Number of messages to wait for.
        #[arg(short, long, default_value_t = 20)]
        count: usize,
        /// Milliseconds per protocol time unit.
        #[arg(long, default_value_t = 10)]
        time_unit_ms: u64,
        #[command(flatten)]
        protocol: ProtocolArgs,
    },
}

fn endpoint_config(protocol: &ProtocolArgs, time_unit_ms: u64) -> Result<EndpointConfig> {
    Ok(EndpointConfig {
        protocol: protocol.config()?,
        time_unit: Duration::from_millis(time_unit_ms),
        ..EndpointConfig::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Simulate {
            messages,
            loss,
            corrupt,
            lambda,
            seed,
            max_time,
            protocol,
        } => {
            let config = SimulatorConfig {
                messages,
                loss_prob: loss,
                corrupt_prob: corrupt,
                lambda,
                seed,
                max_time,
                protocol: protocol.config()?,
            };
            let report = Simulator::new(config)?.run();
            println!("{report}");
        }
        Mode::Send {
            bind,
            peer,
            count,
            time_unit_ms,
            protocol,
        } => {
            let config = endpoint_config(&protocol, time_unit_ms)?;
            let socket = Socket::bind(bind).await.context("binding sender socket")?;
            let messages: Vec<Message> = (0..count)
                .map(|i| Message::from_slice(format!("message {i:06}").as_bytes()))
                .collect();
            let stats = endpoint::run_sender(&socket, peer, &messages, &config).await?;
            println!(
                "sent {} messages: {} resent over {} timeouts",
                stats.packets_sent, stats.packets_resent, stats.timeouts
            );
        }
        Mode::Receive {
            bind,
            count,
            time_unit_ms,
            protocol,
        } => {
            let config = endpoint_config(&protocol, time_unit_ms)?;
            let socket = Socket::bind(bind).await.context("binding receiver socket")?;
            log::info!("Listening on {}", socket.local_addr);
            let received = endpoint::run_receiver(&socket, count, &config).await?;
            for message in &received.messages {
                println!("{}", message.to_string().trim_end_matches('\0'));
            }
        }
    }

    Ok(())
}
