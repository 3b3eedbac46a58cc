// ABOUTME: Command-line front end for a serial modem: initialize, send an SMS, listen for messages, raw AT
// ABOUTME: Shows the session shared between the foreground modem and a background listener task

use airlink::client::{
    CommandSession, ListenerConfig, Modem, ModemConfig, ModemControl, SerialSettings,
    SmsTransmitter,
};
use airlink::pdu::OutboundSms;
use argh::FromArgs;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Drive a cellular modem over its serial port
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// serial device (default: /dev/ttyUSB2)
    #[argh(option, short = 'p')]
    port: Option<String>,

    /// baud rate (default: 115200)
    #[argh(option, short = 'b')]
    baud: Option<u32>,

    /// skip module initialization
    #[argh(switch)]
    no_init: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Send(SendArgs),
    Listen(ListenArgs),
    At(AtArgs),
    Restart(RestartArgs),
}

/// send an SMS
#[derive(FromArgs)]
#[argh(subcommand, name = "send")]
struct SendArgs {
    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,
}

/// poll the inbox and print received messages until interrupted
#[derive(FromArgs)]
#[argh(subcommand, name = "listen")]
struct ListenArgs {
    /// seconds between polls (default: 1)
    #[argh(option)]
    interval: Option<u64>,

    /// notify every concatenated part on its own
    #[argh(switch)]
    no_reassembly: bool,
}

/// send a raw AT command and print the response
#[derive(FromArgs)]
#[argh(subcommand, name = "at")]
struct AtArgs {
    /// the command text, e.g. AT+CSQ
    #[argh(positional)]
    text: String,

    /// keyword that ends the response (default: OK)
    #[argh(option, short = 'k')]
    keyword: Vec<String>,

    /// timeout in seconds (default: 3)
    #[argh(option)]
    timeout: Option<u64>,
}

/// reset the module and initialize it again
#[derive(FromArgs)]
#[argh(subcommand, name = "restart")]
struct RestartArgs {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = SerialSettings::default();
    if let Some(port) = cli_args.port {
        settings = SerialSettings::new(port);
    }
    if let Some(baud) = cli_args.baud {
        settings = settings.with_baud_rate(baud);
    }

    let session = Arc::new(CommandSession::open(settings)?);
    let modem = Modem::new(session, ModemConfig::default());

    if !cli_args.no_init && !matches!(cli_args.command, Command::At(_) | Command::Restart(_)) {
        modem.initialize().await?;
    }

    match cli_args.command {
        Command::Send(args) => {
            let references = modem
                .send_sms(&OutboundSms::new(args.to, args.message))
                .await?;
            println!("Sent in {} part(s), references {:?}", references.len(), references);
        }
        Command::Listen(args) => {
            let config = ListenerConfig::default()
                .with_poll_interval(Duration::from_secs(args.interval.unwrap_or(1)))
                .with_reassembly(!args.no_reassembly)
                .with_channels(["log", "forward"]);
            let (sender, mut receiver) = mpsc::channel(32);
            let mut listener = modem.listener(config, Some(sender));
            let stop = listener.stop_handle();
            let task = tokio::spawn(async move { listener.run().await });

            loop {
                tokio::select! {
                    Some(notification) = receiver.recv() => {
                        println!("== {}\n{}\n", notification.title, notification.body);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            stop.stop();
            task.await?;
        }
        Command::At(args) => {
            let keywords: Vec<&str> = args.keyword.iter().map(String::as_str).collect();
            let timeout = Duration::from_secs(args.timeout.unwrap_or(3));
            let response = modem.raw_command(&args.text, &keywords, timeout).await?;
            println!("{}", response.trim());
        }
        Command::Restart(_) => {
            modem.restart().await?;
            println!("Module restarted");
        }
    }

    Ok(())
}
