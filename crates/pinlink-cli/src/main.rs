//! pinlink Control Tool
//!
//! CLI for driving a pinlink board over a serial port or TCP.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pinlink_client::{Board, Link};
use pinlink_proto::{Color, Command, Message, NeoOp, PinMode, PixelType, ReadKind};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pinlinkctl")]
#[command(about = "Control tool for pinlink boards")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Serial port the board is attached to (e.g., /dev/ttyACM0)
    #[arg(long, conflicts_with = "tcp")]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = pinlink_proto::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// TCP address of a board or emulator (e.g., 127.0.0.1:5150)
    #[arg(long)]
    tcp: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Direct pin commands
    Pin {
        #[command(subcommand)]
        action: PinCommands,
    },
    /// NeoPixel strip commands
    Neo {
        #[command(subcommand)]
        action: NeoCommands,
    },
    /// Send a raw JSON message and print any readings that come back
    Raw {
        /// Message JSON (e.g., '{"data":[{"id":13,"action":2,"params":[13,1]}]}')
        json: String,

        /// How long to wait for readings in milliseconds
        #[arg(long, default_value = "300")]
        wait: u64,
    },
}

#[derive(Subcommand)]
enum PinCommands {
    /// Set a pin mode
    Mode {
        pin: u8,
        /// Mode: input, output, input-pullup, input-pulldown, output-open-drain, analog-input
        mode: String,
        /// Reporting interval for input modes in milliseconds (0 disables)
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Drive an output pin
    Write {
        pin: u8,
        /// Level: high, low, 1, 0
        level: String,
    },
    /// Set a PWM duty cycle
    Pwm {
        pin: u8,
        /// Duty cycle (0-255)
        value: u8,
    },
    /// Read a pin once
    Read {
        pin: u8,
        /// Read the analog value instead of the digital level
        #[arg(long)]
        analog: bool,
        /// Reply timeout in milliseconds
        #[arg(long, default_value = "1000")]
        timeout: u64,
    },
    /// Release a pin and stop its readings
    End { pin: u8 },
}

#[derive(Subcommand)]
enum NeoCommands {
    /// Create the strip
    Init {
        /// Data pin
        pin: u8,
        /// Number of pixels
        count: u16,
        /// Pixel order: rgb, rbg, grb, gbr, brg, bgr, rgbw, grbw
        #[arg(long = "type", default_value = "grb")]
        pixel_type: String,
        /// Use the 400 KHz bitstream
        #[arg(long)]
        khz400: bool,
    },
    /// Set one pixel
    Pixel {
        index: u16,
        /// Color in hex format (e.g., #FF0000 or #FF000080 with white)
        color: String,
    },
    /// Fill a range of pixels
    Fill {
        /// Color in hex format
        color: String,
        #[arg(long, default_value = "0")]
        first: u16,
        /// Pixel count (0 fills to the end)
        #[arg(long, default_value = "0")]
        count: u16,
    },
    /// Turn every pixel off
    Clear,
    /// Set strip brightness
    Brightness {
        /// Brightness (0-255)
        value: u8,
    },
    /// Push the pixel buffer to the strip
    Show,
    /// Run a rainbow animation
    Rainbow {
        /// Data pin
        pin: u8,
        /// Number of pixels
        count: u16,
        /// Full color wheel cycles
        #[arg(long, default_value = "1")]
        cycles: u32,
        /// Delay between frames in milliseconds
        #[arg(long, default_value = "20")]
        delay: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let link = connect(&cli).await?;
    let board = Board::new(link);

    match cli.command {
        Commands::Pin { action } => handle_pin(action, &board).await,
        Commands::Neo { action } => handle_neo(action, &board).await,
        Commands::Raw { json, wait } => handle_raw(&json, wait, &board).await,
    }
}

async fn connect(cli: &Cli) -> Result<Link> {
    match (&cli.serial, &cli.tcp) {
        (Some(path), _) => Link::open_serial(path, cli.baud),
        (None, Some(addr)) => Link::connect_tcp(addr)
            .await
            .context("Failed to connect. Is pinlinkd running?"),
        (None, None) => anyhow::bail!("Either --serial or --tcp is required"),
    }
}

async fn handle_pin(action: PinCommands, board: &Board) -> Result<()> {
    match action {
        PinCommands::Mode {
            pin,
            mode,
            interval,
        } => {
            let mode: PinMode = mode.parse()?;
            board.pin_mode(pin, mode, interval).await?;
            println!("Pin {} mode set to: {}", pin, mode);
        }
        PinCommands::Write { pin, level } => {
            let high = match level.to_lowercase().as_str() {
                "high" | "1" | "on" => true,
                "low" | "0" | "off" => false,
                _ => anyhow::bail!("Invalid level: {}. Use: high, low, 1, 0", level),
            };
            board.digital_write(pin, high).await?;
            println!("Pin {} set {}", pin, if high { "high" } else { "low" });
        }
        PinCommands::Pwm { pin, value } => {
            board.analog_write(pin, value).await?;
            println!("Pin {} duty set to: {}", pin, value);
        }
        PinCommands::Read {
            pin,
            analog,
            timeout,
        } => {
            let kind = if analog {
                ReadKind::Analog
            } else {
                ReadKind::Digital
            };
            let value = board
                .read_now(pin, kind, Duration::from_millis(timeout))
                .await?;
            println!("Pin {}: {}", pin, value);
        }
        PinCommands::End { pin } => {
            board.end(pin).await?;
            println!("Pin {} released", pin);
        }
    }

    Ok(())
}

async fn handle_neo(action: NeoCommands, board: &Board) -> Result<()> {
    // One-shot commands go straight to the link; there is no cached strip
    // state to compare against.
    let link = board.link();

    match action {
        NeoCommands::Init {
            pin,
            count,
            pixel_type,
            khz400,
        } => {
            let mut pixel_type: PixelType = pixel_type.parse()?;
            if khz400 {
                pixel_type = pixel_type.with_khz400();
            }
            link.send_request(NeoOp::Init {
                pin,
                count,
                pixel_type,
            })
            .await?;
            println!("Strip initialized: {} pixels on pin {}", count, pin);
        }
        NeoCommands::Pixel { index, color } => {
            let color = Color::from_hex(&color)?;
            link.send_request(NeoOp::SetPixel {
                index: i64::from(index),
                color,
            })
            .await?;
            println!("Pixel {} set to: {}", index, color);
        }
        NeoCommands::Fill {
            color,
            first,
            count,
        } => {
            let color = Color::from_hex(&color)?;
            link.send_request(NeoOp::Fill {
                color,
                first: i64::from(first),
                count: i64::from(count),
            })
            .await?;
            println!("Filled from {} with: {}", first, color);
        }
        NeoCommands::Clear => {
            link.send_request(NeoOp::Clear).await?;
            println!("Strip cleared");
        }
        NeoCommands::Brightness { value } => {
            link.send_request(NeoOp::Brightness(value)).await?;
            println!("Brightness set to: {}", value);
        }
        NeoCommands::Show => {
            link.send_request(NeoOp::Show).await?;
            println!("Strip updated");
        }
        NeoCommands::Rainbow {
            pin,
            count,
            cycles,
            delay,
        } => {
            if count == 0 {
                anyhow::bail!("Pixel count must be at least 1");
            }
            let mut neo = board.neo_pixel();
            neo.init(pin, count, PixelType::default()).await?;
            let frames = 256 * cycles;
            for frame in 0..frames {
                for index in 0..count {
                    let pos = (u32::from(index) * 256 / u32::from(count) + frame) & 0xFF;
                    neo.set_pixel_color(index, Color::wheel(pos as u8)).await?;
                }
                neo.show().await?;
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            println!("Rainbow finished after {} frames", frames);
        }
    }

    Ok(())
}

async fn handle_raw(json: &str, wait: u64, board: &Board) -> Result<()> {
    let message: Message<Command> =
        serde_json::from_str(json).context("Message must be {\"data\":[...]} JSON")?;
    let mut events = board.link().subscribe();
    board.link().send(message.data).await?;

    let deadline = tokio::time::sleep(Duration::from_millis(wait));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            reading = events.recv() => match reading {
                Ok(reading) => println!("{}", serde_json::to_string(&reading)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut deadline => break,
        }
    }

    Ok(())
}
