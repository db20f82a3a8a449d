use std::io::{self, Write};
use std::num::NonZeroU16;

use clap::{Parser, ValueEnum};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use bobby_runtime::config::{
    ControlConfig, JOYSTICK_DEVICE, LOOP_HZ, PWM_BAUDRATE, PWM_FREQ_HZ, PWM_PORT, SERVO_RATE,
    Subsystems,
};
use bobby_runtime::input::{joystick, keyboard};
use bobby_runtime::pwm::{JsonLinesSink, PwmSink, SerialPwmBus};
use bobby_runtime::runtime::{self, BoxError, ControlLoop, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputKind {
    Joystick,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// PWM bridge on a serial port
    Serial,
    /// JSON lines on stdout (dry run)
    Json,
}

#[derive(Parser, Debug)]
#[command(version, about = "Drive Bobby's omni base and animatronic head", long_about = None)]
struct Args {
    #[arg(long, value_enum, default_value_t = InputKind::Joystick)]
    input: InputKind,

    /// Joystick device, or "-" for stdin
    #[arg(long, default_value = JOYSTICK_DEVICE)]
    device: String,

    #[arg(long, value_enum, default_value_t = SinkKind::Serial)]
    sink: SinkKind,

    /// Serial port of the PWM bridge
    #[arg(long, default_value = PWM_PORT)]
    port: String,

    #[arg(long, default_value_t = PWM_BAUDRATE)]
    baud: u32,

    #[arg(long, default_value_t = LOOP_HZ)]
    hz: u64,

    /// Tilt servo ramp step per tick (non-zero)
    #[arg(long, default_value_t = SERVO_RATE)]
    tilt_rate: NonZeroU16,

    /// Jaw servo ramp step per tick (non-zero)
    #[arg(long, default_value_t = SERVO_RATE)]
    jaw_rate: NonZeroU16,

    /// Leave the wheels alone (head-only session)
    #[arg(long)]
    no_drivetrain: bool,

    /// Leave the head alone
    #[arg(long)]
    no_head: bool,

    /// Exercise every actuator instead of taking operator input
    #[arg(long)]
    self_test: bool,
}

fn open_sink(args: &Args) -> Result<Box<dyn PwmSink>, BoxError> {
    match args.sink {
        SinkKind::Serial => {
            let mut bus = SerialPwmBus::open_with_baudrate(&args.port, args.baud)?;
            bus.set_frequency(PWM_FREQ_HZ)?;
            Ok(Box::new(bus))
        }
        SinkKind::Json => Ok(Box::new(JsonLinesSink::new(std::io::stdout()))),
    }
}

async fn run(args: Args) -> Result<(), BoxError> {
    // Sink failure is fatal before anything moves
    let sink = open_sink(&args)?;

    if args.self_test {
        runtime::run_self_test(sink, args.hz).await?;
        return Ok(());
    }

    let config = ControlConfig {
        loop_hz: args.hz,
        subsystems: Subsystems {
            drivetrain: !args.no_drivetrain,
            head: !args.no_head,
        },
        servo_rates: [args.tilt_rate, args.tilt_rate, args.jaw_rate],
        ..ControlConfig::default()
    };

    let (tx, rx) = unbounded_channel();
    match args.input {
        InputKind::Joystick => {
            joystick::spawn_reader(&args.device, tx)?;
            let control = ControlLoop::new(config, Operator::joystick(), sink);
            runtime::run(control, rx).await?;
        }
        InputKind::Keyboard => {
            info!("Keys: 1-9 = move (5 = halt), a/s/d = rotate, q = quit");
            enable_raw_mode()?;
            let result = match keyboard::spawn_reader(tx) {
                Ok(()) => {
                    let control = ControlLoop::new(config, Operator::keyboard(), sink);
                    runtime::run(control, rx).await.map(drop)
                }
                Err(e) => Err(e.into()),
            };
            disable_raw_mode()?;
            result?;
        }
    }

    Ok(())
}

/// Write `buf`, ending every line with "\r\n"
fn write_crlf(out: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    for line in buf.split_inclusive(|&b| b == b'\n') {
        match line.strip_suffix(b"\n") {
            Some(body) if !body.ends_with(b"\r") => {
                out.write_all(body)?;
                out.write_all(b"\r\n")?;
            }
            _ => out.write_all(line)?,
        }
    }
    Ok(())
}

/// Stderr for raw-mode terminals, which no longer turn "\n" into a new line
struct RawModeStderr;

impl Write for RawModeStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_crlf(&mut io::stderr().lock(), buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (set RUST_LOG=info or debug); stderr keeps stdout free for the JSON sink
    let writer = match args.input {
        InputKind::Keyboard => BoxMakeWriter::new(|| RawModeStderr),
        InputKind::Joystick => BoxMakeWriter::new(io::stderr),
    };
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting with {:?}", args);

    if let Err(e) = run(args).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
