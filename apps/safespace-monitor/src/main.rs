use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use crossterm::{cursor, execute, terminal};
use flume::RecvTimeoutError;
use miette::{IntoDiagnostic, miette};
use safespace::{Applied, Config, Event, Monitor, Rotation, Worker, worker};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Live UWB tag position and safespace monitor", long_about = None)]
struct Cli {
    #[clap(long, short, help = "Path to the configuration file")]
    config: Option<PathBuf>,
    #[clap(long, help = "Serial port to read from")]
    port: Option<String>,
    #[clap(long, help = "Serial baud rate")]
    baud: Option<u32>,
    #[clap(long, help = "Id of the tag to track")]
    tag: Option<String>,
    #[clap(
        long,
        allow_negative_numbers = true,
        help = "Map rotation in degrees (a multiple of 90)"
    )]
    rotation: Option<i64>,
    #[clap(long, help = "Replay a recorded log instead of reading the port ('-' for stdin)")]
    replay: Option<PathBuf>,
    #[clap(long, help = "Delay between replayed samples in milliseconds")]
    interval_ms: Option<u64>,
    #[clap(long, value_enum, default_value = "map", help = "How to present the tag")]
    view: View,
    #[clap(long, help = "Disable ANSI colors")]
    no_color: bool,
    #[clap(long, default_value = "250", help = "Map refresh period in milliseconds")]
    refresh_ms: u64,
    #[clap(
        long,
        value_enum,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace)"
    )]
    log_level: LogLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum View {
    /// Full-screen map, redrawn periodically
    Map,
    /// One status line per accepted sample
    Status,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Cli {
    fn apply(&self, config: &mut Config) -> Result<(), safespace::Error> {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(tag) = &self.tag {
            config.target_tag = tag.clone();
        }
        if let Some(degrees) = self.rotation {
            config.map.rotation = Rotation::from_degrees(degrees)?;
        }
        config.validate()
    }
}

fn main() -> miette::Result<()> {
    let args = Cli::parse();
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::builder().from_env_lossy()
    } else {
        EnvFilter::builder().parse_lossy(format!(
            "safespace={level},safespace_monitor={level}",
            level = args.log_level.as_str()
        ))
    };
    let _ = tracing_subscriber::fmt::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .try_init();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config)?;
    let mut monitor = Monitor::new(&config)?;
    if args.view == View::Map {
        render::canvas_size(monitor.mapper().region())?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    for signal in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register(*signal, stop.clone()).into_diagnostic()?;
    }

    let (tx, rx) = worker::channel();
    let worker = match &args.replay {
        Some(path) => {
            info!(path = %path.display(), "replaying");
            let reader: Box<dyn BufRead + Send> = if path.as_os_str() == "-" {
                Box::new(BufReader::new(io::stdin()))
            } else {
                Box::new(BufReader::new(File::open(path).into_diagnostic()?))
            };
            let pacing = args.interval_ms.map(Duration::from_millis);
            Worker::replay(reader, pacing, tx, stop.clone())?
        }
        None => {
            info!(port = %config.serial.port, tag = %config.target_tag, "monitoring");
            Worker::serial(config.serial.clone(), tx, stop.clone())?
        }
    };

    let mut presenter = Presenter {
        view: args.view,
        color: !args.no_color,
        refresh: Duration::from_millis(args.refresh_ms.max(10)),
        last_draw: None,
        out: io::stdout(),
    };
    let result = run(&rx, &mut monitor, &mut presenter, &stop);
    drop(rx);
    if !worker.join() {
        warn!("reader still blocked on input, leaving it behind");
    }
    presenter.finish(&monitor)?;
    result
}

fn run<W: Write>(
    rx: &flume::Receiver<Event>,
    monitor: &mut Monitor,
    presenter: &mut Presenter<W>,
    stop: &AtomicBool,
) -> miette::Result<()> {
    loop {
        if stop.load(Ordering::Relaxed) {
            info!("stop requested");
            return Ok(());
        }
        match rx.recv_timeout(presenter.refresh) {
            Ok(Event::Sample(sample)) => {
                if monitor.apply(&sample) == Applied::Updated {
                    presenter.on_update(monitor)?;
                }
            }
            Ok(Event::Failed(msg)) => {
                warn!(%msg, "reader failed");
                presenter.draw(monitor)?;
                return Err(miette!(msg));
            }
            Ok(Event::Finished) => {
                info!(samples = monitor.accepted(), "replay finished");
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
        presenter.tick(monitor)?;
    }
}

struct Presenter<W> {
    view: View,
    color: bool,
    refresh: Duration,
    last_draw: Option<Instant>,
    out: W,
}

impl<W: Write> Presenter<W> {
    fn on_update(&mut self, monitor: &Monitor) -> miette::Result<()> {
        if self.view == View::Status {
            let line = render::status_line(&monitor.snapshot(), self.color);
            writeln!(self.out, "{line}").into_diagnostic()?;
        }
        Ok(())
    }

    fn tick(&mut self, monitor: &Monitor) -> miette::Result<()> {
        let due = self
            .last_draw
            .is_none_or(|last| last.elapsed() >= self.refresh);
        if self.view == View::Map && due {
            self.draw(monitor)?;
        }
        Ok(())
    }

    fn draw(&mut self, monitor: &Monitor) -> miette::Result<()> {
        if self.view != View::Map {
            return Ok(());
        }
        let now = Instant::now();
        let snapshot = monitor.snapshot_at(now);
        let panel = render::Panel {
            snapshot: &snapshot,
            uptime: monitor.uptime(now),
            clock: chrono::Local::now().format("%H:%M:%S").to_string(),
            sample_rate: monitor.sample_rate(now),
            zone_name: monitor.zone().name(),
        };
        let map = render::draw_map(monitor)?.render(self.color);
        let out = &mut self.out;
        execute!(
            out,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        )
        .into_diagnostic()?;
        write!(out, "{map}{}", panel.render(self.color)).into_diagnostic()?;
        out.flush().into_diagnostic()?;
        self.last_draw = Some(now);
        Ok(())
    }

    fn finish(&mut self, monitor: &Monitor) -> miette::Result<()> {
        self.draw(monitor)?;
        let tag = monitor.tag();
        writeln!(
            self.out,
            "{}: {} samples, {:.2}m travelled",
            tag.id(),
            monitor.accepted(),
            tag.total_distance()
        )
        .into_diagnostic()
    }
}
