use std::{fmt::Write, time::Duration};

use miette::miette;
use nu_ansi_term::{Color, Style};
use safespace::{DisplayRegion, Monitor, Snapshot};

/// Largest canvas the map view will allocate.
pub const MAX_COLS: usize = 1024;
pub const MAX_ROWS: usize = 512;

const GRID: char = '·';
const TRAIL: char = '•';
const TAG: char = '●';

const GRID_COLOR: Color = Color::DarkGray;
const ZONE_COLOR: Color = Color::Blue;
const TRAIL_COLOR: Color = Color::Cyan;
const SAFE_COLOR: Color = Color::Green;
const UNSAFE_COLOR: Color = Color::Red;
const TITLE_COLOR: Color = Color::Cyan;

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    color: Option<Color>,
}

/// Character grid addressed in display units, one unit per cell.
pub struct Canvas {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell { ch: ' ', color: None }; cols * rows],
        }
    }

    fn cell_index(&self, (px, py): (f64, f64)) -> Option<usize> {
        let col = axis(px, self.cols)?;
        let row = axis(py, self.rows)?;
        Some(row * self.cols + col)
    }

    fn put(&mut self, p: (f64, f64), ch: char, color: Option<Color>) {
        if let Some(i) = self.cell_index(p) {
            self.cells[i] = Cell { ch, color };
        }
    }

    pub fn get(&self, p: (f64, f64)) -> Option<char> {
        self.cell_index(p).map(|i| self.cells[i].ch)
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), ch: char, color: Option<Color>) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            self.put((from.0 + dx * t, from.1 + dy * t), ch, color);
        }
    }

    pub fn render(&self, color: bool) -> String {
        let mut out = String::with_capacity(self.cells.len() * 4);
        for row in self.cells.chunks(self.cols.max(1)) {
            for cell in row {
                match cell.color {
                    Some(c) if color => {
                        let _ = write!(out, "{}", c.paint(cell.ch.to_string()));
                    }
                    _ => out.push(cell.ch),
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Maps a display coordinate onto a cell index; the far edge belongs to the last cell.
fn axis(v: f64, len: usize) -> Option<usize> {
    if len == 0 || !(0.0..=len as f64).contains(&v) {
        return None;
    }
    Some((v as usize).min(len - 1))
}

/// Cells needed to hold `region`, rejecting regions no terminal can show.
pub fn canvas_size(region: &DisplayRegion) -> miette::Result<(usize, usize)> {
    let cols = (region.offset_x + region.width).ceil();
    let rows = (region.offset_y + region.height).ceil();
    if !(cols <= MAX_COLS as f64 && rows <= MAX_ROWS as f64) {
        return Err(miette!(
            "display region {cols}x{rows} exceeds the {MAX_COLS}x{MAX_ROWS} map canvas"
        ));
    }
    Ok((cols.max(0.0) as usize, rows.max(0.0) as usize))
}

pub fn draw_map(monitor: &Monitor) -> miette::Result<Canvas> {
    let mapper = monitor.mapper();
    let (cols, rows) = canvas_size(mapper.region())?;
    let mut canvas = Canvas::new(cols, rows);

    for line in mapper.grid_lines() {
        canvas.line(line.start, line.end, GRID, Some(GRID_COLOR));
    }

    let rect = mapper.display_rect(monitor.zone());
    let zone = Some(ZONE_COLOR);
    canvas.line((rect.left, rect.top), (rect.right, rect.top), '─', zone);
    canvas.line((rect.left, rect.bottom), (rect.right, rect.bottom), '─', zone);
    canvas.line((rect.left, rect.top), (rect.left, rect.bottom), '│', zone);
    canvas.line((rect.right, rect.top), (rect.right, rect.bottom), '│', zone);
    canvas.put((rect.left, rect.top), '┌', zone);
    canvas.put((rect.right, rect.top), '┐', zone);
    canvas.put((rect.left, rect.bottom), '└', zone);
    canvas.put((rect.right, rect.bottom), '┘', zone);

    let tag = monitor.tag();
    for (x, y) in tag.trail().points() {
        canvas.put(mapper.to_display(x, y), TRAIL, Some(TRAIL_COLOR));
    }
    if tag.has_position() {
        let color = if tag.is_in_zone() {
            SAFE_COLOR
        } else {
            UNSAFE_COLOR
        };
        canvas.put(mapper.to_display(tag.x(), tag.y()), TAG, Some(color));
    }
    Ok(canvas)
}

pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    let (hrs, rem) = (secs / 3600, secs % 3600);
    format!("{:02}:{:02}:{:02}", hrs, rem / 60, rem % 60)
}

fn zone_label(in_zone: bool) -> &'static str {
    if in_zone { "● IN ZONE" } else { "● OUT OF ZONE" }
}

pub fn status_line(snapshot: &Snapshot, color: bool) -> String {
    let Some((x, y, _)) = snapshot.position else {
        return format!("[{}]  waiting for data", snapshot.tag_id);
    };
    let label = zone_label(snapshot.in_zone);
    let label = match (color, snapshot.in_zone) {
        (false, _) => label.to_string(),
        (true, true) => SAFE_COLOR.bold().paint(label).to_string(),
        (true, false) => UNSAFE_COLOR.bold().paint(label).to_string(),
    };
    format!(
        "[{}]  X={x:.2}m  Y={y:.2}m  →  {label}  dist={:.2}m",
        snapshot.tag_id, snapshot.distance
    )
}

/// Status and metrics shown under the map.
pub struct Panel<'a> {
    pub snapshot: &'a Snapshot,
    pub uptime: Duration,
    pub clock: String,
    pub sample_rate: f64,
    pub zone_name: &'a str,
}

impl Panel<'_> {
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        let title = |text: &str| {
            if color {
                Style::new()
                    .bold()
                    .on(TITLE_COLOR)
                    .fg(Color::Black)
                    .paint(format!(" {text} "))
                    .to_string()
            } else {
                format!("[ {text} ]")
            }
        };
        let key = |text: &str| {
            if color {
                TITLE_COLOR.bold().paint(text).to_string()
            } else {
                text.to_string()
            }
        };
        let s = self.snapshot;
        let _ = writeln!(out, "{}", title("SYSTEM STATUS"));
        let _ = writeln!(out, "{}", status_line(s, color));
        if let Some((x, y, z)) = s.position {
            let _ = writeln!(
                out,
                "{} x={x:.2}m y={y:.2}m z={z:.2}m",
                key("Position")
            );
        }
        let _ = writeln!(out, "{} {:.2}m", key("Distance"), s.distance);
        let _ = writeln!(out, "{} {}", key("Zone"), self.zone_name);
        let _ = writeln!(out, "{} {}", key("Rotation"), s.rotation);
        let _ = writeln!(out, "{}", title("METRICS"));
        let _ = writeln!(out, "{} {}", key("Uptime"), format_hms(self.uptime));
        let _ = writeln!(out, "{} {}", key("Date/Time"), self.clock);
        let _ = writeln!(out, "{} 1 ({})", key("Tags"), s.tag_id);
        let _ = writeln!(out, "{} {:.1} samples/s", key("Data Rate"), self.sample_rate);
        match s.since_update {
            Some(age) => {
                let _ = writeln!(out, "{} {:.1}s ago", key("Last Update"), age.as_secs_f64());
            }
            None => {
                let _ = writeln!(out, "{} never", key("Last Update"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use safespace::{Config, Rotation, Sample};

    use super::*;

    fn monitor_with(points: &[(f64, f64)]) -> Monitor {
        let mut monitor = Monitor::new(&Config::default()).unwrap();
        for &(x, y) in points {
            monitor.apply(&Sample {
                tag_id: "91B2".to_string(),
                x,
                y,
                z: -0.65,
            });
        }
        monitor
    }

    #[test]
    fn test_axis_clamps_far_edge() {
        assert_eq!(axis(0.0, 10), Some(0));
        assert_eq!(axis(9.99, 10), Some(9));
        assert_eq!(axis(10.0, 10), Some(9));
        assert_eq!(axis(10.5, 10), None);
        assert_eq!(axis(-0.1, 10), None);
        assert_eq!(axis(f64::NAN, 10), None);
    }

    #[test]
    fn test_map_places_tag_and_zone() {
        let monitor = monitor_with(&[(5.70, 6.85)]);
        let canvas = draw_map(&monitor).unwrap();
        let mapper = monitor.mapper();
        assert_eq!(canvas.get(mapper.to_display(5.70, 6.85)), Some(TAG));
        let rect = mapper.display_rect(monitor.zone());
        assert_eq!(canvas.get((rect.left, rect.top)), Some('┌'));
        assert_eq!(canvas.get((rect.right, rect.bottom)), Some('┘'));
        let text = canvas.render(false);
        assert_eq!(text.lines().count(), 30);
        assert!(text.lines().all(|l| l.chars().count() == 56));
    }

    #[test]
    fn test_map_draws_trail() {
        let monitor = monitor_with(&[(2.0, 2.0), (4.0, 2.0), (4.0, 9.0)]);
        let canvas = draw_map(&monitor).unwrap();
        let mapper = monitor.mapper();
        assert_eq!(canvas.get(mapper.to_display(2.0, 2.0)), Some(TRAIL));
        assert_eq!(canvas.get(mapper.to_display(4.0, 9.0)), Some(TAG));
    }

    #[test]
    fn test_rotated_map_keeps_size() {
        let mut monitor = monitor_with(&[(0.2, 0.2)]);
        monitor.set_rotation(Rotation::Deg270);
        let text = draw_map(&monitor).unwrap().render(false);
        assert_eq!(text.lines().count(), 30);
        assert!(text.contains(TAG));
    }

    #[test]
    fn test_oversized_region_rejected() {
        let mut config = Config::default();
        config.map.region.width = 1e9;
        config.map.region.height = 1e9;
        config.validate().unwrap();
        let monitor = Monitor::new(&config).unwrap();
        assert!(canvas_size(monitor.mapper().region()).is_err());
        assert!(draw_map(&monitor).is_err());

        config.map.region.width = MAX_COLS as f64;
        config.map.region.height = MAX_ROWS as f64;
        let monitor = Monitor::new(&config).unwrap();
        assert_eq!(
            canvas_size(monitor.mapper().region()).unwrap(),
            (MAX_COLS, MAX_ROWS)
        );
    }

    #[test]
    fn test_status_line() {
        let monitor = monitor_with(&[]);
        assert_eq!(
            status_line(&monitor.snapshot(), false),
            "[91B2]  waiting for data"
        );
        let monitor = monitor_with(&[(5.70, 6.85)]);
        assert_eq!(
            status_line(&monitor.snapshot(), false),
            "[91B2]  X=5.70m  Y=6.85m  →  ● IN ZONE  dist=0.00m"
        );
        let monitor = monitor_with(&[(0.2, 0.2)]);
        assert!(status_line(&monitor.snapshot(), false).contains("OUT OF ZONE"));
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_hms(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn test_panel() {
        let monitor = monitor_with(&[(5.70, 6.85)]);
        let snapshot = monitor.snapshot_at(Instant::now());
        let panel = Panel {
            snapshot: &snapshot,
            uptime: Duration::from_secs(61),
            clock: "12:00:00".to_string(),
            sample_rate: 9.5,
            zone_name: monitor.zone().name(),
        };
        let text = panel.render(false);
        assert!(text.contains("Uptime 00:01:01"));
        assert!(text.contains("Tags 1 (91B2)"));
        assert!(text.contains("Data Rate 9.5 samples/s"));
        assert!(text.contains("Zone Safespace"));
        assert!(text.contains("Rotation 0°"));
    }
}
