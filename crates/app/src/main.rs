use std::path::PathBuf;

use clap::{Parser, Subcommand};
use face_radio_core::config::{MATRIX_HEIGHT, MOUTH_WIDTH, PANEL_COUNT};
use face_radio_core::{
    Controller, EncoderDriver, FaceRadioError, MatrixDriver, Millis, Settings, SettingsStore,
};
use tracing_subscriber::EnvFilter;

/// Simulated loop period; the firmware polls at roughly this rate.
const TICK_MS: Millis = 50;

fn main() -> face_radio_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { ticks } => run_simulation(ticks),
        Commands::Defaults { output } => dump_defaults(&output),
    }
}

/// Drives the controller against simulated peripherals: a pulse-train audio
/// source, a scripted encoder and an in-memory settings store.
fn run_simulation(ticks: u32) -> face_radio_core::Result<()> {
    tracing::info!(ticks, "starting simulation");

    let mut controller = Controller::new(MemoryStore::default());
    let mut encoder = ScriptedEncoder::default();
    let mut matrix = ConsoleMatrix::new();

    controller.init(&mut matrix, 0)?;
    controller.set_power(true)?;

    let mut beats = 0u32;
    for tick in 0..ticks {
        let now = (tick + 1) * TICK_MS;
        encoder.advance(tick);
        controller.tick(&mut encoder, &mut matrix, audio_sample(tick), now)?;
        if controller.audio().beat() {
            beats += 1;
            tracing::debug!(tick, level = controller.audio().level(), "beat");
        }
    }

    // Exercise the PCM gain stage the way the transport callback would.
    let mut pcm = Vec::new();
    for sample in [12_000_i16, -12_000, 8_000, -8_000] {
        pcm.extend_from_slice(&sample.to_le_bytes());
    }
    controller.gain().process_buffer(&mut pcm);
    let attenuated = i16::from_le_bytes([pcm[0], pcm[1]]);

    tracing::info!(
        beats,
        frames = matrix.flushes,
        volume = controller.settings().volume(),
        effect = controller.settings().visual_effect(),
        attenuated,
        "simulation finished"
    );
    println!("{}", matrix.render_ascii());
    Ok(())
}

/// Writes the first-boot settings as JSON, mostly useful as documentation of
/// the persisted defaults.
fn dump_defaults(output: &PathBuf) -> face_radio_core::Result<()> {
    tracing::info!(?output, "writing default settings");
    let json = serde_json::to_string_pretty(&Settings::default())
        .map_err(|err| FaceRadioError::msg(err.to_string()))?;
    std::fs::write(output, json)?;
    Ok(())
}

/// Quiet carrier with a loud burst every second, so beats actually fire.
fn audio_sample(tick: u32) -> u16 {
    if tick % 20 < 2 {
        3500
    } else {
        700
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Host simulator for the face-radio firmware core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop against simulated peripherals.
    Simulate {
        /// Number of 50 ms loop iterations to run.
        #[arg(short, long, default_value_t = 600)]
        ticks: u32,
    },
    /// Dump the first-boot settings as JSON.
    Defaults {
        /// Output path for the generated JSON file.
        output: PathBuf,
    },
}

/// Flat in-memory stand-in for the settings EEPROM.
struct MemoryStore {
    bytes: [u8; 64],
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { bytes: [0xFF; 64] }
    }
}

impl SettingsStore for MemoryStore {
    fn read_at(&mut self, addr: usize) -> face_radio_core::Result<u8> {
        self.bytes
            .get(addr)
            .copied()
            .ok_or_else(|| FaceRadioError::store(format!("read past end of store: {addr}")))
    }

    fn write_at(&mut self, addr: usize, value: u8) -> face_radio_core::Result<()> {
        match self.bytes.get_mut(addr) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FaceRadioError::store(format!(
                "write past end of store: {addr}"
            ))),
        }
    }

    fn commit(&mut self) -> face_radio_core::Result<()> {
        Ok(())
    }
}

/// Replays a small gesture script: nudge the volume, cycle the effect, then
/// peek at the clock.
#[derive(Default)]
struct ScriptedEncoder {
    rotation: i8,
    clicks: u8,
}

impl ScriptedEncoder {
    fn advance(&mut self, tick: u32) {
        match tick {
            100 | 120 => self.rotation = 1,
            200 => self.clicks = 2,
            400 => self.clicks = 1,
            _ => {}
        }
    }
}

impl EncoderDriver for ScriptedEncoder {
    fn take_rotation(&mut self) -> i8 {
        std::mem::take(&mut self.rotation)
    }

    fn take_clicks(&mut self) -> u8 {
        std::mem::take(&mut self.clicks)
    }

    fn is_held(&self) -> bool {
        false
    }
}

/// Framebuffer-backed matrix driver for terminal output.
struct ConsoleMatrix {
    pixels: [[bool; TOTAL_COLUMNS]; MATRIX_HEIGHT as usize],
    flushes: u32,
}

const TOTAL_COLUMNS: usize = MOUTH_WIDTH + 16;

impl ConsoleMatrix {
    fn new() -> Self {
        Self {
            pixels: [[false; TOTAL_COLUMNS]; MATRIX_HEIGHT as usize],
            flushes: 0,
        }
    }

    fn set(&mut self, x: u8, y: u8, on: bool) {
        let (x, y) = (x as usize, y as usize);
        if x < TOTAL_COLUMNS && y < MATRIX_HEIGHT as usize {
            self.pixels[y][x] = on;
        }
    }

    fn render_ascii(&self) -> String {
        let mut out = String::new();
        for row in &self.pixels {
            for &lit in row.iter() {
                out.push(if lit { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

impl MatrixDriver for ConsoleMatrix {
    fn set_pixel(&mut self, x: u8, y: u8) {
        self.set(x, y, true);
    }

    fn fill_rect(&mut self, x0: u8, y0: u8, x1: u8, y1: u8) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, true);
            }
        }
    }

    fn clear_rect(&mut self, x0: u8, y0: u8, x1: u8, y1: u8) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, false);
            }
        }
    }

    fn line_h(&mut self, y: u8, x0: u8, x1: u8) {
        for x in x0..=x1 {
            self.set(x, y, true);
        }
    }

    fn line_v(&mut self, x: u8, y0: u8, y1: u8) {
        for y in y0..=y1 {
            self.set(x, y, true);
        }
    }

    fn print_glyph(&mut self, x: u8, y: u8, glyph: char) {
        // 3x5 block stand-in; the real panel driver owns the font.
        let _ = glyph;
        for gy in 0..5u8 {
            for gx in 0..3u8 {
                self.set(x + gx, y + gy, true);
            }
        }
    }

    fn set_invert(&mut self, _on: bool) {}

    fn set_brightness(&mut self, levels: &[u8; PANEL_COUNT]) {
        tracing::debug!(?levels, "panel brightness");
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
