use crate::engine::{SimConfig, RANDOM_SEED};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// Rows kept free below the board for the subtitle and the cursor.
const SUBTITLE_ROWS: u16 = 3;
const BARE_ROWS: u16 = 2;

/// Cellular automata on a wrapping grid, driven by rule strings.
///
/// A rule is `<alive digits>/<dead digits>`: an alive cell with a listed
/// neighbour count dies, a dead cell with a listed count is born.
/// Rules can be chained with `,`, repeated with `Nx` and drawn at random
/// with `AB+CD`.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version)]
pub(crate) struct Args {
    /// board size as WxH; M fits that side to the terminal
    #[arg(short, long, default_value = "MxM")]
    pub(crate) dimensions: String,

    /// rule string, e.g. 0145678/3 or 23/3,2x/3 or 13+13
    #[arg(short, long, default_value = "0145678/3", allow_hyphen_values = true)]
    pub(crate) rules: String,

    /// two characters drawn for dead and alive cells
    #[arg(short, long, default_value = " #")]
    pub(crate) tiles: String,

    /// seed string; -1 generates one
    #[arg(short = 'e', long, default_value = RANDOM_SEED, allow_hyphen_values = true)]
    pub(crate) seed: String,

    /// initial board as rows of 0/1 separated by '.'
    #[arg(short, long)]
    pub(crate) board: Option<String>,

    /// keep the initial board's own size instead of centring it
    #[arg(long, default_value_t = false)]
    pub(crate) no_expand: bool,

    /// start with an all-dead board instead of a random one
    #[arg(long, default_value_t = false)]
    pub(crate) empty: bool,

    /// a cell starts alive when a random draw exceeds this
    #[arg(long, default_value_t = 0.5)]
    pub(crate) fill: f64,

    /// flicker mode 0-3 (0 off, 3 strobe)
    #[arg(short, long, default_value_t = 0)]
    pub(crate) flicker_mode: u8,

    /// first tick; frames are hidden while negative
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub(crate) tick: i64,

    /// stop after this many ticks
    #[arg(short, long)]
    pub(crate) max_ticks: Option<u64>,

    /// draw every Nth tick
    #[arg(long, default_value_t = 1)]
    pub(crate) render_every: u64,

    /// secondary rule applied to a copy of each frame before display
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) post_rules: Option<String>,

    /// ticks of the secondary rule per frame
    #[arg(long, default_value_t = 0)]
    pub(crate) post_ticks: u32,

    /// ticks to save as images, e.g. 0,10:20,-50:-1:5
    #[arg(short = 'i', long, allow_hyphen_values = true)]
    pub(crate) render_images: Option<String>,

    /// directory for saved images
    #[arg(long, default_value = "frames")]
    pub(crate) image_dir: PathBuf,

    /// image file name template (see %-tokens)
    #[arg(long, default_value = "%R/%S/%T.png")]
    pub(crate) image_format: String,

    /// pixels per cell in saved images
    #[arg(long, default_value_t = 4)]
    pub(crate) zoom: u32,

    /// TrueType/OpenType font for subtitles in saved images
    #[arg(long)]
    pub(crate) font_path: Option<PathBuf>,

    /// subtitle height in pixels in saved images
    #[arg(long, default_value_t = 16)]
    pub(crate) font_size: u32,

    /// subtitle template shown under the board
    #[arg(short, long, default_value = "%T %r %s %a%i%o")]
    pub(crate) subtitle: String,

    /// hide the subtitle
    #[arg(long, default_value_t = false)]
    pub(crate) no_subtitle: bool,

    /// milliseconds between ticks
    #[arg(long, default_value_t = 100)]
    pub(crate) ms: u64,

    /// start paused
    #[arg(short, long, default_value_t = false)]
    pub(crate) paused: bool,

    /// run without the terminal view (needs --max-ticks)
    #[arg(long, default_value_t = false)]
    pub(crate) headless: bool,

    /// log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub(crate) log_level: LevelFilter,
}

impl Args {
    /// Builds the simulation settings. `term_size` resolves `M` sides.
    pub(crate) fn sim_config(&self, term_size: (u16, u16)) -> Result<SimConfig> {
        let (width, height) = parse_dimensions(&self.dimensions, self.no_subtitle, term_size)?;
        Ok(SimConfig {
            width,
            height,
            rule_string: self.rules.clone(),
            seed: Some(self.seed.clone()),
            flicker_mode: self.flicker_mode,
            start_tick: self.tick,
            initial_state: self.board.clone(),
            random_fill: !self.empty,
            fill_percentage: self.fill,
            no_expand: self.no_expand,
            post_rule_string: self.post_rules.clone(),
            post_ticks: self.post_ticks,
            max_ticks: self.max_ticks,
            render_spans: self.render_images.clone(),
            render_every: self.render_every,
            paused: self.paused,
        })
    }

    pub(crate) fn tiles(&self) -> Result<[char; 2]> {
        let chars: Vec<char> = self.tiles.chars().collect();
        match chars[..] {
            [dead, alive] => Ok([dead, alive]),
            _ => bail!("tiles must be exactly two characters, got {:?}", self.tiles),
        }
    }

    pub(crate) fn subtitle_format(&self) -> Option<&str> {
        (!self.no_subtitle).then_some(self.subtitle.as_str())
    }
}

/// Parses `WxH`. An `M` side takes the terminal's columns or its rows
/// minus the space needed below the board.
pub(crate) fn parse_dimensions(
    dimensions: &str,
    no_subtitle: bool,
    (cols, lines): (u16, u16),
) -> Result<(usize, usize)> {
    let (w, h) = dimensions
        .split_once('x')
        .with_context(|| format!("dimensions {dimensions:?} must look like WxH"))?;
    let reserved = if no_subtitle { BARE_ROWS } else { SUBTITLE_ROWS };

    let side = |s: &str, fit: u16| -> Result<usize> {
        let n = if s == "M" {
            usize::from(fit)
        } else {
            s.parse::<usize>()
                .with_context(|| format!("bad dimension {s:?} in {dimensions:?}"))?
        };
        if n == 0 {
            bail!("dimensions {dimensions:?} leave an empty board");
        }
        Ok(n)
    };
    Ok((side(w, cols)?, side(h, lines.saturating_sub(reserved))?))
}
