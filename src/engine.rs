//! The simulation: a grid, the rules cycling over it and everything the
//! renderers ask about each frame.

use crate::display::DisplayPolicy;
use crate::error::{ConfigError, GridError};
use crate::format::FormatBindings;
use crate::grid::Grid;
use crate::rule::{parse_rules, RuleSequence};
use crate::ticks::TickSelector;
use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Seed value that asks for a generated seed.
pub(crate) const RANDOM_SEED: &str = "-1";

const SEED_LEN: usize = 5;

/// Everything needed to build a [`Simulation`]. Optional parts are
/// explicit `Option`s; [`Simulation::new`] validates the whole thing.
#[derive(Clone, Debug)]
pub(crate) struct SimConfig {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) rule_string: String,
    /// `None` (or `-1`) generates a five letter seed.
    pub(crate) seed: Option<String>,
    pub(crate) flicker_mode: u8,
    /// First tick. Frames are not drawn while the tick is negative.
    pub(crate) start_tick: i64,
    /// Board in the `0`/`1` text form; replaces the random fill.
    pub(crate) initial_state: Option<String>,
    pub(crate) random_fill: bool,
    /// A cell starts alive when its draw exceeds this.
    pub(crate) fill_percentage: f64,
    pub(crate) no_expand: bool,
    pub(crate) post_rule_string: Option<String>,
    pub(crate) post_ticks: u32,
    pub(crate) max_ticks: Option<u64>,
    /// Tick selection for written frames, see [`TickSelector::parse`].
    pub(crate) render_spans: Option<String>,
    pub(crate) render_every: u64,
    pub(crate) paused: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            rule_string: "0145678/3".to_string(),
            seed: None,
            flicker_mode: 0,
            start_tick: 0,
            initial_state: None,
            random_fill: true,
            fill_percentage: 0.5,
            no_expand: false,
            post_rule_string: None,
            post_ticks: 0,
            max_ticks: None,
            render_spans: None,
            render_every: 1,
            paused: false,
        }
    }
}

#[derive(Clone, Debug)]
struct PostProcess {
    rules: RuleSequence,
    rule_string: String,
    ticks: u32,
    grid: Grid,
}

pub(crate) struct Simulation {
    grid: Grid,
    rules: RuleSequence,
    rule_string: String,
    tick: i64,
    seed: String,
    seed_generated: bool,
    paused: bool,
    display: DisplayPolicy,
    post: Option<PostProcess>,
    render_ticks: Option<TickSelector>,
    render_every: i64,
    max_ticks: Option<i64>,
}

impl Simulation {
    pub(crate) fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&config.fill_percentage) {
            return Err(ConfigError::FillPercentage(config.fill_percentage));
        }
        if config.render_every == 0 {
            return Err(ConfigError::RenderEvery);
        }
        let render_every = i64::try_from(config.render_every)
            .map_err(|_| ConfigError::TickOutOfRange(config.render_every))?;
        let max_ticks = match config.max_ticks {
            Some(m) => Some(i64::try_from(m).map_err(|_| ConfigError::TickOutOfRange(m))?),
            None => None,
        };

        let (mut seed, seed_generated) = match config.seed.as_deref() {
            Some(s) if s != RANDOM_SEED => (s.to_string(), false),
            _ => (generate_seed(), true),
        };
        let mut rng = StdRng::seed_from_u64(seed_value(&seed));

        let parsed = parse_rules(&config.rule_string, &mut rng)?;
        info!(
            "rule {} resolved to {} ({} tables)",
            config.rule_string,
            parsed.canonical,
            parsed.sequence.len()
        );

        let post_rules = match &config.post_rule_string {
            Some(s) if config.post_ticks > 0 => {
                Some(parse_rules(s, &mut rng).map_err(ConfigError::PostRule)?)
            }
            _ => None,
        };

        let grid = match &config.initial_state {
            Some(text) => {
                seed.push('?');
                initial_grid(text.parse()?, config)
            }
            None if config.random_fill => {
                Grid::random(config.width, config.height, config.fill_percentage, &mut rng)
            }
            None => Grid::new(config.width, config.height),
        };

        let render_ticks = match &config.render_spans {
            Some(spans) => {
                let selector = TickSelector::parse(spans, config.max_ticks)?;
                info!(
                    "{} ticks selected for frame output, first {:?}",
                    selector.len(),
                    selector.iter().next()
                );
                Some(selector)
            }
            None => None,
        };

        let alive = grid.population();
        let display = DisplayPolicy::new(config.flicker_mode, alive, grid.total() - alive);

        let post = post_rules.map(|parsed| PostProcess {
            grid: derive_post_state(&grid, &parsed.sequence, config.post_ticks),
            rules: parsed.sequence,
            rule_string: parsed.canonical,
            ticks: config.post_ticks,
        });

        info!(
            "{}x{} board, seed {}, {} alive",
            grid.width(),
            grid.height(),
            seed,
            alive
        );

        Ok(Self {
            grid,
            rules: parsed.sequence,
            rule_string: parsed.canonical,
            tick: config.start_tick,
            seed,
            seed_generated,
            paused: config.paused,
            display,
            post,
            render_ticks,
            render_every,
            max_ticks,
        })
    }

    /// Advances one tick. Does nothing while paused.
    pub(crate) fn step(&mut self) {
        if self.paused {
            return;
        }
        self.advance();
    }

    /// Advances one tick even while paused.
    pub(crate) fn advance(&mut self) {
        self.grid = self.grid.step(&self.rules, self.tick);
        self.tick += 1;
        if let Some(post) = &mut self.post {
            post.grid = derive_post_state(&self.grid, &post.rules, post.ticks);
        }
    }

    pub(crate) fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Board to show: the post-processed one when post-processing is on.
    pub(crate) fn display_grid(&self) -> &Grid {
        match &self.post {
            Some(post) => &post.grid,
            None => &self.grid,
        }
    }

    pub(crate) fn tick(&self) -> i64 {
        self.tick
    }

    pub(crate) fn rule_string(&self) -> &str {
        &self.rule_string
    }

    pub(crate) fn post_rule_string(&self) -> Option<&str> {
        self.post.as_ref().map(|p| p.rule_string.as_str())
    }

    pub(crate) fn seed(&self) -> &str {
        &self.seed
    }

    pub(crate) fn seed_generated(&self) -> bool {
        self.seed_generated
    }

    pub(crate) fn cells_alive(&self) -> usize {
        self.grid.population()
    }

    pub(crate) fn cells_total(&self) -> usize {
        self.grid.total()
    }

    pub(crate) fn cells_dead(&self) -> usize {
        self.cells_total() - self.cells_alive()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub(crate) fn flicker_mode(&self) -> u8 {
        self.display.mode()
    }

    pub(crate) fn cycle_flicker_mode(&mut self) {
        self.display.cycle_mode();
        debug!("flicker mode {}", self.display.mode());
    }

    /// True once the tick has reached `max_ticks`. The frame for that
    /// tick is still due, so check this after rendering.
    pub(crate) fn finished(&self) -> bool {
        self.max_ticks.map_or(false, |m| self.tick >= m)
    }

    /// Whether the terminal view should draw this tick.
    pub(crate) fn should_draw(&self) -> bool {
        !self.paused && self.tick >= 0 && self.tick % self.render_every == 0
    }

    /// Whether this tick is one of the selected frame ticks.
    pub(crate) fn is_selected_tick(&self) -> bool {
        self.render_ticks
            .as_ref()
            .map_or(false, |sel| sel.contains(self.tick))
    }

    /// Whether a frame file should be written for this tick.
    pub(crate) fn should_render_image(&self) -> bool {
        !self.paused && self.is_selected_tick()
    }

    /// Asks the flicker policy about the current frame. Call once per
    /// rendered frame and share the answer between renderers.
    pub(crate) fn frame_inverted(&mut self) -> bool {
        let alive = self.cells_alive();
        let dead = self.cells_total() - alive;
        self.display.should_invert(alive, dead, self.tick)
    }

    pub(crate) fn bindings(&self, inverted: bool) -> FormatBindings<'_> {
        FormatBindings {
            rule: &self.rule_string,
            width: self.grid.width(),
            height: self.grid.height(),
            flicker_mode: self.display.mode(),
            flicker_letter: self.display.letter(),
            seed: &self.seed,
            tick: self.tick,
            inverted,
            selected: self.is_selected_tick(),
            post: self
                .post
                .as_ref()
                .map(|p| (p.rule_string.as_str(), p.ticks)),
        }
    }
}

/// Runs `rules` over a copy of `grid` for `ticks` ticks starting at tick 0.
pub(crate) fn derive_post_state(grid: &Grid, rules: &RuleSequence, ticks: u32) -> Grid {
    let mut out = grid.clone();
    for t in 0..ticks {
        out = out.step(rules, i64::from(t));
    }
    out
}

/// Centres a smaller state in the configured board, or keeps the
/// state's own dimensions when it does not fit or expansion is off.
fn initial_grid(state: Grid, config: &SimConfig) -> Grid {
    if config.no_expand {
        return state;
    }
    match state.expand(config.width, config.height) {
        Ok(grid) => grid,
        Err(err @ GridError::DimensionMismatch { .. }) => {
            if (state.width(), state.height()) != (config.width, config.height) {
                warn!("{err}; using the state's own dimensions");
            }
            state
        }
        Err(err) => {
            warn!("{err}; using the state as given");
            state
        }
    }
}

fn generate_seed() -> String {
    let letters: Vec<char> = ('A'..='Z').collect();
    letters
        .choose_multiple(&mut rand::thread_rng(), SEED_LEN)
        .collect()
}

/// FNV-1a over the seed bytes, so a seed string maps to the same RNG
/// stream on every platform and build.
fn seed_value(seed: &str) -> u64 {
    seed.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}
