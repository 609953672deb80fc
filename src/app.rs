use crate::config::Args;
use crate::engine::Simulation;
use crate::format::expand;
use crate::render::{frame_lines, Caption, FrameWriter, TermGuard};
use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal,
};
use log::{info, warn};
use simple_logger::SimpleLogger;
use std::time::{Duration, Instant};

/// Terminal size assumed when there is no terminal to ask.
const FALLBACK_SIZE: (u16, u16) = (80, 24);

struct App {
    args: Args,
    sim: Simulation,
    tiles: [char; 2],
    frames: Option<FrameWriter>,
}

/// How the main loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exit {
    Done,
    Quit,
    Recover,
}

/// What a key press asks of the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Redraw,
    Stop(Exit),
}

pub(crate) fn run() -> Result<()> {
    let args = Args::parse();
    SimpleLogger::new()
        .with_level(args.log_level)
        .init()
        .context("could not start logger")?;

    let term_size = terminal::size().unwrap_or_else(|err| {
        warn!("no terminal size ({err}), assuming {}x{}", FALLBACK_SIZE.0, FALLBACK_SIZE.1);
        FALLBACK_SIZE
    });

    let mut app = App::new(args, term_size)?;
    let exit = if app.args.headless {
        app.run_headless()?
    } else {
        app.run_terminal()?
    };

    info!(
        "stopped at tick {} with {} alive, {} dead ({:?})",
        app.sim.tick(),
        app.sim.cells_alive(),
        app.sim.cells_dead(),
        exit
    );
    if exit == Exit::Recover {
        println!(
            "\nTo recover from this configuration, run:\n\n{}",
            recover_command(&app.args, &app.sim)
        );
    }
    Ok(())
}

impl App {
    fn new(args: Args, term_size: (u16, u16)) -> Result<Self> {
        let config = args.sim_config(term_size)?;
        let sim = Simulation::new(&config).context("invalid simulation settings")?;
        let tiles = args.tiles()?;
        let frames = match args.render_images {
            Some(_) => Some(FrameWriter::new(&args.image_dir, args.zoom, load_caption(&args))?),
            None => None,
        };
        Ok(Self {
            args,
            sim,
            tiles,
            frames,
        })
    }

    fn run_headless(&mut self) -> Result<Exit> {
        if self.args.max_ticks.is_none() {
            bail!("--headless needs --max-ticks");
        }
        if self.sim.is_paused() {
            bail!("--headless cannot start paused");
        }
        loop {
            if self.sim.should_render_image() {
                let inverted = self.sim.frame_inverted();
                self.write_frame(inverted)?;
            }
            if self.sim.finished() {
                return Ok(Exit::Done);
            }
            self.sim.step();
        }
    }

    fn run_terminal(&mut self) -> Result<Exit> {
        let mut term = TermGuard::new().context("could not set up the terminal")?;
        let dt = Duration::from_millis(self.args.ms.max(1));
        let mut last = Instant::now();
        let mut redraw = true;
        let mut inverted = false;
        let mut shown: Option<i64> = None;
        let mut saved: Option<i64> = None;

        loop {
            if event::poll(Duration::from_millis(1))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind == KeyEventKind::Press {
                        match self.on_key(k.code) {
                            Control::Stop(exit) => return Ok(exit),
                            Control::Redraw => redraw = true,
                            Control::Continue => {}
                        }
                    }
                }
            }

            if !redraw && last.elapsed() < dt {
                continue;
            }
            last = Instant::now();

            // a redraw shows the board even while paused
            let tick = self.sim.tick();
            let draw = self.sim.should_draw() || redraw;
            let save = self.sim.should_render_image() && saved != Some(tick);
            if draw || save {
                if shown != Some(tick) {
                    inverted = self.sim.frame_inverted();
                    shown = Some(tick);
                }
                if draw {
                    let lines = frame_lines(self.sim.display_grid(), self.tiles, inverted);
                    let subtitle = self
                        .args
                        .subtitle_format()
                        .map(|fmt| expand(fmt, &self.sim.bindings(inverted)));
                    term.draw(&lines, subtitle.as_deref())?;
                }
                if save {
                    self.write_frame(inverted)?;
                    saved = Some(tick);
                }
            }

            if self.sim.finished() {
                return Ok(Exit::Done);
            }
            if !redraw {
                self.sim.step();
            }
            redraw = false;
        }
    }

    fn on_key(&mut self, code: KeyCode) -> Control {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Control::Stop(Exit::Quit),
            KeyCode::Char('r') => Control::Stop(Exit::Recover),
            KeyCode::Char(' ') => {
                self.sim.toggle_pause();
                Control::Redraw
            }
            KeyCode::Char('f') => {
                self.sim.cycle_flicker_mode();
                Control::Redraw
            }
            KeyCode::Char('s') if self.sim.is_paused() => {
                self.sim.advance();
                Control::Redraw
            }
            _ => Control::Continue,
        }
    }

    fn write_frame(&self, inverted: bool) -> Result<()> {
        if let Some(frames) = &self.frames {
            let bindings = self.sim.bindings(inverted);
            let name = expand(&self.args.image_format, &bindings);
            let subtitle = self.args.subtitle_format().map(|fmt| expand(fmt, &bindings));
            frames.write(self.sim.display_grid(), inverted, &name, subtitle.as_deref())?;
        }
        Ok(())
    }
}

/// Subtitle font for saved frames. A font that cannot be loaded only
/// costs the subtitle.
fn load_caption(args: &Args) -> Option<Caption> {
    let path = args.font_path.as_ref()?;
    if args.no_subtitle {
        return None;
    }
    match Caption::load(path, args.font_size) {
        Ok(caption) => Some(caption),
        Err(err) => {
            warn!("{err:#}; frames are saved without subtitles");
            None
        }
    }
}

/// Command line reproducing the current run from its present board.
///
/// Only options that differ from their defaults are listed. The rule is
/// the resolved one, so random directives are not redrawn.
pub(crate) fn recover_command(args: &Args, sim: &Simulation) -> String {
    let defaults = Args::parse_from(["rulecell"]);
    let mut parts = vec!["rulecell".to_string()];
    let mut push = |flag: &str, value: String| parts.push(format!("{flag} {}", quote(&value)));

    if args.dimensions != defaults.dimensions {
        push("--dimensions", args.dimensions.clone());
    }
    push("--rules", sim.rule_string().to_string());
    if args.tiles != defaults.tiles {
        push("--tiles", args.tiles.clone());
    }
    if args.seed != defaults.seed || sim.seed_generated() {
        push("--seed", sim.seed().trim_end_matches('?').to_string());
    }
    if args.fill != defaults.fill {
        push("--fill", args.fill.to_string());
    }
    push("--flicker-mode", sim.flicker_mode().to_string());
    push("--tick", sim.tick().to_string());
    if let Some(m) = args.max_ticks {
        push("--max-ticks", m.to_string());
    }
    if args.render_every != defaults.render_every {
        push("--render-every", args.render_every.to_string());
    }
    if let Some(post) = sim.post_rule_string() {
        push("--post-rules", post.to_string());
        push("--post-ticks", args.post_ticks.to_string());
    }
    if let Some(spans) = &args.render_images {
        push("--render-images", spans.clone());
    }
    if args.image_dir != defaults.image_dir {
        push("--image-dir", args.image_dir.display().to_string());
    }
    if args.image_format != defaults.image_format {
        push("--image-format", args.image_format.clone());
    }
    if args.zoom != defaults.zoom {
        push("--zoom", args.zoom.to_string());
    }
    if let Some(font) = &args.font_path {
        push("--font-path", font.display().to_string());
    }
    if args.font_size != defaults.font_size {
        push("--font-size", args.font_size.to_string());
    }
    if args.subtitle != defaults.subtitle {
        push("--subtitle", args.subtitle.clone());
    }
    if args.ms != defaults.ms {
        push("--ms", args.ms.to_string());
    }
    push("--board", sim.grid().serialize());
    if args.no_subtitle {
        parts.push("--no-subtitle".to_string());
    }
    parts.push("--no-expand".to_string());
    parts.join(" \\\n    ")
}

/// Single quotes a value when the shell would otherwise split or expand it.
fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/,.:-_+x".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RANDOM_SEED;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("23/3,2x/3"), "23/3,2x/3");
        assert_eq!(quote("-1:-5"), "-1:-5");
        assert_eq!(quote(" #"), "' #'");
        assert_eq!(quote("%T %r"), "'%T %r'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_recover_command_round_trips() {
        let args = parse(&[
            "rulecell", "-d", "6x5", "-r", "13+13", "-e", "SEEDY", "-t", ".o", "--ms", "20",
        ]);
        let mut sim = Simulation::new(&args.sim_config((80, 24)).unwrap()).unwrap();
        sim.step();
        sim.step();

        let cmd = recover_command(&args, &sim);
        assert!(!cmd.contains('+'));
        assert!(cmd.contains("--seed SEEDY"));
        assert!(cmd.contains("--tick 2"));
        assert!(cmd.contains("--tiles '.o'") || cmd.contains("--tiles .o"));

        // feed the printed command back through the parser
        let argv: Vec<String> = cmd
            .replace(" \\\n    ", " ")
            .split(' ')
            .map(|s| s.trim_matches('\'').to_string())
            .collect();
        let again = Args::try_parse_from(&argv).unwrap();
        let restored = Simulation::new(&again.sim_config((80, 24)).unwrap()).unwrap();
        assert_eq!(restored.grid(), sim.grid());
        assert_eq!(restored.rule_string(), sim.rule_string());
        assert_eq!(restored.tick(), sim.tick());
    }

    #[test]
    fn test_headless_writes_final_tick() {
        let dir = std::env::temp_dir().join(format!("rulecell-headless-{}", std::process::id()));
        let dir_arg = dir.display().to_string();
        let args = parse(&[
            "rulecell", "-d", "5x5", "--headless", "-m", "4", "-i", "1,-1", "--image-format",
            "%T.png", "--image-dir", dir_arg.as_str(), "--font-path", "/no/such/font.ttf",
        ]);
        let mut app = App::new(args, (80, 24)).unwrap();
        assert_eq!(app.run_headless().unwrap(), Exit::Done);
        assert_eq!(app.sim.tick(), 4);

        let mut written: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        assert_eq!(written, vec!["00000001.png", "00000004.png"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_headless_refuses_endless_runs() {
        let mut unbounded =
            App::new(parse(&["rulecell", "-d", "4x4", "--headless"]), (80, 24)).unwrap();
        assert!(unbounded.run_headless().is_err());
        let mut paused =
            App::new(parse(&["rulecell", "-d", "4x4", "-m", "3", "-p"]), (80, 24)).unwrap();
        assert!(paused.run_headless().is_err());
    }

    #[test]
    fn test_keys_while_paused_redraw() {
        let args = parse(&["rulecell", "-d", "4x4", "-p", "-e", "KEYS"]);
        let mut app = App::new(args, (80, 24)).unwrap();

        assert_eq!(app.on_key(KeyCode::Char('f')), Control::Redraw);
        assert_eq!(app.sim.flicker_mode(), 1);
        assert_eq!(app.on_key(KeyCode::Char('s')), Control::Redraw);
        assert_eq!(app.sim.tick(), 1);
        assert_eq!(app.on_key(KeyCode::Char(' ')), Control::Redraw);
        assert!(!app.sim.is_paused());
        assert_eq!(app.on_key(KeyCode::Char('s')), Control::Continue);
        assert_eq!(app.sim.tick(), 1);
        assert_eq!(app.on_key(KeyCode::Esc), Control::Stop(Exit::Quit));
        assert_eq!(app.on_key(KeyCode::Char('r')), Control::Stop(Exit::Recover));
    }

    #[test]
    fn test_recover_names_generated_seed() {
        let args = parse(&["rulecell", "-d", "4x4"]);
        let sim = Simulation::new(&args.sim_config((80, 24)).unwrap()).unwrap();
        assert_eq!(args.seed, RANDOM_SEED);
        let cmd = recover_command(&args, &sim);
        assert!(cmd.contains(&format!("--seed {}", sim.seed())));
    }
}
