use crate::grid::Grid;
use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use crossterm::{
    cursor, execute, queue,
    style::{Print, ResetColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use image::{GrayImage, Luma};
use log::debug;
use std::{
    fs,
    io::{self, Stdout, Write},
    path::{Path, PathBuf},
};

const ON: Luma<u8> = Luma([255]);
const OFF: Luma<u8> = Luma([0]);

/// One string per board row, `tiles[0]` for dead and `tiles[1]` for
/// alive cells (swapped when inverted).
pub(crate) fn frame_lines(grid: &Grid, tiles: [char; 2], inverted: bool) -> Vec<String> {
    grid.rows()
        .map(|row| {
            row.iter()
                .map(|&alive| tiles[usize::from(alive != inverted)])
                .collect()
        })
        .collect()
}

/// Board as a grayscale image, `zoom` pixels per cell, white for alive.
/// `band` blank rows are added below the board.
pub(crate) fn frame_image(grid: &Grid, inverted: bool, zoom: u32, band: u32) -> GrayImage {
    let z = zoom.max(1);
    let board_h = grid.height() as u32 * z;
    GrayImage::from_fn(grid.width() as u32 * z, board_h + band, |x, y| {
        if y >= board_h {
            return OFF;
        }
        let alive = grid.get((x / z) as isize, (y / z) as isize);
        if alive != inverted {
            ON
        } else {
            OFF
        }
    })
}

/// Font used to draw subtitles into saved frames.
pub(crate) struct Caption {
    font: FontVec,
    size: u32,
}

impl Caption {
    pub(crate) fn load(path: &Path, size: u32) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("could not read font {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .with_context(|| format!("{} is not a usable font", path.display()))?;
        Ok(Self {
            font,
            size: size.max(1),
        })
    }

    /// Height of the band the caption needs under the board.
    pub(crate) fn height(&self) -> u32 {
        self.size
    }

    /// Draws `text` on one line starting at row `top`. Pixels more than
    /// half covered are lit; glyphs past the right edge are clipped.
    pub(crate) fn draw(&self, img: &mut GrayImage, top: u32, text: &str) {
        let scale = PxScale::from(self.size as f32);
        let scaled = self.font.as_scaled(scale);
        let baseline = top as f32 + scaled.ascent();
        let (w, h) = img.dimensions();
        let mut x = 0.0;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(x, baseline));
            x += scaled.h_advance(id);
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                let inside = (0..i64::from(w)).contains(&px) && (0..i64::from(h)).contains(&py);
                if coverage > 0.5 && inside {
                    img.put_pixel(px as u32, py as u32, ON);
                }
            });
        }
    }
}

/// Alternate screen in raw mode, restored on drop.
pub(crate) struct TermGuard {
    out: Stdout,
}

impl TermGuard {
    pub(crate) fn new() -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            EnterAlternateScreen,
            DisableLineWrap,
            cursor::Hide,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(Self { out })
    }

    pub(crate) fn draw(&mut self, lines: &[String], subtitle: Option<&str>) -> io::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate, ResetColor)?;
        for (y, line) in lines.iter().enumerate() {
            queue!(self.out, cursor::MoveTo(0, y as u16), Print(line))?;
        }
        if let Some(text) = subtitle {
            queue!(
                self.out,
                cursor::MoveTo(0, lines.len() as u16 + 1),
                Clear(ClearType::CurrentLine),
                Print(text)
            )?;
        }
        queue!(self.out, EndSynchronizedUpdate)?;
        self.out.flush()
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            EndSynchronizedUpdate,
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Writes selected frames as PNG files under `dir`.
pub(crate) struct FrameWriter {
    dir: PathBuf,
    zoom: u32,
    caption: Option<Caption>,
}

impl FrameWriter {
    pub(crate) fn new(dir: &Path, zoom: u32, caption: Option<Caption>) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create image directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            zoom,
            caption,
        })
    }

    /// `name` may contain `/`; missing directories are created. The
    /// subtitle is drawn under the board when a caption font is loaded.
    pub(crate) fn write(
        &self,
        grid: &Grid,
        inverted: bool,
        name: &str,
        subtitle: Option<&str>,
    ) -> Result<PathBuf> {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        let img = match (&self.caption, subtitle) {
            (Some(caption), Some(text)) => {
                let mut img = frame_image(grid, inverted, self.zoom, caption.height());
                let top = grid.height() as u32 * self.zoom.max(1);
                caption.draw(&mut img, top, text);
                img
            }
            _ => frame_image(grid, inverted, self.zoom, 0),
        };
        img.save(&path)
            .with_context(|| format!("could not write frame {}", path.display()))?;
        debug!("wrote {}", path.display());
        Ok(path)
    }
}
