//! Toroidal boolean grid.

use crate::error::GridError;
use crate::rule::RuleSequence;
use rand::Rng;
use std::str::FromStr;

/// Separates rows in the textual grid form.
pub(crate) const ROW_SEPARATOR: char = '.';

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Grid {
    w: usize,
    h: usize,
    cells: Vec<bool>,
}

impl Grid {
    /// All-dead grid. Both dimensions are at least 1.
    pub(crate) fn new(w: usize, h: usize) -> Self {
        let (w, h) = (w.max(1), h.max(1));
        Self {
            w,
            h,
            cells: vec![false; w * h],
        }
    }

    /// A cell is alive when its draw exceeds `fill_percentage`.
    pub(crate) fn random<R: Rng + ?Sized>(
        w: usize,
        h: usize,
        fill_percentage: f64,
        rng: &mut R,
    ) -> Self {
        let mut grid = Self::new(w, h);
        for cell in &mut grid.cells {
            *cell = rng.gen::<f64>() > fill_percentage;
        }
        grid
    }

    pub(crate) fn width(&self) -> usize {
        self.w
    }

    pub(crate) fn height(&self) -> usize {
        self.h
    }

    fn idx(&self, x: isize, y: isize) -> usize {
        let x = x.rem_euclid(self.w as isize) as usize;
        let y = y.rem_euclid(self.h as isize) as usize;
        y * self.w + x
    }

    pub(crate) fn get(&self, x: isize, y: isize) -> bool {
        self.cells[self.idx(x, y)]
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.cells.chunks(self.w)
    }

    /// Live cells among the 8 surrounding `(x, y)`, wrapping at every edge.
    ///
    /// Only the centre offset is skipped, so on grids narrower than 3 a
    /// cell can count itself through the wrap.
    pub(crate) fn neighbour_count(&self, x: usize, y: usize) -> u8 {
        let mut n = 0u8;
        for dy in [-1isize, 0, 1] {
            for dx in [-1isize, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if self.get(x as isize + dx, y as isize + dy) {
                    n += 1;
                }
            }
        }
        n
    }

    /// Next generation under the table active at `tick`. Every cell reads
    /// from `self`, so updates never see each other.
    pub(crate) fn step(&self, rules: &RuleSequence, tick: i64) -> Grid {
        let table = rules.at(tick);
        let mut next = self.clone();
        for y in 0..self.h {
            for x in 0..self.w {
                let i = y * self.w + x;
                next.cells[i] = table.next_state(self.cells[i], self.neighbour_count(x, y));
            }
        }
        next
    }

    pub(crate) fn population(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub(crate) fn total(&self) -> usize {
        self.cells.len()
    }

    /// Centres this grid's pattern in an all-dead `w`x`h` grid.
    ///
    /// Even target dimensions shift the pattern one cell towards the
    /// origin. The target must be strictly larger in both dimensions.
    pub(crate) fn expand(&self, w: usize, h: usize) -> Result<Grid, GridError> {
        if self.w >= w || self.h >= h {
            return Err(GridError::DimensionMismatch {
                state_w: self.w,
                state_h: self.h,
                width: w,
                height: h,
            });
        }
        let w_even = usize::from(w % 2 == 0);
        let h_even = usize::from(h % 2 == 0);
        let x_off = w / 2 - (self.w / 2 + w_even);
        let y_off = h / 2 - (self.h / 2 + h_even);

        let mut out = Grid::new(w, h);
        for y in 0..self.h {
            for x in 0..self.w {
                if self.cells[y * self.w + x] {
                    out.cells[(y + y_off) * w + x + x_off] = true;
                }
            }
        }
        Ok(out)
    }

    /// Rows of `0`/`1` joined by [`ROW_SEPARATOR`]. Parses back with
    /// [`Grid::from_str`].
    pub(crate) fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.h);
        for (y, row) in self.rows().enumerate() {
            if y > 0 {
                out.push(ROW_SEPARATOR);
            }
            out.extend(row.iter().map(|&c| if c { '1' } else { '0' }));
        }
        out
    }
}

impl FromStr for Grid {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(s.len());
        let mut w = 0;
        let mut h = 0;
        for (row, line) in s.split(ROW_SEPARATOR).enumerate() {
            let start = cells.len();
            for ch in line.chars() {
                match ch {
                    '0' => cells.push(false),
                    '1' => cells.push(true),
                    _ => return Err(GridError::BadCell { row, ch }),
                }
            }
            let got = cells.len() - start;
            if row == 0 {
                if got == 0 {
                    return Err(GridError::Empty);
                }
                w = got;
            } else if got != w {
                return Err(GridError::RaggedRow {
                    row,
                    got,
                    expected: w,
                });
            }
            h += 1;
        }
        Ok(Self { w, h, cells })
    }
}
