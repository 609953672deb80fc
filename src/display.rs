//! Flicker modes: when to draw a frame with its colors swapped.

/// Number of flicker modes; modes cycle through `0..FLICKER_MODES`.
pub(crate) const FLICKER_MODES: u8 = 4;

#[derive(Clone, Debug)]
pub(crate) struct DisplayPolicy {
    mode: u8,
    previous_alive: usize,
    previous_dead: usize,
}

impl DisplayPolicy {
    /// `alive`/`dead` are the population of the board before any step.
    pub(crate) fn new(mode: u8, alive: usize, dead: usize) -> Self {
        Self {
            mode: mode % FLICKER_MODES,
            previous_alive: alive,
            previous_dead: dead,
        }
    }

    pub(crate) fn mode(&self) -> u8 {
        self.mode
    }

    /// Letter shown for the mode: `X` when off, otherwise `A`, `B`, `C`.
    pub(crate) fn letter(&self) -> char {
        match self.mode {
            0 => 'X',
            m => char::from(b'A' + m - 1),
        }
    }

    pub(crate) fn cycle_mode(&mut self) {
        self.mode = (self.mode + 1) % FLICKER_MODES;
    }

    /// Whether the frame at `tick` should be drawn inverted.
    ///
    /// Modes 1 and 2 compare the current population against the sample
    /// taken at the previous call and then store the current one, so
    /// each call must correspond to exactly one rendered frame.
    pub(crate) fn should_invert(&mut self, alive: usize, dead: usize, tick: i64) -> bool {
        match self.mode {
            1 | 2 => {
                let corr_true = self.previous_alive as i64 - alive as i64;
                let corr_false = match self.mode {
                    1 => self.previous_alive as i64 - dead as i64,
                    _ => self.previous_dead as i64 - dead as i64,
                };
                self.previous_alive = alive;
                self.previous_dead = dead;
                corr_false > corr_true
            }
            3 => tick.rem_euclid(2) == 0,
            _ => false,
        }
    }
}
