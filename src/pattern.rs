//! The editable 16 x 16 beat grid.

use crate::error::{Error, Result};

/// Number of instrument rows.
pub const TRACKS: usize = 16;

/// Number of sixteenth-note steps per row.
pub const STEPS: usize = 16;

/// Total number of cells, and the length of the flat track-major form.
pub const CELL_COUNT: usize = TRACKS * STEPS;

/// On/off state for every (track, beat) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pattern {
    cells: [[bool; STEPS]; TRACKS],
}

fn check(track: usize, beat: usize) -> Result<()> {
    if track < TRACKS && beat < STEPS {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { track, beat })
    }
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pattern from a flat track-major slice.
    ///
    /// Anything other than exactly [`CELL_COUNT`] flags is rejected.
    pub fn from_flags(flags: &[bool]) -> Result<Self> {
        let values: [bool; CELL_COUNT] = flags.try_into().map_err(|_| {
            Error::InvalidPersistedData(format!(
                "expected {} cells, got {}",
                CELL_COUNT,
                flags.len()
            ))
        })?;
        let mut pattern = Self::new();
        pattern.set_all(values);
        Ok(pattern)
    }

    /// Flip a cell, returning its new state.
    pub fn toggle(&mut self, track: usize, beat: usize) -> Result<bool> {
        check(track, beat)?;
        let cell = &mut self.cells[track][beat];
        *cell = !*cell;
        Ok(*cell)
    }

    pub fn get(&self, track: usize, beat: usize) -> Result<bool> {
        check(track, beat)?;
        Ok(self.cells[track][beat])
    }

    pub fn set(&mut self, track: usize, beat: usize, value: bool) -> Result<()> {
        check(track, beat)?;
        self.cells[track][beat] = value;
        Ok(())
    }

    /// Replace every cell from a flat track-major array.
    pub fn set_all(&mut self, values: [bool; CELL_COUNT]) {
        for (row, chunk) in self.cells.iter_mut().zip(values.chunks_exact(STEPS)) {
            row.copy_from_slice(chunk);
        }
    }

    /// Flatten to track-major order (track 0 beats 0..16, then track 1...).
    pub fn export_all(&self) -> [bool; CELL_COUNT] {
        let mut out = [false; CELL_COUNT];
        for (chunk, row) in out.chunks_exact_mut(STEPS).zip(self.cells.iter()) {
            chunk.copy_from_slice(row);
        }
        out
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STEPS]; TRACKS];
    }

    /// The beat flags of one row.
    pub fn track(&self, track: usize) -> Result<&[bool; STEPS]> {
        self.cells
            .get(track)
            .ok_or(Error::IndexOutOfRange { track, beat: 0 })
    }

    /// Iterate rows in track order.
    pub fn tracks(&self) -> impl Iterator<Item = &[bool; STEPS]> {
        self.cells.iter()
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&on| on).count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pattern_is_empty() {
        let pattern = Pattern::new();
        assert!(pattern.is_empty());
        assert_eq!(pattern.export_all(), [false; CELL_COUNT]);
    }

    #[test]
    fn test_toggle_returns_new_state() {
        let mut pattern = Pattern::new();
        assert_eq!(pattern.toggle(3, 7).unwrap(), true);
        assert!(pattern.get(3, 7).unwrap());
        assert_eq!(pattern.toggle(3, 7).unwrap(), false);
        assert!(!pattern.get(3, 7).unwrap());
    }

    #[test]
    fn test_double_toggle_restores_every_cell() {
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true).unwrap();
        pattern.set(9, 12, true).unwrap();
        let original = pattern;

        for track in 0..TRACKS {
            for beat in 0..STEPS {
                pattern.toggle(track, beat).unwrap();
                pattern.toggle(track, beat).unwrap();
                assert_eq!(pattern, original, "cell ({}, {})", track, beat);
            }
        }
    }

    #[test]
    fn test_out_of_range_indices() {
        let mut pattern = Pattern::new();
        assert!(matches!(
            pattern.toggle(16, 0),
            Err(Error::IndexOutOfRange { track: 16, beat: 0 })
        ));
        assert!(matches!(
            pattern.get(0, 16),
            Err(Error::IndexOutOfRange { track: 0, beat: 16 })
        ));
        assert!(pattern.set(99, 99, true).is_err());
        assert!(pattern.track(16).is_err());
        assert!(pattern.is_empty());
    }

    #[test]
    fn test_export_is_track_major() {
        let mut pattern = Pattern::new();
        pattern.set(1, 2, true).unwrap();
        let flags = pattern.export_all();
        assert!(flags[STEPS + 2]);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
    }

    #[test]
    fn test_set_all_replaces_state() {
        let mut pattern = Pattern::new();
        pattern.set(5, 5, true).unwrap();

        let mut values = [false; CELL_COUNT];
        values[0] = true;
        values[CELL_COUNT - 1] = true;
        pattern.set_all(values);

        assert!(pattern.get(0, 0).unwrap());
        assert!(pattern.get(15, 15).unwrap());
        assert!(!pattern.get(5, 5).unwrap());
        assert_eq!(pattern.export_all(), values);
    }

    #[test]
    fn test_from_flags_rejects_wrong_length() {
        let short = vec![true; CELL_COUNT - 1];
        assert!(matches!(
            Pattern::from_flags(&short),
            Err(Error::InvalidPersistedData(_))
        ));

        let long = vec![false; CELL_COUNT + 1];
        assert!(Pattern::from_flags(&long).is_err());

        let exact = vec![true; CELL_COUNT];
        assert_eq!(Pattern::from_flags(&exact).unwrap().active_count(), CELL_COUNT);
    }

    #[test]
    fn test_clear() {
        let mut pattern = Pattern::from_flags(&[true; CELL_COUNT]).unwrap();
        pattern.clear();
        assert!(pattern.is_empty());
    }
}
