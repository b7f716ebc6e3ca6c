use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    North,
    South,
}

impl Side {
    pub fn name(self) -> &'static str {
        match self {
            Side::North => "north",
            Side::South => "south",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::North => 0,
            Side::South => 1,
        }
    }
}

/// Pit counts of a Kalah board.
///
/// Each side owns `holes` holes (numbered from 1) and one store. The board only
/// records counts; sowing and captures are applied by whoever owns the game, and
/// the resulting board is written back through [`Board::set_seeds`] and
/// [`Board::set_store`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    holes: usize,
    // per side: index 0 is the store, 1..=holes are the holes
    cells: [Vec<u32>; 2],
}

impl Board {
    pub fn new(holes: usize, seeds: u32) -> Self {
        debug_assert!(0 < holes);

        let mut side = vec![seeds; holes + 1];
        side[0] = 0;

        Self {
            holes,
            cells: [side.clone(), side],
        }
    }

    pub fn holes(&self) -> usize {
        self.holes
    }

    pub fn seeds(&self, side: Side, hole: usize) -> Option<u32> {
        if hole == 0 || self.holes < hole {
            return None;
        }

        Some(self.cells[side.index()][hole])
    }

    pub fn set_seeds(&mut self, side: Side, hole: usize, seeds: u32) {
        debug_assert!(0 < hole && hole <= self.holes);
        self.cells[side.index()][hole] = seeds;
    }

    pub fn store(&self, side: Side) -> u32 {
        self.cells[side.index()][0]
    }

    pub fn set_store(&mut self, side: Side, seeds: u32) {
        self.cells[side.index()][0] = seeds;
    }

    /// Total number of seeds left in the holes of `side`, stores excluded.
    pub fn seeds_on_side(&self, side: Side) -> u32 {
        self.cells[side.index()][1..].iter().sum()
    }

    /// Holes of `side` that still contain seeds, in ascending order.
    pub fn legal_moves(&self, side: Side) -> Vec<usize> {
        (1..=self.holes)
            .filter(|&hole| 0 < self.cells[side.index()][hole])
            .collect()
    }

    /// Store of `side` minus the store of the opposite side.
    pub fn score_difference(&self, side: Side) -> i64 {
        self.store(side) as i64 - self.store(side.opposite()) as i64
    }

    /// Encodes the board as a `2 x (holes + 1)` row-major matrix seen from `perspective`.
    ///
    /// Row 0 holds the holes of `perspective` (1 to `holes`) followed by its store, row 1
    /// holds the same for the opponent.
    pub fn to_matrix(&self, perspective: Side) -> Vec<f32> {
        let mut values = Vec::with_capacity(2 * (self.holes + 1));

        for side in [perspective, perspective.opposite()] {
            let cells = &self.cells[side.index()];
            values.extend(cells[1..].iter().map(|&seeds| seeds as f32));
            values.push(cells[0] as f32);
        }

        values
    }
}

impl Display for Board {
    /// Renders North on top (holes right to left) and South at the bottom, with the
    /// stores on either end of the middle line:
    ///
    /// ```text
    ///        7  7  7
    ///     0           0
    ///        7  7  7
    /// ```
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let north = &self.cells[Side::North.index()];
        let south = &self.cells[Side::South.index()];

        write!(f, "   ")?;
        for hole in (1..=self.holes).rev() {
            write!(f, "{:3}", north[hole])?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:3}{}{:3}",
            north[0],
            " ".repeat(3 * self.holes),
            south[0]
        )?;

        write!(f, "   ")?;
        for hole in 1..=self.holes {
            write!(f, "{:3}", south[hole])?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board() {
        let board = Board::new(7, 7);

        assert_eq!(board.holes(), 7);
        assert_eq!(board.store(Side::North), 0);
        assert_eq!(board.store(Side::South), 0);
        assert_eq!(board.seeds_on_side(Side::North), 49);
        assert_eq!(board.seeds(Side::South, 1), Some(7));
        assert_eq!(board.seeds(Side::South, 0), None);
        assert_eq!(board.seeds(Side::South, 8), None);
    }

    #[test]
    fn test_legal_moves_skip_empty_holes() {
        let mut board = Board::new(7, 7);
        board.set_seeds(Side::South, 1, 0);
        board.set_seeds(Side::South, 5, 0);

        assert_eq!(board.legal_moves(Side::South), vec![2, 3, 4, 6, 7]);
        assert_eq!(board.legal_moves(Side::North), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_to_matrix_is_relative_to_perspective() {
        let mut board = Board::new(3, 0);
        board.set_seeds(Side::North, 1, 1);
        board.set_seeds(Side::North, 2, 2);
        board.set_seeds(Side::North, 3, 3);
        board.set_store(Side::North, 4);
        board.set_seeds(Side::South, 1, 5);
        board.set_seeds(Side::South, 2, 6);
        board.set_seeds(Side::South, 3, 7);
        board.set_store(Side::South, 8);

        assert_eq!(
            board.to_matrix(Side::North),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
        assert_eq!(
            board.to_matrix(Side::South),
            vec![5.0, 6.0, 7.0, 8.0, 1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(board.score_difference(Side::South), 4);
        assert_eq!(board.score_difference(Side::North), -4);
    }

    #[test]
    fn test_display() {
        let mut board = Board::new(2, 1);
        board.set_store(Side::South, 3);

        println!("{}", board);
        assert_eq!(board.to_string(), "     1  1\n  0        3\n     1  1");
    }
}
