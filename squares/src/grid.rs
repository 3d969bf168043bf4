//! Score-to-cell mapping and winner lookup.

use crate::axis::Axis;
use crate::game::GameDoc;
use crate::types::{Cell, Winner, GRID_SIZE, NO_WINNER_ID, NO_WINNER_NAME};

/// Trailing digit of a score, always in `0..10` (negative scores included).
pub fn last_digit(score: i64) -> u8 {
    score.rem_euclid(GRID_SIZE as i64) as u8
}

/// Locate the cell for a score pair. Team A's digit selects the row, team B's
/// the column. `None` means the winner cannot be determined (axis unset).
pub fn map_score_to_cell(axis: &Axis, score_a: i64, score_b: i64) -> Option<Cell> {
    let row = axis.row_of(last_digit(score_a))?;
    let col = axis.col_of(last_digit(score_b))?;
    Cell::new(row, col)
}

/// Everyone holding `cell`, in claim order.
pub fn winners_at(game: &GameDoc, cell: Cell) -> Vec<Winner> {
    game.claims_at(cell)
        .iter()
        .map(|c| Winner { uid: c.uid.clone(), name: c.name.clone() })
        .collect()
}

/// Primary winner id and display name for a winner list.
///
/// The first claimant is the primary winner; the display name joins every
/// claimant. An empty list is a rollover.
pub fn winner_summary(winners: &[Winner]) -> (String, String) {
    match winners.first() {
        Some(first) => (
            first.uid.clone(),
            winners.iter().map(|w| w.name.as_str()).collect::<Vec<_>>().join(", "),
        ),
        None => (NO_WINNER_ID.to_string(), NO_WINNER_NAME.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Claim, GameSettings};

    fn axis() -> Axis {
        Axis {
            rows: vec![3, 7, 0, 1, 2, 4, 5, 6, 8, 9],
            cols: vec![9, 8, 6, 7, 5, 4, 3, 2, 1, 0],
        }
    }

    #[test]
    fn test_cell_resolution_uses_digit_index() {
        // 23 -> 3 is row index 0; 17 -> 7 is col index 3
        let cell = map_score_to_cell(&axis(), 23, 17).unwrap();
        assert_eq!(cell, Cell::new(0, 3).unwrap());
    }

    #[test]
    fn test_zero_scores() {
        // 0 is row index 2, col index 9
        assert_eq!(map_score_to_cell(&axis(), 0, 0), Cell::new(2, 9));
    }

    #[test]
    fn test_negative_scores_wrap() {
        assert_eq!(last_digit(-3), 7);
        assert_eq!(last_digit(-10), 0);
        assert_eq!(last_digit(129), 9);
    }

    #[test]
    fn test_unset_axis_is_indeterminate() {
        assert_eq!(map_score_to_cell(&Axis::unset(), 23, 17), None);
        let half = Axis { rows: axis().rows, cols: vec![] };
        assert_eq!(map_score_to_cell(&half, 23, 17), None);
    }

    #[test]
    fn test_winner_summary_shared_cell() {
        let mut game = GameDoc::new("g", "h", GameSettings::new("P", "A", "B", 1.0));
        let cell = Cell::new(1, 1).unwrap();
        game.grid.insert(cell.key(), vec![Claim::new("u2", "Bob"), Claim::new("u1", "Ann")]);
        let winners = winners_at(&game, cell);
        let (uid, name) = winner_summary(&winners);
        assert_eq!(uid, "u2");
        assert_eq!(name, "Bob, Ann");
    }

    #[test]
    fn test_winner_summary_rollover() {
        let (uid, name) = winner_summary(&[]);
        assert_eq!(uid, NO_WINNER_ID);
        assert_eq!(name, NO_WINNER_NAME);
    }
}
