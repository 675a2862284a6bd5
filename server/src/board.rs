//! Connect-Four board engine: grid storage, chip placement, win and draw
//! detection. No networking or session knowledge lives here.

use shared::Slot;
use thiserror::Error;

/// Why a chip could not be placed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    #[error("invalid column or team")]
    InvalidInput,
    #[error("column is full")]
    ColumnFull,
}

/// A winning line: the team and the exact run of slots that completed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Win {
    pub team: u8,
    pub slots: Vec<Slot>,
}

/// Grid indexed `[column][row]`, row 0 at the bottom. A cell is `None`
/// until a chip lands in it.
#[derive(Debug, Clone)]
pub struct Board {
    columns: usize,
    rows: usize,
    win_length: usize,
    cells: Vec<Vec<Option<u8>>>,
}

impl Board {
    pub fn new(columns: usize, rows: usize, win_length: usize) -> Self {
        Self {
            columns,
            rows,
            win_length,
            cells: vec![vec![None; rows]; columns],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Drops a chip into `column` for `team`. The chip occupies the lowest
    /// empty row of that column. Takes the raw wire integer so all column
    /// validation lives in one place. Never mutates on error.
    pub fn add_chip(&mut self, team: u8, column: i64) -> Result<Slot, PlaceError> {
        if column < 0 || column as usize >= self.columns {
            return Err(PlaceError::InvalidInput);
        }
        if team > 1 {
            return Err(PlaceError::InvalidInput);
        }
        let col = column as usize;
        for row in 0..self.rows {
            if self.cells[col][row].is_none() {
                self.cells[col][row] = Some(team);
                return Ok(Slot { col, row });
            }
        }
        Err(PlaceError::ColumnFull)
    }

    /// Scans all four line directions for `win_length` consecutive chips of
    /// one team. Returns the first qualifying run, not the best one; callers
    /// check after every move, so at most one run can have just completed.
    pub fn winner(&self) -> Option<Win> {
        let win = self.win_length as i64;

        // Vertical
        for col in 0..self.columns as i64 {
            if let Some(w) = self.scan_line(col, 0, 0, 1) {
                return Some(w);
            }
        }
        // Horizontal
        for row in 0..self.rows as i64 {
            if let Some(w) = self.scan_line(0, row, 1, 0) {
                return Some(w);
            }
        }
        // Up-right diagonals: bottom edge starts, then left edge starts.
        // Only diagonals long enough to hold a run are walked.
        for start_col in 0..=(self.columns as i64 - win) {
            if let Some(w) = self.scan_line(start_col, 0, 1, 1) {
                return Some(w);
            }
        }
        for start_row in 1..=(self.rows as i64 - win) {
            if let Some(w) = self.scan_line(0, start_row, 1, 1) {
                return Some(w);
            }
        }
        // Up-left diagonals: bottom edge starts, then right edge starts.
        for start_col in ((win - 1)..self.columns as i64).rev() {
            if let Some(w) = self.scan_line(start_col, 0, -1, 1) {
                return Some(w);
            }
        }
        for start_row in 1..=(self.rows as i64 - win) {
            if let Some(w) = self.scan_line(self.columns as i64 - 1, start_row, -1, 1) {
                return Some(w);
            }
        }
        None
    }

    /// Walks one maximal line from `(col, row)` along `(dc, dr)`, keeping a
    /// run of consecutive same-team chips. An empty cell or a team change
    /// restarts the run at the breaking cell.
    fn scan_line(&self, mut col: i64, mut row: i64, dc: i64, dr: i64) -> Option<Win> {
        let mut run: Vec<Slot> = Vec::new();
        let mut team = 0u8;

        while col >= 0 && (col as usize) < self.columns && row >= 0 && (row as usize) < self.rows {
            match self.cells[col as usize][row as usize] {
                Some(t) => {
                    if run.is_empty() || t != team {
                        run.clear();
                        team = t;
                    }
                    run.push(Slot {
                        col: col as usize,
                        row: row as usize,
                    });
                    if run.len() == self.win_length {
                        return Some(Win { team, slots: run });
                    }
                }
                None => run.clear(),
            }
            col += dc;
            row += dr;
        }
        None
    }

    /// True iff every cell holds a chip. Only meaningful when there is no
    /// winner.
    pub fn is_draw(&self) -> bool {
        self.cells
            .iter()
            .all(|column| column.iter().all(|cell| cell.is_some()))
    }

    /// Resets every cell to empty. Used by local/offline variants only; the
    /// authoritative server retires boards instead of reusing them.
    pub fn clear(&mut self) {
        for column in &mut self.cells {
            for cell in column {
                *cell = None;
            }
        }
    }

    /// Wire form of the grid: -1 for empty, otherwise the team id.
    pub fn snapshot(&self) -> Vec<Vec<i8>> {
        self.cells
            .iter()
            .map(|column| {
                column
                    .iter()
                    .map(|cell| match cell {
                        Some(team) => *team as i8,
                        None => -1,
                    })
                    .collect()
            })
            .collect()
    }
}
