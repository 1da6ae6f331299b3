//! Status panel
//!
//! Three text rows under a fixed header, one per telemetry value.
//! A row is only redrawn when its text changes, so refreshing with
//! unchanged values costs nothing on the panel.

use tracing::info;

use crate::constants::display::{COLUMNS, PLACEHOLDER};

/// Setter surface of the display subsystem
pub trait Display {
    fn set_mode(&mut self, mode: &str);
    fn set_temperature(&mut self, celsius: &str);
    fn set_frequency(&mut self, hz: &str);
}

/// Rows shown on the panel, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    Temperature,
    Frequency,
    Mode,
}

impl Row {
    fn index(self) -> usize {
        match self {
            Row::Temperature => 0,
            Row::Frequency => 1,
            Row::Mode => 2,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Row::Temperature => "Temp: ",
            Row::Frequency => "Freq: ",
            Row::Mode => "Mode: ",
        }
    }
}

pub const HEADER: [&str; 3] = ["CSEL1a - SP.25", "  Fan Manager", "--------------"];

/// Row-caching text panel
#[derive(Debug, Clone)]
pub struct StatusPanel {
    rows: [String; 3],
    redraws: u64,
}

impl StatusPanel {
    pub fn new() -> Self {
        let row = |r: Row| format!("{}{}", r.prefix(), PLACEHOLDER);
        Self {
            rows: [row(Row::Temperature), row(Row::Frequency), row(Row::Mode)],
            redraws: 0,
        }
    }

    pub fn row(&self, row: Row) -> &str {
        &self.rows[row.index()]
    }

    /// Number of rows actually redrawn since creation
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    fn update(&mut self, row: Row, value: &str) {
        let text: String = format!("{}{}", row.prefix(), value)
            .chars()
            .take(COLUMNS)
            .collect();

        let slot = &mut self.rows[row.index()];
        if *slot != text {
            info!(row = ?row, text = %text, "display updated");
            *slot = text;
            self.redraws += 1;
        }
    }
}

impl Default for StatusPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for StatusPanel {
    fn set_mode(&mut self, mode: &str) {
        self.update(Row::Mode, mode);
    }

    fn set_temperature(&mut self, celsius: &str) {
        self.update(Row::Temperature, celsius);
    }

    fn set_frequency(&mut self, hz: &str) {
        self.update(Row::Frequency, &format!("{}Hz", hz));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_rows() {
        let panel = StatusPanel::new();
        assert_eq!(panel.row(Row::Temperature), "Temp: N/A");
        assert_eq!(panel.row(Row::Frequency), "Freq: N/A");
        assert_eq!(panel.row(Row::Mode), "Mode: N/A");
    }

    #[test]
    fn test_only_changes_redraw() {
        let mut panel = StatusPanel::new();
        panel.set_frequency("15");
        panel.set_frequency("15");
        panel.set_mode("manual");
        assert_eq!(panel.row(Row::Frequency), "Freq: 15Hz");
        assert_eq!(panel.row(Row::Mode), "Mode: manual");
        assert_eq!(panel.redraws(), 2);
    }

    #[test]
    fn test_row_is_truncated_to_panel_width() {
        let mut panel = StatusPanel::new();
        panel.set_temperature("1234567890123456789");
        assert_eq!(panel.row(Row::Temperature).chars().count(), COLUMNS);
    }
}
