// Section grid layout: greedy left-to-right packing of column spans
use serde::Serialize;

pub const MIN_COLUMNS: u8 = 1;
pub const MAX_COLUMNS: u8 = 4;

pub fn clamp_columns(columns: u8) -> u8 {
    columns.clamp(MIN_COLUMNS, MAX_COLUMNS)
}

/// Width a widget actually occupies in a section: its declared span,
/// clamped to the section's column count. Never rejected.
pub fn effective_width(declared: u8, columns: u8) -> u8 {
    declared.clamp(1, MAX_COLUMNS).min(clamp_columns(columns))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    /// Widget indices in row order
    pub widgets: Vec<usize>,
    pub used: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    index: usize,
    used_before: u8,
}

/// Packing view over one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionGrid {
    columns: u8,
    widths: Vec<u8>,
}

impl SectionGrid {
    pub fn new(columns: u8, declared_widths: impl IntoIterator<Item = u8>) -> Self {
        let columns = clamp_columns(columns);
        let widths = declared_widths
            .into_iter()
            .map(|w| effective_width(w, columns))
            .collect();
        Self { columns, widths }
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    /// Effective (clamped) widths in widget order.
    pub fn widths(&self) -> &[u8] {
        &self.widths
    }

    /// The single greedy pass everything else is derived from. A widget that
    /// would overflow the running row starts a fresh one; a row filled
    /// exactly to `columns` closes and the next widget starts clean.
    fn placements(&self) -> Vec<Placement> {
        let mut used = 0u8;
        let mut placements = Vec::with_capacity(self.widths.len());
        for (index, &width) in self.widths.iter().enumerate() {
            if used + width > self.columns {
                used = 0;
            }
            placements.push(Placement {
                index,
                used_before: used,
            });
            used += width;
            if used == self.columns {
                used = 0;
            }
        }
        placements
    }

    pub fn rows(&self) -> Vec<GridRow> {
        let mut rows: Vec<GridRow> = Vec::new();
        for placement in self.placements() {
            let width = self.widths[placement.index];
            match rows.last_mut() {
                Some(row) if placement.used_before > 0 => {
                    row.widgets.push(placement.index);
                    row.used += width;
                }
                _ => rows.push(GridRow {
                    widgets: vec![placement.index],
                    used: width,
                }),
            }
        }
        rows
    }

    /// Columns still free in the final row. An exactly full final row
    /// reports 0; an empty section reports its full column count.
    pub fn remaining_capacity(&self) -> u8 {
        match self.rows().last() {
            Some(row) => self.columns - row.used,
            None => self.columns,
        }
    }

    /// Widest span widget `index` can take without overflowing its row,
    /// given the same-row widgets before it. `None` if out of range.
    pub fn max_width_at(&self, index: usize) -> Option<u8> {
        self.placements()
            .get(index)
            .map(|p| (self.columns - p.used_before).max(1))
    }

    pub fn max_widths(&self) -> Vec<u8> {
        self.placements()
            .iter()
            .map(|p| (self.columns - p.used_before).max(1))
            .collect()
    }
}
