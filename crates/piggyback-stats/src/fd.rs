//! Functional dependency candidates
//!
//! One cell per ordered pair of distinct result columns. A live cell maps each
//! value seen at the determinant to the single dependent value seen with it.
//! A cell dies on the first conflicting pair and never comes back.

use crate::exhausted;
use piggyback_common::Result;
use piggyback_containers::ValueMap;

#[derive(Debug, Clone)]
enum Cell {
    Live(ValueMap<u64>),
    Dead,
}

/// Candidate grid over `n` columns
#[derive(Debug, Clone)]
pub struct FdGrid {
    columns: usize,
    cells: Vec<Cell>,
}

impl FdGrid {
    /// Create a grid with every cell live except those touching a column
    /// flagged in `excluded`.
    pub fn new(columns: usize, initial_capacity: usize, excluded: &[bool]) -> Result<Self> {
        let is_excluded = |c: usize| excluded.get(c).copied().unwrap_or(false);
        let mut cells = Vec::with_capacity(columns * columns.saturating_sub(1));
        for determinant in 0..columns {
            for dependent in (0..columns).filter(|&d| d != determinant) {
                cells.push(if is_excluded(determinant) || is_excluded(dependent) {
                    Cell::Dead
                } else {
                    Cell::Live(ValueMap::with_capacity(initial_capacity).map_err(exhausted)?)
                });
            }
        }
        Ok(Self { columns, cells })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    fn index(&self, determinant: usize, dependent: usize) -> Option<usize> {
        if determinant == dependent || determinant >= self.columns || dependent >= self.columns {
            return None;
        }
        let offset = if dependent < determinant {
            dependent
        } else {
            dependent - 1
        };
        Some(determinant * (self.columns - 1) + offset)
    }

    fn pair(&self, index: usize) -> (usize, usize) {
        let determinant = index / (self.columns - 1);
        let offset = index % (self.columns - 1);
        let dependent = if offset < determinant { offset } else { offset + 1 };
        (determinant, dependent)
    }

    pub fn is_live(&self, determinant: usize, dependent: usize) -> bool {
        self.index(determinant, dependent)
            .is_some_and(|i| matches!(self.cells[i], Cell::Live(_)))
    }

    /// Kill a cell. Returns `true` if it was live.
    pub fn kill(&mut self, determinant: usize, dependent: usize) -> bool {
        match self.index(determinant, dependent) {
            Some(i) => matches!(std::mem::replace(&mut self.cells[i], Cell::Dead), Cell::Live(_)),
            None => false,
        }
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|c| matches!(c, Cell::Live(_))).count()
    }

    /// Kill every cell whose determinant has fewer final distinct values than
    /// its dependent. `distinct` holds the final count per column.
    pub fn prune(&mut self, distinct: &[Option<u64>]) -> usize {
        let mut pruned = 0;
        for determinant in 0..self.columns {
            for dependent in 0..self.columns {
                let counts = (
                    distinct.get(determinant).copied().flatten(),
                    distinct.get(dependent).copied().flatten(),
                );
                if let (Some(d), Some(e)) = counts {
                    if d > 0 && e > 0 && d < e && self.kill(determinant, dependent) {
                        tracing::debug!(
                            "Pruned candidate {} -> {} ({} < {} distinct values)",
                            determinant,
                            dependent,
                            d,
                            e
                        );
                        pruned += 1;
                    }
                }
            }
        }
        pruned
    }

    /// Check one tuple's keys against every live cell. Returns the number of
    /// map entries added.
    pub fn update(&mut self, keys: &[u64]) -> Result<usize> {
        if keys.len() != self.columns {
            tracing::warn!(
                "FD update with {} values for {} columns",
                keys.len(),
                self.columns
            );
            return Ok(0);
        }
        let mut inserted = 0;
        for index in 0..self.cells.len() {
            let (determinant, dependent) = self.pair(index);
            let Cell::Live(map) = &mut self.cells[index] else {
                continue;
            };
            let (a, b) = (keys[determinant], keys[dependent]);
            match map.get(a) {
                None => {
                    map.insert(a, b).map_err(exhausted)?;
                    inserted += 1;
                }
                Some(&seen) if seen == b => {}
                Some(_) => {
                    self.cells[index] = Cell::Dead;
                    tracing::debug!("Candidate {} -> {} disproved", determinant, dependent);
                }
            }
        }
        Ok(inserted)
    }

    /// Surviving candidates ordered by (determinant, dependent)
    pub fn dependencies(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Cell::Live(_)))
            .map(|(i, _)| self.pair(i))
            .collect()
    }
}
