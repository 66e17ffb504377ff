//! ASCII level layouts used by tooling and tests.
//!
//! Each non-blank line is one row of the level. Glyphs:
//!
//! | Glyph | Tile |
//! | --- | --- |
//! | `#` | wall |
//! | `.` | floor in region 1 |
//! | `1`..`4` | floor in the given region |
//! | `a`..`d` | decor in regions 1..4 |
//! | `E` | exit |
//! | `Z` | regular agent spawn on region 1 floor |
//! | `M` | master agent spawn on region 1 floor |
//! | `P` | target start on region 1 floor |

use zombie_house_core::{CellCoord, Tier, TileKind};

use crate::{Grid, GridError};

/// Agent spawn point declared by a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Spawn {
    /// Tier of the agent to create.
    pub tier: Tier,
    /// Cell the agent starts on.
    pub cell: CellCoord,
}

/// Reasons an ASCII layout may be rejected.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The layout contains no rows.
    #[error("layout contains no rows")]
    Empty,
    /// A row has a different width than the first row.
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        actual: u32,
    },
    /// A glyph outside the layout alphabet was found.
    #[error("unknown glyph {glyph:?} at column {column}, row {row}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Column of the glyph.
        column: u32,
        /// Row of the glyph.
        row: u32,
    },
    /// More than one target start was declared.
    #[error("second target start at {cell:?}")]
    DuplicateTarget {
        /// Cell of the second `P` glyph.
        cell: CellCoord,
    },
    /// The resulting grid is invalid.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Parsed level: the tile grid plus the markers placed on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelLayout {
    grid: Grid,
    spawns: Vec<Spawn>,
    target: Option<CellCoord>,
}

impl LevelLayout {
    /// Parses a layout from its ASCII representation.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let mut tiles = Vec::new();
        let mut spawns = Vec::new();
        let mut target = None;
        let mut columns = None;
        let mut rows = 0_u32;

        for line in source.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let row = rows;
            let mut width = 0_u32;
            for (column, glyph) in (0_u32..).zip(line.chars()) {
                let cell = CellCoord::new(column, row);
                let tile = match glyph {
                    '#' => TileKind::Wall,
                    '.' => TileKind::Floor { region: 1 },
                    '1'..='4' => TileKind::Floor {
                        region: glyph as u8 - b'0',
                    },
                    'a'..='d' => TileKind::Decor {
                        region: glyph as u8 - b'a' + 1,
                    },
                    'E' => TileKind::Exit,
                    'Z' | 'M' => {
                        let tier = if glyph == 'Z' {
                            Tier::Regular
                        } else {
                            Tier::Master
                        };
                        spawns.push(Spawn { tier, cell });
                        TileKind::Floor { region: 1 }
                    }
                    'P' => {
                        if target.replace(cell).is_some() {
                            return Err(LayoutError::DuplicateTarget { cell });
                        }
                        TileKind::Floor { region: 1 }
                    }
                    _ => {
                        return Err(LayoutError::UnknownGlyph {
                            glyph,
                            column,
                            row,
                        })
                    }
                };
                tiles.push(tile);
                width += 1;
            }

            match columns {
                None => columns = Some(width),
                Some(expected) if expected != width => {
                    return Err(LayoutError::RaggedRow {
                        row,
                        expected,
                        actual: width,
                    })
                }
                Some(_) => {}
            }
            rows += 1;
        }

        let columns = columns.ok_or(LayoutError::Empty)?;
        let grid = Grid::new(columns, rows, tiles)?;
        Ok(Self {
            grid,
            spawns,
            target,
        })
    }

    /// Tile grid of the level.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Agent spawn points in reading order.
    #[must_use]
    pub fn spawns(&self) -> &[Spawn] {
        &self.spawns
    }

    /// Starting cell of the target, if the layout declares one.
    #[must_use]
    pub const fn target(&self) -> Option<CellCoord> {
        self.target
    }

    /// Consumes the layout, yielding its grid.
    #[must_use]
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tiles_and_markers() {
        let layout = LevelLayout::parse(
            "
            #####
            #Z.a#
            #2PM#
            ###E#
            ",
        )
        .expect("layout parses");

        let grid = layout.grid();
        assert_eq!((grid.columns(), grid.rows()), (5, 4));
        assert_eq!(grid.tile(CellCoord::new(0, 0)), Some(TileKind::Wall));
        assert_eq!(
            grid.tile(CellCoord::new(3, 1)),
            Some(TileKind::Decor { region: 1 })
        );
        assert_eq!(
            grid.tile(CellCoord::new(1, 2)),
            Some(TileKind::Floor { region: 2 })
        );
        assert_eq!(grid.tile(CellCoord::new(3, 3)), Some(TileKind::Exit));
        assert_eq!(layout.target(), Some(CellCoord::new(2, 2)));
        assert_eq!(
            layout.spawns(),
            &[
                Spawn {
                    tier: Tier::Regular,
                    cell: CellCoord::new(1, 1),
                },
                Spawn {
                    tier: Tier::Master,
                    cell: CellCoord::new(3, 2),
                },
            ]
        );
        assert!(grid.is_walkable(CellCoord::new(1, 1)));
    }

    #[test]
    fn rejects_ragged_rows() {
        let error = LevelLayout::parse("...\n..\n...").expect_err("ragged");
        assert_eq!(
            error,
            LayoutError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_unknown_glyphs() {
        let error = LevelLayout::parse("..\n.x").expect_err("unknown glyph");
        assert_eq!(
            error,
            LayoutError::UnknownGlyph {
                glyph: 'x',
                column: 1,
                row: 1
            }
        );
    }

    #[test]
    fn rejects_second_target() {
        let error = LevelLayout::parse("P.\n.P").expect_err("two targets");
        assert_eq!(
            error,
            LayoutError::DuplicateTarget {
                cell: CellCoord::new(1, 1)
            }
        );
    }

    #[test]
    fn rejects_degenerate_layouts() {
        assert_eq!(LevelLayout::parse("\n \n"), Err(LayoutError::Empty));
        assert_eq!(
            LevelLayout::parse("...."),
            Err(LayoutError::Grid(GridError::TooSmall {
                columns: 4,
                rows: 1
            }))
        );
    }
}
