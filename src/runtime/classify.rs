//! Monitor-to-alternative classification.
//!
//! A classification cycle turns the per-cell monitoring buffer into one
//! alternative selection per tile: member-cell bytes are folded with the
//! declared reduction, the folded byte indexes a 256-entry lookup table
//! built once at setup, and each alternative accumulates the union of the
//! tile domains that selected it.

use crate::options::{KernelOptions, Reduction, Selector};
use crate::polyhedral::SetUnion;
use crate::runtime::grid::TileGrid;
use crate::utils::errors::{ClassificationError, ConfigError};
use log::debug;

/// The byte-to-alternative lookup table.
///
/// Built once at setup for O(1) dispatch per tile. A `None` slot is a
/// coverage gap: classification landing on it fails the cycle.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    owner: Vec<Option<usize>>,
    n_alternatives: usize,
}

impl StrategyTable {
    /// Build the table from the declared strategies.
    ///
    /// Two strategies claiming the same byte is a configuration defect
    /// rejected here, with both constructs rendered.
    pub fn build(options: &KernelOptions) -> Result<StrategyTable, ConfigError> {
        let mut owner: Vec<Option<usize>> = vec![None; 256];
        let mut claimed_by: Vec<Option<usize>> = vec![None; 256];

        for (si, strat) in options.strategies.iter().enumerate() {
            let alt = options.alternative_index(&strat.alternative)
                .ok_or_else(|| ConfigError::UnknownAlternative {
                    strategy: strat.to_string(),
                    alternative: strat.alternative.clone(),
                })?;
            let (lo, hi) = match strat.selector {
                Selector::Direct(v) => (v, v),
                Selector::Range(lo, hi) => {
                    if lo > hi {
                        return Err(ConfigError::EmptyRange { strategy: strat.to_string() });
                    }
                    (lo, hi)
                }
            };
            for v in lo..=hi {
                if let Some(prev) = claimed_by[v as usize] {
                    return Err(ConfigError::OverlappingStrategies {
                        first: options.strategies[prev].to_string(),
                        second: strat.to_string(),
                        value: v,
                    });
                }
                claimed_by[v as usize] = Some(si);
                owner[v as usize] = Some(alt);
            }
        }

        Ok(StrategyTable {
            owner,
            n_alternatives: options.alternatives.len(),
        })
    }

    /// The alternative owning a byte, if any.
    pub fn lookup(&self, byte: u8) -> Option<usize> {
        self.owner[byte as usize]
    }

    /// Whether every byte value has an owner.
    pub fn is_total(&self) -> bool {
        self.owner.iter().all(|o| o.is_some())
    }

    /// Number of declared alternatives.
    pub fn n_alternatives(&self) -> usize {
        self.n_alternatives
    }
}

/// Fold a tile's member-cell bytes into its decision byte.
fn reduce_bytes(reduction: Reduction, bytes: &[u8]) -> u8 {
    assert!(!bytes.is_empty(), "reducing an empty tile");
    match reduction {
        Reduction::Min => *bytes.iter().min().unwrap(),
        Reduction::Max => *bytes.iter().max().unwrap(),
        Reduction::Avg => {
            let sum: u64 = bytes.iter().map(|&b| b as u64).sum();
            (sum / bytes.len() as u64) as u8
        }
    }
}

/// Per-tile decisions: the reduced byte and its owning alternative.
/// `None` entries are tiles whose clipped domain holds no cell.
pub fn tile_decisions(
    grid: &TileGrid,
    table: &StrategyTable,
    reduction: Reduction,
    buffer: &[u8],
) -> Result<Vec<Option<(usize, u8)>>, ClassificationError> {
    assert_eq!(
        buffer.len(),
        grid.total_cells(),
        "monitoring buffer size mismatch"
    );
    let mut decisions = Vec::with_capacity(grid.total_tiles());
    for t in 0..grid.total_tiles() {
        let cells = grid.clipped(t).points();
        if cells.is_empty() {
            decisions.push(None);
            continue;
        }
        let bytes: Vec<u8> = cells.iter()
            .map(|c| buffer[grid.cell_index(c)])
            .collect();
        let value = reduce_bytes(reduction, &bytes);
        let alt = table.lookup(value)
            .ok_or(ClassificationError::Unmatched { byte: value, tile: t })?;
        decisions.push(Some((alt, value)));
    }
    Ok(decisions)
}

/// One classification cycle: per-alternative unions of tile domains.
///
/// The unions hold the unclipped tile cubes; intersection with the
/// statement domains downstream performs the clipping.
pub fn classify_tiles(
    grid: &TileGrid,
    table: &StrategyTable,
    reduction: Reduction,
    buffer: &[u8],
) -> Result<Vec<SetUnion>, ClassificationError> {
    let decisions = tile_decisions(grid, table, reduction, buffer)?;
    let mut unions: Vec<SetUnion> = (0..table.n_alternatives())
        .map(|_| SetUnion::empty(grid.n_dims(), 0))
        .collect();
    for (t, decision) in decisions.iter().enumerate() {
        if let Some((alt, _)) = decision {
            unions[*alt].add(grid.tile_domain(t).clone());
        }
    }
    debug!(
        "classified {} tiles: {:?} per alternative",
        grid.total_tiles(),
        unions.iter().map(|u| u.len()).collect::<Vec<_>>()
    );
    Ok(unions)
}
