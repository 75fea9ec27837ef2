//! # MNK Game Module
//!
//! Generalization of Tic-Tac-Toe to an m-by-n board on which players
//! alternate placing pieces until one aligns k of their own. Every move adds
//! a piece, so the number of placed pieces tiers the game: tier t holds all
//! boards with t pieces, and every move lands in tier t + 1. Boards related
//! by rotation or reflection of the grid are symmetric; one representative
//! per orbit is solved.
//!
//! Positions are encoded in base 3 over row-major cells (0 empty, 1 the
//! first player's piece, 2 the second player's piece), so every tier shares
//! one index space of 3^(m*n) positions, most of which are illegal in any
//! given tier.

use anyhow::Result;

use crate::game::mnk::variants::*;
use crate::game::Codec;
use crate::game::GameData;
use crate::game::Implicit;
use crate::game::Information;
use crate::game::Position;
use crate::game::StringProtocol;
use crate::game::Symmetric;
use crate::game::Tier;
use crate::game::TierKind;
use crate::game::TierPosition;
use crate::game::Tiered;
use crate::game::Variable;
use crate::game::Variant;
use crate::game::error::GameError;
use crate::solver::Value;

/* SUBMODULES */

mod variants;

/* GAME DATA */

const NAME: &str = "mnk";
const AUTHORS: &str = "Max Fierro <maxfierro@berkeley.edu>";
const ABOUT: &str = "Two players take turns claiming cells of an m-by-n \
grid, attempting to be the first to claim k cells in a row horizontally, \
vertically, or diagonally. The player to first align k of their own pieces \
wins, and a full board without an alignment ties. The standard game of \
Tic-Tac-Toe is the 3-3-3 variant.";

const STATE_DEFAULT: &str = "---------";
const STATE_PATTERN: &str = r"^[xo-]+$";
const STATE_PROTOCOL: &str = "The state string spells the board's cells in \
row-major order, one character per cell: 'x' for the first player's pieces, \
'o' for the second player's, and '-' for empty cells. Its length must equal \
the number of cells on the variant's board, and the arrangement must be \
reachable in play.";

/* DEFINITIONS */

const EMPTY: u8 = 0;
const X: u8 = 1;
const O: u8 = 2;

/* GAME IMPLEMENTATION */

pub struct Session {
    rows: usize,
    cols: usize,
    k: usize,
    cells: usize,
    pow3: Vec<u64>,
    syms: Vec<Vec<usize>>,
}

impl Session {
    pub fn new(variant: Option<Variant>) -> Result<Self> {
        if let Some(v) = variant {
            Self::variant(v)
        } else {
            Ok(Self::default())
        }
    }

    fn assemble(rows: usize, cols: usize, k: usize) -> Self {
        let cells = rows * cols;
        let mut pow3 = Vec::with_capacity(cells + 1);
        let mut power = 1u64;
        for _ in 0..=cells {
            pow3.push(power);
            power = power.saturating_mul(3);
        }

        Session {
            rows,
            cols,
            k,
            cells,
            pow3,
            syms: symmetries(rows, cols),
        }
    }

    /* BOARD ENCODING */

    fn digits(&self, position: Position) -> Vec<u8> {
        (0..self.cells)
            .map(|cell| ((position / self.pow3[cell]) % 3) as u8)
            .collect()
    }

    fn compose(&self, digits: &[u8]) -> Position {
        digits
            .iter()
            .enumerate()
            .map(|(cell, &digit)| digit as u64 * self.pow3[cell])
            .sum()
    }

    fn counts(&self, digits: &[u8]) -> (usize, usize) {
        let x = digits.iter().filter(|&&d| d == X).count();
        let o = digits.iter().filter(|&&d| d == O).count();
        (x, o)
    }

    /* RULES */

    fn aligned(&self, digits: &[u8], piece: u8) -> bool {
        let directions = [(0i64, 1i64), (1, 0), (1, 1), (1, -1)];
        for row in 0..self.rows as i64 {
            for col in 0..self.cols as i64 {
                for (dr, dc) in directions {
                    let run = (0..self.k as i64).all(|step| {
                        let r = row + dr * step;
                        let c = col + dc * step;
                        r >= 0
                            && c >= 0
                            && r < self.rows as i64
                            && c < self.cols as i64
                            && digits[(r * self.cols as i64 + c) as usize]
                                == piece
                    });
                    if run {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn orbit_minimum(&self, digits: &[u8]) -> Position {
        self.syms
            .iter()
            .map(|source_of| {
                source_of
                    .iter()
                    .enumerate()
                    .map(|(target, &source)| {
                        digits[source] as u64 * self.pow3[target]
                    })
                    .sum()
            })
            .min()
            .unwrap_or_else(|| self.compose(digits))
    }
}

/* IMPLEMENTATIONS */

impl Default for Session {
    fn default() -> Self {
        parse_variant(VARIANT_DEFAULT.to_owned())
            .expect("Failed to parse default variant.")
    }
}

impl Information for Session {
    fn info() -> GameData {
        GameData {
            name: NAME,
            authors: AUTHORS,
            about: ABOUT,

            variant: StringProtocol {
                explanation: VARIANT_PROTOCOL,
                pattern: VARIANT_PATTERN,
                default: VARIANT_DEFAULT,
            },

            state: StringProtocol {
                explanation: STATE_PROTOCOL,
                pattern: STATE_PATTERN,
                default: STATE_DEFAULT,
            },
        }
    }
}

impl Variable for Session {
    fn variant(variant: Variant) -> Result<Self> {
        parse_variant(variant)
    }
}

impl Tiered for Session {
    fn initial_tier(&self) -> Tier {
        0
    }

    fn initial_position(&self) -> TierPosition {
        TierPosition {
            tier: 0,
            position: 0,
        }
    }

    fn tier_size(&self, _tier: Tier) -> u64 {
        self.pow3[self.cells]
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        if (tier as usize) < self.cells {
            vec![tier + 1]
        } else {
            Vec::new()
        }
    }

    fn tier_kind(&self, _tier: Tier) -> TierKind {
        TierKind::ImmediateTransition
    }
}

impl Symmetric for Session {
    fn canonical_position(&self, state: TierPosition) -> Position {
        self.orbit_minimum(&self.digits(state.position))
    }
}

impl Implicit for Session {
    fn legal(&self, state: TierPosition) -> bool {
        if state.tier as usize > self.cells
            || state.position >= self.pow3[self.cells]
        {
            return false;
        }

        let digits = self.digits(state.position);
        let (x, o) = self.counts(&digits);
        if x + o != state.tier as usize || x < o || x - o > 1 {
            return false;
        }

        let xw = self.aligned(&digits, X);
        let ow = self.aligned(&digits, O);
        match (xw, ow) {
            (true, true) => false,
            (true, false) => x == o + 1,
            (false, true) => x == o,
            (false, false) => true,
        }
    }

    fn primitive(&self, state: TierPosition) -> Value {
        let digits = self.digits(state.position);
        if self.aligned(&digits, X) || self.aligned(&digits, O) {
            Value::Lose
        } else if state.tier as usize == self.cells {
            Value::Tie
        } else {
            Value::Undecided
        }
    }

    fn adjacent(&self, state: TierPosition) -> Vec<TierPosition> {
        let digits = self.digits(state.position);
        if self.aligned(&digits, X)
            || self.aligned(&digits, O)
            || state.tier as usize == self.cells
        {
            return Vec::new();
        }

        let (x, o) = self.counts(&digits);
        let piece = if x == o { X } else { O };
        digits
            .iter()
            .enumerate()
            .filter(|&(_, &digit)| digit == EMPTY)
            .map(|(cell, _)| TierPosition {
                tier: state.tier + 1,
                position: state.position + piece as u64 * self.pow3[cell],
            })
            .collect()
    }

    fn retrograde(&self) -> bool {
        true
    }

    fn parents(&self, state: TierPosition, parent: Tier) -> Vec<Position> {
        if parent + 1 != state.tier {
            return Vec::new();
        }

        let digits = self.digits(state.position);
        let (x, o) = self.counts(&digits);
        let last = if x == o { O } else { X };
        let mut parents = digits
            .iter()
            .enumerate()
            .filter(|&(_, &digit)| digit == last)
            .filter_map(|(cell, _)| {
                let removed = TierPosition {
                    tier: parent,
                    position: state.position
                        - last as u64 * self.pow3[cell],
                };
                if self.legal(removed)
                    && self.primitive(removed) == Value::Undecided
                {
                    Some(self.canonical_position(removed))
                } else {
                    None
                }
            })
            .collect::<Vec<Position>>();
        parents.sort_unstable();
        parents.dedup();
        parents
    }
}

impl Codec for Session {
    fn decode(&self, string: String) -> Result<TierPosition> {
        if string.len() != self.cells {
            Err(GameError::StateMalformed {
                game_name: NAME,
                hint: format!(
                    "State string holds {} cells, but this variant's board \
                    has {}.",
                    string.len(),
                    self.cells,
                ),
            })?
        }

        let digits = string
            .chars()
            .map(|c| match c {
                '-' => Ok(EMPTY),
                'x' => Ok(X),
                'o' => Ok(O),
                other => Err(GameError::StateMalformed {
                    game_name: NAME,
                    hint: format!(
                        "State string holds '{other}', but only 'x', 'o', \
                        and '-' encode cells.",
                    ),
                }),
            })
            .collect::<Result<Vec<u8>, GameError>>()?;

        let (x, o) = self.counts(&digits);
        let state = TierPosition {
            tier: (x + o) as Tier,
            position: self.compose(&digits),
        };
        if !self.legal(state) {
            Err(GameError::StateMalformed {
                game_name: NAME,
                hint: "The board arrangement is unreachable in play."
                    .to_string(),
            })?
        }
        Ok(state)
    }

    fn encode(&self, state: TierPosition) -> Result<String> {
        if state.position >= self.pow3[self.cells] {
            Err(GameError::StateMalformed {
                game_name: NAME,
                hint: format!(
                    "Position index {} does not encode a board.",
                    state.position,
                ),
            })?
        }
        Ok(self
            .digits(state.position)
            .iter()
            .map(|&digit| match digit {
                X => 'x',
                O => 'o',
                _ => '-',
            })
            .collect())
    }
}

/* SYMMETRY GROUP */

/// Returns the grid's symmetry transforms as cell permutations, each giving
/// the source cell whose contents land on every target cell. Rectangular
/// boards admit the Klein four-group; square boards the full dihedral group
/// of order eight.
fn symmetries(rows: usize, cols: usize) -> Vec<Vec<usize>> {
    type Transform = fn(usize, usize, usize, usize) -> (usize, usize);
    let mut transforms: Vec<Transform> = vec![
        |_, _, r, c| (r, c),
        |rows, cols, r, c| (rows - 1 - r, cols - 1 - c),
        |rows, _, r, c| (rows - 1 - r, c),
        |_, cols, r, c| (r, cols - 1 - c),
    ];
    if rows == cols {
        transforms.push(|_, _, r, c| (c, r));
        transforms.push(|rows, cols, r, c| (cols - 1 - c, rows - 1 - r));
        transforms.push(|rows, _, r, c| (c, rows - 1 - r));
        transforms.push(|_, cols, r, c| (cols - 1 - c, r));
    }

    transforms
        .into_iter()
        .map(|f| {
            let mut source_of = vec![0; rows * cols];
            for r in 0..rows {
                for c in 0..cols {
                    let (tr, tc) = f(rows, cols, r, c);
                    source_of[tr * cols + tc] = r * cols + c;
                }
            }
            source_of
        })
        .collect()
}

/* TESTS */
