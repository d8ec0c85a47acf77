//! Move payload encoding.
//!
//! Every move a bot can make is an [Action]. Encoding is a total function
//! over that type: it either produces the exact byte layout the execution
//! layer expects or an [EncodeError], and nothing is ever sent for an action
//! that failed to encode.
//!
//! Layouts (multi-byte integers are big-endian):
//!
//! | action | bytes |
//! |---|---|
//! | table bet | `[0][bet_type][target][amount:u64]` |
//! | side bet | `[action][amount:u64]` |
//! | atomic batch | `[3][count]` then `count` × `[bet_type][amount:u64]` |
//! | signal | `[action]` |
//! | hold | `[mask]` |

use nullspace_types::{
    execution::{Instruction, CASINO_MAX_PAYLOAD_LENGTH},
    GameType,
};
use thiserror::Error;

/// Leading byte of a table bet.
pub const TABLE_BET_TAG: u8 = 0;
/// Leading byte of a baccarat atomic batch.
pub const ATOMIC_BATCH_TAG: u8 = 3;

pub const TABLE_BET_SIZE: usize = 11;
pub const SIDE_BET_SIZE: usize = 9;
pub const BATCH_ENTRY_SIZE: usize = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("amount must be a finite positive number")]
    InvalidAmount,
    #[error("invalid target {target} for {game} bet type {bet_type}")]
    InvalidTarget {
        game: GameType,
        bet_type: u8,
        target: u8,
    },
    #[error("unknown {game} bet type {bet_type}")]
    UnknownBetType { game: GameType, bet_type: u8 },
    #[error("batch must hold 1 to 255 bets, got {0}")]
    BatchSize(usize),
    #[error("hold mask {0:#04x} has bits beyond five cards")]
    HoldMask(u8),
    #[error("{0} requires a nonzero starting bet")]
    ZeroStartingBet(GameType),
    #[error("{action} move cannot be played in a {session} session")]
    WrongGame { action: GameType, session: GameType },
    #[error("payload of {0} bytes exceeds the move limit")]
    PayloadTooLarge(usize),
    #[error("malformed payload")]
    Malformed,
}

/// Convert a sized wager into chips, rejecting anything that is not a finite
/// positive whole amount.
pub fn amount_from_f64(amount: f64) -> Result<u64, EncodeError> {
    if !amount.is_finite() || amount < 1.0 || amount >= u64::MAX as f64 {
        return Err(EncodeError::InvalidAmount);
    }
    Ok(amount.floor() as u64)
}

fn positive(amount: u64) -> Result<u64, EncodeError> {
    if amount == 0 {
        return Err(EncodeError::InvalidAmount);
    }
    Ok(amount)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouletteBet {
    /// Single number, 0..=36.
    Straight(u8),
    Red,
    Black,
    Even,
    Odd,
    Low,
    High,
    /// 0 = 1-12, 1 = 13-24, 2 = 25-36.
    Dozen(u8),
    /// 0..=2.
    Column(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrapsBet {
    Pass,
    DontPass,
    Come,
    DontCome,
    Field,
    /// Place-style bet that the number hits before a 7.
    Yes(u8),
    /// Lay-style bet that a 7 hits before the number.
    No(u8),
    /// One-roll bet on the next total.
    Next(u8),
    /// Hard 4, 6, 8, or 10.
    Hardway(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SicBoBet {
    Small,
    Big,
    Odd,
    Even,
    SpecificTriple(u8),
    AnyTriple,
    SpecificDouble(u8),
    /// Total of the three dice, 3..=18.
    Total(u8),
    Single(u8),
    /// Two distinct faces, lower first.
    Domino(u8, u8),
}

/// A `[0][bet_type][target][amount]` wager on one of the table games.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableBet {
    Roulette(RouletteBet),
    Craps(CrapsBet),
    SicBo(SicBoBet),
}

fn die(face: u8) -> bool {
    (1..=6).contains(&face)
}

impl TableBet {
    pub fn game(&self) -> GameType {
        match self {
            TableBet::Roulette(_) => GameType::Roulette,
            TableBet::Craps(_) => GameType::Craps,
            TableBet::SicBo(_) => GameType::SicBo,
        }
    }

    /// The `(bet_type, target)` pair, validated.
    pub fn codes(&self) -> Result<(u8, u8), EncodeError> {
        let (bet_type, target, valid) = match *self {
            TableBet::Roulette(bet) => match bet {
                RouletteBet::Straight(n) => (0, n, n <= 36),
                RouletteBet::Red => (1, 0, true),
                RouletteBet::Black => (2, 0, true),
                RouletteBet::Even => (3, 0, true),
                RouletteBet::Odd => (4, 0, true),
                RouletteBet::Low => (5, 0, true),
                RouletteBet::High => (6, 0, true),
                RouletteBet::Dozen(n) => (7, n, n <= 2),
                RouletteBet::Column(n) => (8, n, n <= 2),
            },
            TableBet::Craps(bet) => match bet {
                CrapsBet::Pass => (0, 0, true),
                CrapsBet::DontPass => (1, 0, true),
                CrapsBet::Come => (2, 0, true),
                CrapsBet::DontCome => (3, 0, true),
                CrapsBet::Field => (4, 0, true),
                CrapsBet::Yes(n) => (5, n, matches!(n, 4 | 5 | 6 | 8 | 9 | 10)),
                CrapsBet::No(n) => (6, n, matches!(n, 4 | 5 | 6 | 8 | 9 | 10)),
                CrapsBet::Next(n) => (7, n, (2..=12).contains(&n)),
                CrapsBet::Hardway(4) => (8, 0, true),
                CrapsBet::Hardway(6) => (9, 0, true),
                CrapsBet::Hardway(8) => (10, 0, true),
                CrapsBet::Hardway(10) => (11, 0, true),
                CrapsBet::Hardway(n) => (8, n, false),
            },
            TableBet::SicBo(bet) => match bet {
                SicBoBet::Small => (0, 0, true),
                SicBoBet::Big => (1, 0, true),
                SicBoBet::Odd => (2, 0, true),
                SicBoBet::Even => (3, 0, true),
                SicBoBet::SpecificTriple(n) => (4, n, die(n)),
                SicBoBet::AnyTriple => (5, 0, true),
                SicBoBet::SpecificDouble(n) => (6, n, die(n)),
                SicBoBet::Total(n) => (7, n, (3..=18).contains(&n)),
                SicBoBet::Single(n) => (8, n, die(n)),
                SicBoBet::Domino(low, high) => {
                    (9, (low << 4) | (high & 0x0f), die(low) && die(high) && low < high)
                }
            },
        };
        if !valid {
            return Err(EncodeError::InvalidTarget {
                game: self.game(),
                bet_type,
                target,
            });
        }
        Ok((bet_type, target))
    }

    /// Inverse of [TableBet::codes].
    pub fn from_codes(game: GameType, bet_type: u8, target: u8) -> Result<Self, EncodeError> {
        let bet = match (game, bet_type) {
            (GameType::Roulette, 0) => TableBet::Roulette(RouletteBet::Straight(target)),
            (GameType::Roulette, 1) => TableBet::Roulette(RouletteBet::Red),
            (GameType::Roulette, 2) => TableBet::Roulette(RouletteBet::Black),
            (GameType::Roulette, 3) => TableBet::Roulette(RouletteBet::Even),
            (GameType::Roulette, 4) => TableBet::Roulette(RouletteBet::Odd),
            (GameType::Roulette, 5) => TableBet::Roulette(RouletteBet::Low),
            (GameType::Roulette, 6) => TableBet::Roulette(RouletteBet::High),
            (GameType::Roulette, 7) => TableBet::Roulette(RouletteBet::Dozen(target)),
            (GameType::Roulette, 8) => TableBet::Roulette(RouletteBet::Column(target)),
            (GameType::Craps, 0) => TableBet::Craps(CrapsBet::Pass),
            (GameType::Craps, 1) => TableBet::Craps(CrapsBet::DontPass),
            (GameType::Craps, 2) => TableBet::Craps(CrapsBet::Come),
            (GameType::Craps, 3) => TableBet::Craps(CrapsBet::DontCome),
            (GameType::Craps, 4) => TableBet::Craps(CrapsBet::Field),
            (GameType::Craps, 5) => TableBet::Craps(CrapsBet::Yes(target)),
            (GameType::Craps, 6) => TableBet::Craps(CrapsBet::No(target)),
            (GameType::Craps, 7) => TableBet::Craps(CrapsBet::Next(target)),
            (GameType::Craps, code @ 8..=11) => {
                TableBet::Craps(CrapsBet::Hardway(4 + 2 * (code - 8)))
            }
            (GameType::SicBo, 0) => TableBet::SicBo(SicBoBet::Small),
            (GameType::SicBo, 1) => TableBet::SicBo(SicBoBet::Big),
            (GameType::SicBo, 2) => TableBet::SicBo(SicBoBet::Odd),
            (GameType::SicBo, 3) => TableBet::SicBo(SicBoBet::Even),
            (GameType::SicBo, 4) => TableBet::SicBo(SicBoBet::SpecificTriple(target)),
            (GameType::SicBo, 5) => TableBet::SicBo(SicBoBet::AnyTriple),
            (GameType::SicBo, 6) => TableBet::SicBo(SicBoBet::SpecificDouble(target)),
            (GameType::SicBo, 7) => TableBet::SicBo(SicBoBet::Total(target)),
            (GameType::SicBo, 8) => TableBet::SicBo(SicBoBet::Single(target)),
            (GameType::SicBo, 9) => TableBet::SicBo(SicBoBet::Domino(target >> 4, target & 0x0f)),
            _ => return Err(EncodeError::UnknownBetType { game, bet_type }),
        };

        // Reject targets on bet types that ignore them so decoding is exact.
        if bet.codes()? != (bet_type, target) {
            return Err(EncodeError::InvalidTarget {
                game,
                bet_type,
                target,
            });
        }
        Ok(bet)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BaccaratBet {
    Player = 0,
    Banker = 1,
    Tie = 2,
    PlayerPair = 3,
    BankerPair = 4,
    Lucky6 = 5,
    PlayerDragon = 6,
    BankerDragon = 7,
    Panda8 = 8,
    PerfectPair = 9,
}

impl BaccaratBet {
    pub const SIDE: [BaccaratBet; 7] = [
        BaccaratBet::PlayerPair,
        BaccaratBet::BankerPair,
        BaccaratBet::Lucky6,
        BaccaratBet::PlayerDragon,
        BaccaratBet::BankerDragon,
        BaccaratBet::Panda8,
        BaccaratBet::PerfectPair,
    ];
}

/// Amount-only wagers: `[action][amount]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideBet {
    /// Blackjack 21+3.
    TwentyOnePlusThree,
    /// Casino War tie bet.
    Tie,
    /// Three Card Poker pairplus.
    Pairplus,
    /// Ultimate Texas Hold'em trips.
    Trips,
}

impl SideBet {
    pub fn game(&self) -> GameType {
        match self {
            SideBet::TwentyOnePlusThree => GameType::Blackjack,
            SideBet::Tie => GameType::CasinoWar,
            SideBet::Pairplus => GameType::ThreeCard,
            SideBet::Trips => GameType::UltimateHoldem,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            SideBet::TwentyOnePlusThree => 5,
            SideBet::Tie => 3,
            SideBet::Pairplus => 3,
            SideBet::Trips => 6,
        }
    }
}

/// Zero-argument moves: `[action]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    BlackjackHit,
    BlackjackStand,
    BlackjackDeal,
    BlackjackReveal,
    WarPlay,
    CrapsRoll,
    HiLoHigher,
    HiLoLower,
    HiLoCashout,
    RouletteSpin,
    SicBoRoll,
    ThreeCardPlay,
    ThreeCardFold,
    ThreeCardDeal,
    ThreeCardReveal,
    HoldemCheck,
    HoldemBet4x,
    HoldemBet2x,
    HoldemBet1x,
    HoldemFold,
    HoldemDeal,
    HoldemReveal,
}

impl Signal {
    pub fn game(&self) -> GameType {
        use Signal::*;
        match self {
            BlackjackHit | BlackjackStand | BlackjackDeal | BlackjackReveal => GameType::Blackjack,
            WarPlay => GameType::CasinoWar,
            CrapsRoll => GameType::Craps,
            HiLoHigher | HiLoLower | HiLoCashout => GameType::HiLo,
            RouletteSpin => GameType::Roulette,
            SicBoRoll => GameType::SicBo,
            ThreeCardPlay | ThreeCardFold | ThreeCardDeal | ThreeCardReveal => GameType::ThreeCard,
            HoldemCheck | HoldemBet4x | HoldemBet2x | HoldemBet1x | HoldemFold | HoldemDeal
            | HoldemReveal => GameType::UltimateHoldem,
        }
    }

    pub fn code(&self) -> u8 {
        use Signal::*;
        match self {
            BlackjackHit => 0,
            BlackjackStand => 1,
            BlackjackDeal => 4,
            BlackjackReveal => 6,
            WarPlay => 0,
            CrapsRoll => 2,
            HiLoHigher => 0,
            HiLoLower => 1,
            HiLoCashout => 2,
            RouletteSpin => 1,
            SicBoRoll => 1,
            ThreeCardPlay => 0,
            ThreeCardFold => 1,
            ThreeCardDeal => 2,
            ThreeCardReveal => 4,
            HoldemCheck => 0,
            HoldemBet4x => 1,
            HoldemBet2x => 2,
            HoldemBet1x => 3,
            HoldemFold => 4,
            HoldemDeal => 5,
            HoldemReveal => 7,
        }
    }
}

/// One move within a game session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    TableBet { bet: TableBet, amount: u64 },
    SideBet { bet: SideBet, amount: u64 },
    /// Place every bet and deal in one transaction (baccarat).
    AtomicBatch { bets: Vec<(BaccaratBet, u64)> },
    Signal(Signal),
    /// Video poker hold mask, one bit per card.
    Hold { mask: u8 },
}

impl Action {
    pub fn game(&self) -> GameType {
        match self {
            Action::TableBet { bet, .. } => bet.game(),
            Action::SideBet { bet, .. } => bet.game(),
            Action::AtomicBatch { .. } => GameType::Baccarat,
            Action::Signal(signal) => signal.game(),
            Action::Hold { .. } => GameType::VideoPoker,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            Action::TableBet { bet, amount } => {
                let amount = positive(*amount)?;
                let (bet_type, target) = bet.codes()?;
                let mut out = Vec::with_capacity(TABLE_BET_SIZE);
                out.extend_from_slice(&[TABLE_BET_TAG, bet_type, target]);
                out.extend_from_slice(&amount.to_be_bytes());
                Ok(out)
            }
            Action::SideBet { bet, amount } => {
                let amount = positive(*amount)?;
                let mut out = Vec::with_capacity(SIDE_BET_SIZE);
                out.push(bet.code());
                out.extend_from_slice(&amount.to_be_bytes());
                Ok(out)
            }
            Action::AtomicBatch { bets } => {
                let count =
                    u8::try_from(bets.len()).map_err(|_| EncodeError::BatchSize(bets.len()))?;
                if count == 0 {
                    return Err(EncodeError::BatchSize(0));
                }
                let mut out = Vec::with_capacity(2 + BATCH_ENTRY_SIZE * bets.len());
                out.extend_from_slice(&[ATOMIC_BATCH_TAG, count]);
                for (bet, amount) in bets {
                    let amount = positive(*amount)?;
                    out.push(*bet as u8);
                    out.extend_from_slice(&amount.to_be_bytes());
                }
                Ok(out)
            }
            Action::Signal(signal) => Ok(vec![signal.code()]),
            Action::Hold { mask } => {
                if *mask > 0b1_1111 {
                    return Err(EncodeError::HoldMask(*mask));
                }
                Ok(vec![*mask])
            }
        }
    }
}

/// Decode a table bet payload for `game`.
pub fn decode_table_bet(game: GameType, payload: &[u8]) -> Result<(TableBet, u64), EncodeError> {
    let [tag, bet_type, target, amount @ ..] = payload else {
        return Err(EncodeError::Malformed);
    };
    if *tag != TABLE_BET_TAG {
        return Err(EncodeError::Malformed);
    }
    let amount: [u8; 8] = amount.try_into().map_err(|_| EncodeError::Malformed)?;
    let amount = positive(u64::from_be_bytes(amount))?;
    Ok((TableBet::from_codes(game, *bet_type, *target)?, amount))
}

/// Build the instruction that opens a session.
///
/// Table games charge through their moves and open with a zero bet; every
/// other game needs a positive one.
pub fn start_game(game: GameType, bet: u64, session_id: u64) -> Result<Instruction, EncodeError> {
    if bet == 0 && !game.places_bets_in_moves() {
        return Err(EncodeError::ZeroStartingBet(game));
    }
    Ok(Instruction::CasinoStartGame {
        game_type: game,
        bet,
        session_id,
    })
}

/// Build the instruction that applies `action` to an open `game` session.
pub fn game_move(
    game: GameType,
    session_id: u64,
    action: &Action,
) -> Result<Instruction, EncodeError> {
    if action.game() != game {
        return Err(EncodeError::WrongGame {
            action: action.game(),
            session: game,
        });
    }
    let payload = action.encode()?;
    if payload.len() > CASINO_MAX_PAYLOAD_LENGTH {
        return Err(EncodeError::PayloadTooLarge(payload.len()));
    }
    Ok(Instruction::CasinoGameMove {
        session_id,
        payload,
    })
}
