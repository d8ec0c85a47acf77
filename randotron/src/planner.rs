//! Randomized game planning.
//!
//! Planning is pure: given a [Profile], a game, and a random source, [plan]
//! returns the same [Plan] every time. Bots seed their own [rand::Rng] so
//! plans are reproducible from the fleet seed.

use crate::payload::{
    Action, BaccaratBet, CrapsBet, RouletteBet, SicBoBet, SideBet, Signal, TableBet,
};
use nullspace_types::GameType;
use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
    Rng,
};

/// Chip denominations a bet is rounded to.
pub const DENOMINATIONS: [u64; 8] = [5, 10, 25, 50, 100, 250, 500, 1_000];

/// Chance of playing one of the profile's favorite games.
pub const FAVORITE_BIAS: f64 = 0.7;

/// Largest fraction of the main wager a side bet may be.
pub const SIDE_BET_CAP: f64 = 0.5;

/// How a bot bets. Fixed for the bot's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub base_bet: u64,
    /// 0 plays tight, 1 plays loose.
    pub volatility: f64,
    pub favorites: Vec<GameType>,
}

impl Profile {
    /// A random profile: base bet from the lower denominations, one to three
    /// distinct favorite games.
    pub fn random(rng: &mut impl Rng) -> Self {
        let base_bet = *DENOMINATIONS[..5].choose(rng).unwrap_or(&DENOMINATIONS[0]);
        let volatility = rng.gen_range(0.0..=1.0);
        let count = rng.gen_range(1..=3);
        let favorites = GameType::ALL.choose_multiple(rng, count).copied().collect();
        Self {
            base_bet,
            volatility,
            favorites,
        }
    }

    fn volatility(&self) -> f64 {
        if self.volatility.is_finite() {
            self.volatility.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// A full game: the opening bet and the moves that follow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub game: GameType,
    pub starting_bet: u64,
    pub moves: Vec<Action>,
}

/// Pick the next game, preferring favorites.
pub fn choose_game(profile: &Profile, rng: &mut impl Rng) -> GameType {
    if !profile.favorites.is_empty() && rng.gen_bool(FAVORITE_BIAS) {
        if let Some(game) = profile.favorites.choose(rng) {
            return *game;
        }
    }
    GameType::ALL[rng.gen_range(0..GameType::ALL.len())]
}

/// Size a wager: scale the base bet by a random factor that widens with
/// volatility, then snap to a denomination with inverse-distance weights.
pub fn size_bet(profile: &Profile, rng: &mut impl Rng) -> u64 {
    let spread = 0.25 + profile.volatility();
    let low = (1.0 - spread).max(0.1);
    let factor = rng.gen_range(low..=1.0 + spread);
    let target = profile.base_bet as f64 * factor;

    let weights = DENOMINATIONS.map(|d| 1.0 / ((d as f64 - target).abs() + 1.0));
    match WeightedIndex::new(weights) {
        Ok(dist) => DENOMINATIONS[dist.sample(rng)],
        Err(_) => DENOMINATIONS[0],
    }
}

/// Roll for a side wager gated by `chance × volatility` and capped at half
/// of `main`.
fn side_bet(profile: &Profile, rng: &mut impl Rng, chance: f64, main: u64) -> Option<u64> {
    let gate = (chance * profile.volatility()).clamp(0.0, 1.0);
    if !rng.gen_bool(gate) {
        return None;
    }
    let cap = (main as f64 * SIDE_BET_CAP) as u64;
    let amount = size_bet(profile, rng).min(cap);
    (amount >= 1).then_some(amount)
}

/// Plan one game of `game` for `profile`.
pub fn plan(profile: &Profile, game: GameType, rng: &mut impl Rng) -> Plan {
    let main = size_bet(profile, rng);
    let vol = profile.volatility();
    let mut moves = Vec::new();
    let starting_bet = if game.places_bets_in_moves() { 0 } else { main };

    match game {
        GameType::Baccarat => {
            let side = [BaccaratBet::Player, BaccaratBet::Banker, BaccaratBet::Tie];
            let weights = [45, 45, 10];
            let primary = match WeightedIndex::new(weights) {
                Ok(dist) => side[dist.sample(rng)],
                Err(_) => BaccaratBet::Banker,
            };
            let mut bets = vec![(primary, main)];
            if let Some(amount) = side_bet(profile, rng, 0.4, main) {
                if let Some(extra) = BaccaratBet::SIDE.choose(rng) {
                    bets.push((*extra, amount));
                }
            }
            moves.push(Action::AtomicBatch { bets });
        }
        GameType::Blackjack => {
            if let Some(amount) = side_bet(profile, rng, 0.5, main) {
                moves.push(Action::SideBet {
                    bet: SideBet::TwentyOnePlusThree,
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::BlackjackDeal));
            for _ in 0..rng.gen_range(0..=2) {
                moves.push(Action::Signal(Signal::BlackjackHit));
            }
            moves.push(Action::Signal(Signal::BlackjackStand));
            moves.push(Action::Signal(Signal::BlackjackReveal));
        }
        GameType::CasinoWar => {
            if let Some(amount) = side_bet(profile, rng, 0.3, main) {
                moves.push(Action::SideBet {
                    bet: SideBet::Tie,
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::WarPlay));
        }
        GameType::Craps => {
            let line = if rng.gen_bool(0.8) {
                CrapsBet::Pass
            } else {
                CrapsBet::DontPass
            };
            moves.push(Action::TableBet {
                bet: TableBet::Craps(line),
                amount: main,
            });
            if let Some(amount) = side_bet(profile, rng, 0.6, main) {
                let extra = match rng.gen_range(0..4) {
                    0 => CrapsBet::Field,
                    1 => CrapsBet::Hardway(*[4, 6, 8, 10].choose(rng).unwrap_or(&6)),
                    2 => CrapsBet::Yes(*[4, 5, 6, 8, 9, 10].choose(rng).unwrap_or(&6)),
                    _ => CrapsBet::Next(rng.gen_range(2..=12)),
                };
                moves.push(Action::TableBet {
                    bet: TableBet::Craps(extra),
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::CrapsRoll));
        }
        GameType::VideoPoker => {
            moves.push(Action::Hold {
                mask: rng.gen_range(0..32),
            });
        }
        GameType::HiLo => {
            for _ in 0..rng.gen_range(1..=3) {
                let guess = if rng.gen_bool(0.5) {
                    Signal::HiLoHigher
                } else {
                    Signal::HiLoLower
                };
                moves.push(Action::Signal(guess));
            }
            moves.push(Action::Signal(Signal::HiLoCashout));
        }
        GameType::Roulette => {
            moves.push(Action::TableBet {
                bet: TableBet::Roulette(roulette_bet(rng)),
                amount: main,
            });
            if let Some(amount) = side_bet(profile, rng, 0.8, main) {
                moves.push(Action::TableBet {
                    bet: TableBet::Roulette(roulette_bet(rng)),
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::RouletteSpin));
        }
        GameType::SicBo => {
            let primary = match rng.gen_range(0..4) {
                0 => SicBoBet::Small,
                1 => SicBoBet::Big,
                2 => SicBoBet::Odd,
                _ => SicBoBet::Even,
            };
            moves.push(Action::TableBet {
                bet: TableBet::SicBo(primary),
                amount: main,
            });
            if let Some(amount) = side_bet(profile, rng, 0.7, main) {
                let face = rng.gen_range(1..=6);
                let extra = match rng.gen_range(0..5) {
                    0 => SicBoBet::SpecificTriple(face),
                    1 => SicBoBet::SpecificDouble(face),
                    2 => SicBoBet::Total(rng.gen_range(3..=18)),
                    3 => SicBoBet::Single(face),
                    _ => {
                        let low = rng.gen_range(1..=5);
                        SicBoBet::Domino(low, rng.gen_range(low + 1..=6))
                    }
                };
                moves.push(Action::TableBet {
                    bet: TableBet::SicBo(extra),
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::SicBoRoll));
        }
        GameType::ThreeCard => {
            if let Some(amount) = side_bet(profile, rng, 0.7, main) {
                moves.push(Action::SideBet {
                    bet: SideBet::Pairplus,
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::ThreeCardDeal));
            if rng.gen_bool((0.5 + 0.4 * vol).min(1.0)) {
                moves.push(Action::Signal(Signal::ThreeCardPlay));
                moves.push(Action::Signal(Signal::ThreeCardReveal));
            } else {
                moves.push(Action::Signal(Signal::ThreeCardFold));
            }
        }
        GameType::UltimateHoldem => {
            if let Some(amount) = side_bet(profile, rng, 0.6, main) {
                moves.push(Action::SideBet {
                    bet: SideBet::Trips,
                    amount,
                });
            }
            moves.push(Action::Signal(Signal::HoldemDeal));
            holdem_streets(vol, rng, &mut moves);
        }
    }

    Plan {
        game,
        starting_bet,
        moves,
    }
}

fn roulette_bet(rng: &mut impl Rng) -> RouletteBet {
    match rng.gen_range(0..10) {
        0 => RouletteBet::Red,
        1 => RouletteBet::Black,
        2 => RouletteBet::Even,
        3 => RouletteBet::Odd,
        4 => RouletteBet::Low,
        5 => RouletteBet::High,
        6 => RouletteBet::Dozen(rng.gen_range(0..=2)),
        7 => RouletteBet::Column(rng.gen_range(0..=2)),
        _ => RouletteBet::Straight(rng.gen_range(0..=36)),
    }
}

/// Preflop, flop, then river. Raising on a street reveals and ends the hand;
/// the river either bets or folds.
fn holdem_streets(vol: f64, rng: &mut impl Rng, moves: &mut Vec<Action>) {
    let streets = [
        (Signal::HoldemBet4x, 0.2 + 0.3 * vol),
        (Signal::HoldemBet2x, 0.3 + 0.3 * vol),
    ];
    for (raise, chance) in streets {
        if rng.gen_bool(chance) {
            moves.push(Action::Signal(raise));
            moves.push(Action::Signal(Signal::HoldemReveal));
            return;
        }
        moves.push(Action::Signal(Signal::HoldemCheck));
    }
    if rng.gen_bool(0.6 + 0.3 * vol) {
        moves.push(Action::Signal(Signal::HoldemBet1x));
        moves.push(Action::Signal(Signal::HoldemReveal));
    } else {
        moves.push(Action::Signal(Signal::HoldemFold));
    }
}
