use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use bytes::{Buf, BufMut};
use std::fmt;

/// Casino game types, numbered as the execution layer numbers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GameType {
    Baccarat = 0,
    Blackjack = 1,
    CasinoWar = 2,
    Craps = 3,
    VideoPoker = 4,
    HiLo = 5,
    Roulette = 6,
    SicBo = 7,
    ThreeCard = 8,
    UltimateHoldem = 9,
}

impl GameType {
    /// Every supported variant, in wire order.
    pub const ALL: [GameType; 10] = [
        GameType::Baccarat,
        GameType::Blackjack,
        GameType::CasinoWar,
        GameType::Craps,
        GameType::VideoPoker,
        GameType::HiLo,
        GameType::Roulette,
        GameType::SicBo,
        GameType::ThreeCard,
        GameType::UltimateHoldem,
    ];

    /// Table games take every wager through move payloads, so their sessions
    /// open with a zero bet.
    pub fn places_bets_in_moves(&self) -> bool {
        matches!(
            self,
            GameType::Baccarat | GameType::Craps | GameType::Roulette | GameType::SicBo
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameType::Baccarat => "baccarat",
            GameType::Blackjack => "blackjack",
            GameType::CasinoWar => "casino_war",
            GameType::Craps => "craps",
            GameType::VideoPoker => "video_poker",
            GameType::HiLo => "hilo",
            GameType::Roulette => "roulette",
            GameType::SicBo => "sic_bo",
            GameType::ThreeCard => "three_card",
            GameType::UltimateHoldem => "ultimate_holdem",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for GameType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        GameType::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidEnum(value))
    }
}

impl Write for GameType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GameType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        GameType::try_from(u8::read(reader)?)
    }
}

impl FixedSize for GameType {
    const SIZE: usize = 1;
}
