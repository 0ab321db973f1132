/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use uci_parser::UciScore;

/// A numerical evaluation of a position, in units of ["centipawns"](https://www.chessprogramming.org/Score).
///
/// Scores are absolute: a positive score favors White (the maximizing side),
/// a negative score favors Black.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(pub i32);

impl Score {
    /// Window sentinel. Strictly larger than any score a search can produce.
    pub const INF: Self = Self(i16::MAX as i32);

    /// Score of a checkmate, from the winner's side.
    pub const MATE: Self = Self(10_000);

    /// Any score at least this far from zero is a forced mate.
    pub const MATE_THRESHOLD: Self = Self(9_000);

    /// Drawn, or dead equal.
    pub const DRAW: Self = Self(0);

    /// Creates a new [`Score`] from a number of centipawns.
    #[inline(always)]
    pub const fn new(centipawns: i32) -> Self {
        Self(centipawns)
    }

    /// Returns the raw number of centipawns in this score.
    #[inline(always)]
    pub const fn inner(&self) -> i32 {
        self.0
    }

    /// Whether this score can only come from a forced mate.
    #[inline(always)]
    pub const fn is_mate(&self) -> bool {
        self.abs().0 >= Self::MATE_THRESHOLD.0
    }

    /// Returns this score in pawn units (centipawns divided by 100).
    #[inline(always)]
    pub fn pawns(self) -> f32 {
        self.0 as f32 / 100.0
    }

    /// Pushes a mate score away from zero by `depth` remaining plies.
    ///
    /// A mate discovered with more search depth remaining is closer to the root,
    /// so it must outrank a mate found deeper in the tree.
    #[inline(always)]
    pub fn prefer_sooner(self, depth: u8) -> Self {
        if !self.is_mate() {
            self
        } else if self > Self::DRAW {
            self + depth as i32
        } else {
            self - depth as i32
        }
    }

    /// Distance from [`Score::DRAW`], ignoring which side is favored.
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(if self.0 < 0 { -self.0 } else { self.0 })
    }

    /// Number of plies from the root to the mate this score describes.
    ///
    /// Terminal nodes add their remaining depth to [`Score::MATE`], so a mate found by a
    /// search of `depth` plies sits `depth` minus that remainder away from the root.
    #[inline(always)]
    pub const fn plies_to_mate(self, depth: u8) -> i32 {
        let remaining = self.abs().0 - Self::MATE.0;
        let plies = depth as i32 - remaining;

        if plies < 1 {
            1
        } else {
            plies
        }
    }

    /// Full moves until mate, positive if White delivers it.
    #[inline(always)]
    pub const fn moves_to_mate(self, depth: u8) -> i32 {
        let moves = (self.plies_to_mate(depth) + 1) / 2;

        if self.0 > 0 {
            moves
        } else {
            -moves
        }
    }

    /// Converts this [`Score`] from a search of `depth` plies into a [`UciScore`] for
    /// the `info score` message.
    ///
    /// Like centipawn scores, mates are reported from White's side.
    #[inline(always)]
    pub fn into_uci(self, depth: u8) -> UciScore {
        if self.is_mate() {
            UciScore::mate(self.moves_to_mate(depth))
        } else {
            UciScore::cp(self.inner())
        }
    }
}

/// Implements `Score <op> Score` and `Score <op> i32`, plus the assigning form of each operator.
macro_rules! score_ops {
    ($($op:ident :: $method:ident, $op_assign:ident :: $method_assign:ident;)*) => {$(
        impl std::ops::$op for Score {
            type Output = Self;
            #[inline(always)]
            fn $method(self, rhs: Self) -> Self {
                Self(std::ops::$op::$method(self.0, rhs.0))
            }
        }

        impl std::ops::$op<i32> for Score {
            type Output = Self;
            #[inline(always)]
            fn $method(self, rhs: i32) -> Self {
                Self(std::ops::$op::$method(self.0, rhs))
            }
        }

        impl std::ops::$op_assign for Score {
            #[inline(always)]
            fn $method_assign(&mut self, rhs: Self) {
                *self = std::ops::$op::$method(*self, rhs);
            }
        }

        impl std::ops::$op_assign<i32> for Score {
            #[inline(always)]
            fn $method_assign(&mut self, rhs: i32) {
                *self = std::ops::$op::$method(*self, rhs);
            }
        }
    )*};
}

score_ops! {
    Add::add, AddAssign::add_assign;
    Sub::sub, SubAssign::sub_assign;
    Mul::mul, MulAssign::mul_assign;
}

impl std::ops::Neg for Score {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// Centipawns by default, signed pawn units with `{:#}`.
impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.alternate() {
            true => write!(f, "{:+.2}", self.pawns()),
            false => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_threshold() {
        assert!(Score::MATE.is_mate());
        assert!((-Score::MATE).is_mate());
        assert!(!Score::new(900).is_mate());
        assert!(Score::INF > Score::MATE + 255);
    }

    #[test]
    fn test_operators() {
        let mut score = Score::new(40);
        score += 10;
        score -= Score::new(20);
        score *= -2;

        assert_eq!(score, Score::new(-60));
        assert_eq!(score.abs(), Score::new(60));
        assert_eq!(-score + Score::new(1), Score::new(61));
    }

    #[test]
    fn test_moves_to_mate() {
        // White mates with its first move of a 4-ply search
        let score = Score::MATE.prefer_sooner(3);
        assert!(score.is_mate());
        assert_eq!(score.plies_to_mate(4), 1);
        assert_eq!(score.moves_to_mate(4), 1);

        // Black mates on the fourth ply of a 6-ply search
        let score = (-Score::MATE).prefer_sooner(2);
        assert_eq!(score.plies_to_mate(6), 4);
        assert_eq!(score.moves_to_mate(6), -2);

        // White mates on the third ply
        assert_eq!(Score::MATE.prefer_sooner(1).moves_to_mate(4), 2);

        // A mate seen only by a static evaluation is at least one ply away
        assert_eq!(Score::MATE.plies_to_mate(0), 1);
    }

    #[test]
    fn test_prefer_sooner() {
        assert_eq!(Score::MATE.prefer_sooner(3), Score::new(10_003));
        assert_eq!((-Score::MATE).prefer_sooner(3), Score::new(-10_003));
        assert_eq!(Score::new(150).prefer_sooner(3), Score::new(150));
        assert!(Score::MATE.prefer_sooner(4) > Score::MATE.prefer_sooner(2));
    }

    #[test]
    fn test_pawn_units() {
        assert_eq!(Score::new(-850).pawns(), -8.5);
        assert_eq!(format!("{:#}", Score::new(125)), "+1.25");
        assert_eq!(format!("{}", Score::new(125)), "125");
    }
}
