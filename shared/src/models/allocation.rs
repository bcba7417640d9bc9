//! Overflow allocation strategy for milk that has no tank yet

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TankNumber;

/// How a volume should be distributed across Tank A and Tank B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// The whole volume goes into one tank
    SingleTank { tank: TankNumber, volume: Decimal },
    /// Fill Tank A first, the rest goes to Tank B
    Split { tank_a: Decimal, tank_b: Decimal },
    /// Both tanks are filled and the shortfall needs immediate action
    Overflow {
        tank_a: Decimal,
        tank_b: Decimal,
        shortfall: Decimal,
    },
}

impl AllocationStrategy {
    pub fn allocated_to(&self, tank: TankNumber) -> Decimal {
        match (self, tank) {
            (AllocationStrategy::SingleTank { tank: t, volume }, tank) if *t == tank => *volume,
            (AllocationStrategy::SingleTank { .. }, _) => Decimal::ZERO,
            (AllocationStrategy::Split { tank_a, .. }, TankNumber::TankA)
            | (AllocationStrategy::Overflow { tank_a, .. }, TankNumber::TankA) => *tank_a,
            (AllocationStrategy::Split { tank_b, .. }, TankNumber::TankB)
            | (AllocationStrategy::Overflow { tank_b, .. }, TankNumber::TankB) => *tank_b,
            _ => Decimal::ZERO,
        }
    }

    /// Volume that could not be placed in any tank
    pub fn remainder(&self) -> Decimal {
        match self {
            AllocationStrategy::Overflow { shortfall, .. } => *shortfall,
            _ => Decimal::ZERO,
        }
    }

    pub fn requires_immediate_action(&self) -> bool {
        matches!(self, AllocationStrategy::Overflow { .. })
    }
}

/// Choose where `volume` litres should go given each tank's remaining capacity.
///
/// 1. Fits in both tanks: the one with more room (Tank A on a tie).
/// 2. Fits in exactly one tank: that tank.
/// 3. Fits in both combined: fill Tank A, the remainder goes to Tank B.
/// 4. Otherwise fill both and report the shortfall.
pub fn suggest_strategy(
    volume: Decimal,
    tank_a_remaining: Decimal,
    tank_b_remaining: Decimal,
) -> AllocationStrategy {
    let volume = volume.max(Decimal::ZERO);
    let a = tank_a_remaining.max(Decimal::ZERO);
    let b = tank_b_remaining.max(Decimal::ZERO);

    let fits_a = volume <= a;
    let fits_b = volume <= b;

    match (fits_a, fits_b) {
        (true, true) => {
            let tank = if a >= b { TankNumber::TankA } else { TankNumber::TankB };
            AllocationStrategy::SingleTank { tank, volume }
        }
        (true, false) => AllocationStrategy::SingleTank {
            tank: TankNumber::TankA,
            volume,
        },
        (false, true) => AllocationStrategy::SingleTank {
            tank: TankNumber::TankB,
            volume,
        },
        (false, false) if volume <= a + b => {
            let tank_a = volume.min(a);
            let tank_b = (volume - tank_a).min(b);
            AllocationStrategy::Split { tank_a, tank_b }
        }
        (false, false) => AllocationStrategy::Overflow {
            tank_a: a,
            tank_b: b,
            shortfall: volume - (a + b),
        },
    }
}
