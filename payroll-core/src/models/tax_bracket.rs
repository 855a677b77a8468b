use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One marginal bracket: income up to `upper_bound` (exclusive of the
/// previous bracket's bound) is taxed at `rate`. `None` marks the top
/// bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(upper_bound: Option<Decimal>, rate: Decimal) -> Self {
        Self { upper_bound, rate }
    }
}

/// Brackets ordered by ascending upper bound, ending with an unbounded one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BracketSchedule {
    brackets: Vec<TaxBracket>,
}

impl BracketSchedule {
    pub fn new(brackets: Vec<TaxBracket>) -> Self {
        Self { brackets }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    /// Checks ordering: bounds strictly ascending, exactly one unbounded
    /// bracket and it is last, rates within [0, 1].
    pub fn is_well_formed(&self) -> bool {
        let Some((last, init)) = self.brackets.split_last() else {
            return false;
        };
        if last.upper_bound.is_some() {
            return false;
        }
        let mut previous = Decimal::ZERO;
        for bracket in init {
            match bracket.upper_bound {
                Some(bound) if bound > previous => previous = bound,
                _ => return false,
            }
        }
        self.brackets
            .iter()
            .all(|b| b.rate >= Decimal::ZERO && b.rate <= Decimal::ONE)
    }
}
