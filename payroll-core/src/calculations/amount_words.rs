//! Check-style spelling of dollar amounts, e.g.
//! `4075.00` → `FOUR THOUSAND SEVENTY FIVE DOLLARS AND 00/100`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::calculations::common::round_half_up;

const ONES: [&str; 20] = [
    "", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE", "TEN", "ELEVEN",
    "TWELVE", "THIRTEEN", "FOURTEEN", "FIFTEEN", "SIXTEEN", "SEVENTEEN", "EIGHTEEN", "NINETEEN",
];

const TENS: [&str; 10] = [
    "", "", "TWENTY", "THIRTY", "FORTY", "FIFTY", "SIXTY", "SEVENTY", "EIGHTY", "NINETY",
];

const SCALES: [(u64, &str); 3] = [
    (1_000_000_000, "BILLION"),
    (1_000_000, "MILLION"),
    (1_000, "THOUSAND"),
];

/// Largest amount that can be spelled (just under one trillion dollars).
const LIMIT: u64 = 1_000_000_000_000;

fn push_below_thousand(mut n: u64, words: &mut Vec<&'static str>) {
    if n >= 100 {
        words.push(ONES[(n / 100) as usize]);
        words.push("HUNDRED");
        n %= 100;
    }
    if n >= 20 {
        words.push(TENS[(n / 10) as usize]);
        n %= 10;
    }
    if n > 0 {
        words.push(ONES[n as usize]);
    }
}

/// Spells `amount` after rounding it to the cent.
///
/// Returns `None` for negative amounts and for a trillion dollars or more.
pub fn amount_in_words(amount: Decimal) -> Option<String> {
    let amount = round_half_up(amount);
    if amount < Decimal::ZERO {
        return None;
    }
    let dollars = amount.trunc().to_u64()?;
    if dollars >= LIMIT {
        return None;
    }
    let cents = ((amount - amount.trunc()) * Decimal::ONE_HUNDRED).to_u64()?;

    let mut words = Vec::new();
    let mut rest = dollars;
    for (scale, name) in SCALES {
        if rest >= scale {
            push_below_thousand(rest / scale, &mut words);
            words.push(name);
            rest %= scale;
        }
    }
    push_below_thousand(rest, &mut words);

    let spelled = if words.is_empty() {
        "ZERO".to_string()
    } else {
        words.join(" ")
    };

    Some(format!("{spelled} DOLLARS AND {cents:02}/100"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn words(amount: Decimal) -> String {
        amount_in_words(amount).unwrap()
    }

    #[test]
    fn spells_thousands_without_and() {
        assert_eq!(
            words(dec!(4075.00)),
            "FOUR THOUSAND SEVENTY FIVE DOLLARS AND 00/100"
        );
    }

    #[test]
    fn spells_cents_as_fraction() {
        assert_eq!(words(dec!(1478.27)), "ONE THOUSAND FOUR HUNDRED SEVENTY EIGHT DOLLARS AND 27/100");
    }

    #[test]
    fn spells_zero_and_teens() {
        assert_eq!(words(dec!(0.05)), "ZERO DOLLARS AND 05/100");
        assert_eq!(words(dec!(13)), "THIRTEEN DOLLARS AND 00/100");
        assert_eq!(words(dec!(115000)), "ONE HUNDRED FIFTEEN THOUSAND DOLLARS AND 00/100");
    }

    #[test]
    fn spells_millions_and_billions() {
        assert_eq!(
            words(dec!(2000001.10)),
            "TWO MILLION ONE DOLLARS AND 10/100"
        );
        assert_eq!(
            words(dec!(3000000000)),
            "THREE BILLION DOLLARS AND 00/100"
        );
    }

    #[test]
    fn rounds_to_the_cent_first() {
        assert_eq!(words(dec!(19.995)), "TWENTY DOLLARS AND 00/100");
    }

    #[test]
    fn rejects_negative_and_oversized_amounts() {
        assert_eq!(amount_in_words(dec!(-1)), None);
        assert_eq!(amount_in_words(dec!(1000000000000)), None);
    }
}
