use game_types::{PatternOffer, Polarity, STAMP_CELLS, StampMask};
use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

const X: bool = true;
const O: bool = false;

/// Hand-picked stamps dealt most of the time.
#[rustfmt::skip]
pub const PATTERN_CATALOG: [StampMask; 15] = [
    StampMask([X, X, X, X, X, X, X, X, X]),
    StampMask([X, O, X, O, X, O, X, O, X]),
    StampMask([O, X, O, X, X, X, O, X, O]),
    StampMask([X, X, X, O, O, O, O, O, O]),
    StampMask([X, O, O, O, X, O, O, O, X]),
    StampMask([X, X, O, X, X, O, O, O, O]),
    StampMask([O, O, O, X, X, X, O, O, O]),
    StampMask([X, O, O, O, X, O, O, O, O]),
    StampMask([O, X, O, O, X, O, O, X, O]),
    StampMask([X, X, X, O, O, O, X, X, X]),
    StampMask([O, O, X, O, X, O, X, O, O]),
    StampMask([X, O, X, O, O, O, X, O, X]),
    StampMask([O, X, X, O, X, X, O, O, O]),
    StampMask([X, X, O, O, X, O, O, X, X]),
    StampMask([O, O, O, O, X, O, O, O, O]),
];

const CATALOG_PROBABILITY: f64 = 0.7;
const ADDITIVE_PROBABILITY: f64 = 0.6;

/// A stamp with 2 to 8 cells set at random positions.
pub fn random_mask<R: Rng + ?Sized>(rng: &mut R) -> StampMask {
    let filled = rng.gen_range(2..=8);
    let mut positions: Vec<usize> = (0..STAMP_CELLS).collect();
    positions.shuffle(rng);

    let mut cells = [false; STAMP_CELLS];
    for &pos in positions.iter().take(filled) {
        cells[pos] = true;
    }
    StampMask(cells)
}

/// Deals a hand of stamps for the player about to move.
pub fn deal_offers<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<PatternOffer> {
    (0..count)
        .map(|_| {
            let polarity = if rng.gen_bool(ADDITIVE_PROBABILITY) {
                Polarity::Additive
            } else {
                Polarity::Subtractive
            };
            let mask = if rng.gen_bool(CATALOG_PROBABILITY) {
                PATTERN_CATALOG[rng.gen_range(0..PATTERN_CATALOG.len())]
            } else {
                random_mask(rng)
            };

            PatternOffer {
                id: format!("pattern-{}", Uuid::new_v4()),
                mask,
                polarity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_random_mask_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let count = random_mask(&mut rng).count();
            assert!((2..=8).contains(&count), "got {} cells", count);
        }
    }

    #[test]
    fn test_deal_offers() {
        let mut rng = StdRng::seed_from_u64(1);
        let offers = deal_offers(5, &mut rng);
        assert_eq!(offers.len(), 5);

        let ids: HashSet<_> = offers.iter().map(|offer| offer.id.clone()).collect();
        assert_eq!(ids.len(), 5);
        assert!(offers.iter().all(|offer| offer.mask.count() >= 1));
    }

    #[test]
    fn test_deal_mixes_polarities() {
        let mut rng = StdRng::seed_from_u64(3);
        let offers = deal_offers(200, &mut rng);
        let additive = offers
            .iter()
            .filter(|offer| offer.polarity == Polarity::Additive)
            .count();
        // 60% expected; generous bounds for a seeded draw
        assert!(additive > 80 && additive < 160, "additive = {}", additive);
    }
}
