//! Clusters pivots into candidate support/resistance levels, generalizing
//! the teacher's single-best-cluster search into every cluster above a
//! minimum size so the detector can rank candidate ranges.

use crate::pivots::Pivot;
use rust_decimal::Decimal;
use wyckoff_core::levels::LevelVote;

/// Groups pivots whose prices lie within `tolerance` (relative) of each
/// other, keeping only clusters with at least `min_touches` members.
/// Strength is `min(100, touches * 20)` — two touches already makes a
/// level worth treating as support/resistance, five or more saturates it.
pub fn cluster_pivots(pivots: &[Pivot], tolerance: Decimal, min_touches: usize) -> Vec<LevelVote> {
    let mut sorted: Vec<&Pivot> = pivots.iter().collect();
    sorted.sort_by(|a, b| a.price.cmp(&b.price));

    let mut used = vec![false; sorted.len()];
    let mut clusters = Vec::new();

    for i in 0..sorted.len() {
        if used[i] {
            continue;
        }
        let anchor = sorted[i].price;
        let mut members = vec![i];
        for j in (i + 1)..sorted.len() {
            if used[j] {
                continue;
            }
            let diff = ((sorted[j].price - anchor) / anchor).abs();
            if diff <= tolerance {
                members.push(j);
            } else {
                break; // sorted by price: once outside tolerance, later ones are too
            }
        }
        if members.len() < min_touches {
            continue;
        }
        for &m in &members {
            used[m] = true;
        }
        let sum: Decimal = members.iter().map(|&m| sorted[m].price).sum();
        let price = sum / Decimal::from(members.len());
        let strength = Decimal::from(members.len() * 20).min(Decimal::from(100));
        let provenance = members.iter().map(|&m| sorted[m].index).collect();
        clusters.push(LevelVote {
            price,
            strength,
            provenance,
        });
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivots::PivotKind;
    use rust_decimal_macros::dec;

    #[test]
    fn groups_close_prices_and_drops_singletons() {
        let pivots = vec![
            Pivot { index: 0, price: dec!(100.0), kind: PivotKind::Low },
            Pivot { index: 5, price: dec!(100.5), kind: PivotKind::Low },
            Pivot { index: 9, price: dec!(101.0), kind: PivotKind::Low },
            Pivot { index: 12, price: dec!(150.0), kind: PivotKind::Low },
        ];
        let clusters = cluster_pivots(&pivots, dec!(0.02), 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].provenance.len(), 3);
    }
}
