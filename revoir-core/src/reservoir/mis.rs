//! Pairwise multiple-importance sampling for direct-illumination streaming.
//!
//! Full MIS over `N` neighbors needs `O(N²)` target-pdf evaluations; the
//! pairwise variant weighs each neighbor only against the canonical sample
//! (the pixel's own reservoir), which costs four pdf evaluations per
//! neighbor and stays within a constant factor of the full weights.

use crate::{DiReservoir, F32Ext};

/// Balance-heuristic weight of the first strategy in a two-strategy pair.
pub fn pairwise_mis_weight(w0: f32, w1: f32, m0: f32, m1: f32) -> f32 {
    let denom = m0 * w0 + m1 * w1;

    if denom <= 0.0 {
        0.0
    } else {
        (m0 * w0).max(0.0) / denom
    }
}

/// Confidence discount for samples whose pdfs disagree between the two
/// surfaces; `1.0` when the sample transfers cleanly.
pub fn m_factor(q0: f32, q1: f32) -> f32 {
    if q0 <= 0.0 {
        1.0
    } else {
        (q1 / q0).min(1.0).powf(8.0).saturate()
    }
}

/// Streams a neighbor reservoir using pairwise MIS against the canonical
/// one.
///
/// The four pdfs involved: the neighbor's own `target_pdf` (its sample at
/// its own surface), `neighbor_at_canonical` (its sample at the canonical
/// surface), `canonical_at_neighbor` (the canonical sample at the neighbor
/// surface) and the canonical's own `target_pdf`. The complement of the
/// canonical-side weight accumulates in `canonical_weight` so that
/// [`stream_canonical_with_pairwise_mis`] can compensate at the end.
#[allow(clippy::too_many_arguments)]
pub fn stream_neighbor_with_pairwise_mis(
    reservoir: &mut DiReservoir,
    random: f32,
    neighbor: &DiReservoir,
    neighbor_at_canonical: f32,
    canonical: &DiReservoir,
    canonical_at_neighbor: f32,
    num_samples: u32,
) -> bool {
    let neighbor_at_neighbor = neighbor.target_pdf;
    let canonical_at_canonical = canonical.target_pdf;

    let neighbor_m = neighbor.m * num_samples as f32;
    let canonical_m = canonical.m;

    let w0 = pairwise_mis_weight(
        neighbor_at_neighbor,
        neighbor_at_canonical,
        neighbor_m,
        canonical_m,
    );

    let w1 = pairwise_mis_weight(
        canonical_at_neighbor,
        canonical_at_canonical,
        neighbor_m,
        canonical_m,
    );

    let m = neighbor.m
        * m_factor(neighbor_at_neighbor, neighbor_at_canonical)
            .min(m_factor(canonical_at_neighbor, canonical_at_canonical));

    reservoir.canonical_weight += 1.0 - w1;

    reservoir.combine_weighted(
        neighbor,
        random,
        neighbor_at_canonical,
        neighbor.weight_sum * w0,
        m,
    )
}

/// Final pairwise step: streams the canonical sample with the weight its
/// neighbors left behind in `canonical_weight`.
pub fn stream_canonical_with_pairwise_mis(
    reservoir: &mut DiReservoir,
    random: f32,
    canonical: &DiReservoir,
) -> bool {
    reservoir.combine_weighted(
        canonical,
        random,
        canonical.target_pdf,
        canonical.weight_sum * reservoir.canonical_weight,
        canonical.m,
    )
}

#[cfg(test)]
mod tests {
    use glam::vec2;

    use super::*;

    #[test]
    fn mis_weights_of_a_pair_sum_to_one() {
        for (w0, w1, m0, m1) in [
            (1.0, 2.0, 3.0, 1.0),
            (0.5, 0.5, 1.0, 1.0),
            (4.0, 0.1, 2.0, 8.0),
        ] {
            let a = pairwise_mis_weight(w0, w1, m0, m1);
            let b = pairwise_mis_weight(w1, w0, m1, m0);

            assert!((a + b - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn mis_weight_of_a_dead_pair_is_zero() {
        assert_eq!(pairwise_mis_weight(0.0, 0.0, 2.0, 3.0), 0.0);
    }

    #[test]
    fn m_factor_is_one_for_transferable_samples() {
        assert_eq!(m_factor(0.0, 123.0), 1.0);
        assert_eq!(m_factor(2.0, 2.0), 1.0);
        assert_eq!(m_factor(2.0, 4.0), 1.0);
    }

    #[test]
    fn m_factor_discounts_disagreeing_pdfs() {
        let factor = m_factor(2.0, 1.0);

        assert!(factor > 0.0 && factor < 0.01);
    }

    #[test]
    fn canonical_weight_accumulates_neighbor_complements() {
        let canonical = DiReservoir::new(0, vec2(0.5, 0.5), 1.0, 1.0);
        let neighbor = DiReservoir::new(1, vec2(0.5, 0.5), 1.0, 1.0);

        let mut reservoir = DiReservoir::default();

        // Symmetric setup: every pdf is 1, one neighbor, so both balance
        // weights are 1/2 and the canonical keeps the other half.
        stream_neighbor_with_pairwise_mis(
            &mut reservoir,
            0.9,
            &neighbor,
            1.0,
            &canonical,
            1.0,
            1,
        );

        assert!((reservoir.canonical_weight - 0.5).abs() < 1e-6);

        stream_canonical_with_pairwise_mis(&mut reservoir, 0.9, &canonical);

        // Both samples streamed with weight 1/2 each.
        assert!((reservoir.weight_sum - 1.0).abs() < 1e-6);
        assert_eq!(reservoir.m, 2.0);
    }
}
