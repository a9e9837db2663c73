use serde::{Deserialize, Serialize};

/// Equilibrium fractions of the ionization states of a chemical at one pH
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ionization {
    pub neutral: f64,
    pub positive: f64,
    pub negative: f64,
    /// Net-neutral species that carry both a positive and a negative group
    pub zwitter: f64,
}

impl Ionization {
    pub fn charged(&self) -> f64 {
        1.0 - self.neutral
    }
}

/// Ionization fractions from the sequential deprotonation scheme.
///
/// All pKa values are sorted ascending. Species `i` has its `i` lowest-pKa groups
/// deprotonated, so its relative abundance is `10^(i pH - sum(pKa_0..pKa_i))`.
/// Protonated acceptors carry a positive charge and deprotonated donors a negative
/// one, giving a net charge of `n_accept - i`.
pub fn calc_ionization(ph: f64, pka_donor: &[f64], pka_accept: &[f64]) -> Ionization {
    if pka_donor.is_empty() && pka_accept.is_empty() {
        return Ionization {
            neutral: 1.0,
            positive: 0.0,
            negative: 0.0,
            zwitter: 0.0,
        };
    }

    // (pKa, is_acceptor)
    let mut groups: Vec<(f64, bool)> = pka_donor
        .iter()
        .map(|&p| (p, false))
        .chain(pka_accept.iter().map(|&p| (p, true)))
        .collect();
    groups.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = groups.len();
    let mut log_weights = Vec::with_capacity(n + 1);
    let mut cumulative = 0.0;
    log_weights.push(0.0);
    for (i, (pka, _)) in groups.iter().enumerate() {
        cumulative += pka;
        log_weights.push((i + 1) as f64 * ph - cumulative);
    }

    let max = log_weights
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = log_weights.iter().map(|w| 10f64.powf(w - max)).collect();
    let total: f64 = weights.iter().sum();

    let mut fractions = Ionization {
        neutral: 0.0,
        positive: 0.0,
        negative: 0.0,
        zwitter: 0.0,
    };
    for (i, weight) in weights.iter().enumerate() {
        let fraction = weight / total;
        let positive = groups[i..].iter().filter(|(_, acceptor)| *acceptor).count();
        let negative = groups[..i].iter().filter(|(_, acceptor)| !*acceptor).count();
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => fractions.positive += fraction,
            std::cmp::Ordering::Less => fractions.negative += fraction,
            std::cmp::Ordering::Equal if positive == 0 => fractions.neutral += fraction,
            std::cmp::Ordering::Equal => fractions.zwitter += fraction,
        }
    }
    fractions
}

/// Distribution coefficient at `ph`. Charged species partition into octanol at
/// 0.1 % of the neutral species.
pub fn calc_dow(pow: f64, ph: f64, pka_donor: &[f64], pka_accept: &[f64]) -> f64 {
    let ionization = calc_ionization(ph, pka_donor, pka_accept);
    pow * (ionization.neutral + 0.001 * ionization.charged())
}

/// A chemical is treated as a base at `ph` when its strongest acceptor is still
/// mostly protonated and the cationic forms are at least as abundant as the anionic ones
pub fn is_base(ph: f64, pka_donor: &[f64], pka_accept: &[f64]) -> bool {
    let Some(strongest) = pka_accept.iter().cloned().reduce(f64::max) else {
        return false;
    };
    if strongest <= ph + 0.5 {
        return false;
    }
    let ionization = calc_ionization(ph, pka_donor, pka_accept);
    ionization.positive >= ionization.negative
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn neutral_without_ionizable_groups() {
        let ion = calc_ionization(7.4, &[], &[]);
        assert_eq!(ion.neutral, 1.0);
        assert_eq!(calc_dow(100.0, 7.4, &[], &[]), 100.0);
    }

    #[test]
    fn monoprotic_acid_follows_henderson_hasselbalch() {
        let ion = calc_ionization(7.4, &[4.4], &[]);
        assert_relative_eq!(ion.neutral, 1.0 / (1.0 + 1000.0), epsilon = 1e-12);
        assert_relative_eq!(ion.negative, 1000.0 / 1001.0, epsilon = 1e-12);
        assert_eq!(ion.positive, 0.0);
    }

    #[test]
    fn monoprotic_base_is_mostly_cationic() {
        let ion = calc_ionization(7.4, &[], &[9.4]);
        assert_relative_eq!(ion.positive, 100.0 / 101.0, epsilon = 1e-12);
        assert!(is_base(7.4, &[], &[9.4]));
        assert!(!is_base(7.4, &[], &[7.6]));
    }

    #[test]
    fn amphoteric_chemical_forms_zwitterions() {
        // Acid group deprotonates before the amine does
        let ion = calc_ionization(7.4, &[2.3], &[9.7]);
        assert!(ion.zwitter > 0.99);
        let sum = ion.neutral + ion.positive + ion.negative + ion.zwitter;
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn dow_is_bounded_by_pow() {
        let pow = 1000.0;
        let dow = calc_dow(pow, 7.4, &[4.4], &[]);
        assert!(dow < pow);
        assert!(dow >= 0.001 * pow);
    }
}
