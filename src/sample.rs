//! Ancestral sampling of synthetic (observations, states) pairs. This is
//! mainly for generating test and benchmark data; real applications would
//! bring their own observations.
use crate::model::CategoricalHmm;
use rand::Rng;

// Inverse-CDF draw from one table row. Rows sum to one, but guard the last
// index against accumulated rounding.
fn draw<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let mut probe = rng.gen_range(0f64..1f64);
    for (index, &w) in weights.iter().enumerate() {
        if probe < w {
            return index;
        }
        probe -= w;
    }
    weights.len() - 1
}

impl CategoricalHmm {
    /// Draw `n` observations and their hidden states: the first state from
    /// the start distribution, each following state from the transition row
    /// of its predecessor, and each symbol from the emission row of the
    /// current state. The caller supplies the generator, so a seeded
    /// generator makes the output reproducible.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
        let mut observations = Vec::with_capacity(n);
        let mut states = Vec::with_capacity(n);
        if n == 0 {
            return (observations, states);
        }
        let mut state = draw(rng, self.startprob().row(0));
        for _ in 0..n {
            states.push(state);
            observations.push(draw(rng, self.emissionprob().row(state)));
            state = draw(rng, self.transmat().row(state));
        }
        (observations, states)
    }
}
