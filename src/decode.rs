//! State-path decoding: Viterbi (most probable single path) and MAP
//! (per-timestep posterior argmax).
use crate::forward_backward::{DpTable, ForwardBackward, LogModel};
use crate::EP;

/// Which decoder `CategoricalHmm::decode` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Viterbi,
    Map,
}

// Lowest index wins on ties, so decoding is reproducible.
fn argmax(xs: &[f64]) -> usize {
    let mut best = 0;
    for (i, &x) in xs.iter().enumerate().skip(1) {
        if x > xs[best] {
            best = i;
        }
    }
    best
}

/// Max-sum dynamic program with backpointers. Returns the log-probability of
/// the best path together with the path itself.
pub(crate) fn viterbi(lm: &LogModel, obs: &[usize]) -> (f64, Vec<usize>) {
    let (len, k) = (obs.len(), lm.n_states);
    if len == 0 {
        return (0f64, vec![]);
    }
    let mut delta = DpTable::new(len, k, EP);
    let mut backptr = vec![0usize; len * k];
    for i in 0..k {
        *delta.get_mut(0, i) = lm.start[i] + lm.emit(i, obs[0]);
    }
    for (t, &o) in obs.iter().enumerate().skip(1) {
        for i in 0..k {
            let (mut best, mut best_j) = (delta.get(t - 1, 0) + lm.trans(0, i), 0);
            for j in 1..k {
                let score = delta.get(t - 1, j) + lm.trans(j, i);
                if score > best {
                    best = score;
                    best_j = j;
                }
            }
            *delta.get_mut(t, i) = best + lm.emit(i, o);
            backptr[t * k + i] = best_j;
        }
    }
    let mut state = argmax(delta.row(len - 1));
    let log_prob = delta.get(len - 1, state);
    let mut path = vec![0; len];
    path[len - 1] = state;
    for t in (1..len).rev() {
        state = backptr[t * k + state];
        path[t - 1] = state;
    }
    (log_prob, path)
}

/// Posterior argmax per timestep. The returned scalar is the full-sequence
/// log-likelihood, not the probability of the returned path; that asymmetry
/// with `viterbi` is a deliberate contract.
pub(crate) fn map_decode(lm: &LogModel, obs: &[usize]) -> (f64, Vec<usize>) {
    let fb = ForwardBackward::run(lm, obs);
    let post = fb.posteriors(lm.n_states);
    let path: Vec<usize> = (0..post.rows()).map(|t| argmax(post.row(t))).collect();
    (fb.log_likelihood, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoricalHmm;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn weather() -> CategoricalHmm {
        CategoricalHmm::with_parameters(
            &[0.6, 0.4],
            &[vec![0.7, 0.3], vec![0.4, 0.6]],
            &[vec![0.1, 0.4, 0.5], vec![0.6, 0.3, 0.1]],
        )
        .unwrap()
    }

    // Best path by brute force, with the same lowest-index tie-break.
    fn enumerate_best_path(model: &CategoricalHmm, obs: &[usize]) -> (f64, Vec<usize>) {
        let k = model.n_states();
        let (mut best, mut best_path) = (f64::MIN, vec![]);
        for mut code in 0..k.pow(obs.len() as u32) {
            let path: Vec<usize> = (0..obs.len())
                .map(|_| {
                    let state = code % k;
                    code /= k;
                    state
                })
                .collect();
            let mut prob = model.startprob().get(0, path[0])
                * model.emissionprob().get(path[0], obs[0]);
            for t in 1..obs.len() {
                prob *= model.transmat().get(path[t - 1], path[t])
                    * model.emissionprob().get(path[t], obs[t]);
            }
            if prob > best {
                best = prob;
                best_path = path;
            }
        }
        (best.ln(), best_path)
    }

    #[test]
    fn wikipedia_viterbi_example() {
        // Observations [walk, shop, clean] are most likely generated by
        // [Sunny, Rainy, Rainy], with probability 0.01344.
        let model = weather();
        let lm = LogModel::new(&model);
        let (log_prob, path) = viterbi(&lm, &[0, 1, 2]);
        assert_eq!(path, vec![1, 0, 0]);
        let rounded = (log_prob.exp() * 100000f64).round() / 100000f64;
        assert!((rounded - 0.01344).abs() < 0.0000001, "{}", rounded);
    }
    #[test]
    fn map_decoding_agrees_on_the_weather_example() {
        let model = weather();
        let lm = LogModel::new(&model);
        let (score, path) = map_decode(&lm, &[0, 1, 2]);
        assert_eq!(path, vec![1, 0, 0]);
        // The scalar is the marginal log-likelihood of the sequence.
        let fb = ForwardBackward::run(&lm, &[0, 1, 2]);
        assert!((score - fb.log_likelihood).abs() < 0.000001);
    }
    #[test]
    fn viterbi_matches_path_enumeration() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(777);
        for seed in 0..10u64 {
            let mut model_rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
            let model = CategoricalHmm::random(3, 3, &mut model_rng).unwrap();
            let lm = LogModel::new(&model);
            let obs: Vec<usize> = (0..6).map(|_| rng.gen_range(0..3)).collect();
            let (log_prob, path) = viterbi(&lm, &obs);
            let (expected_prob, expected_path) = enumerate_best_path(&model, &obs);
            assert!((log_prob - expected_prob).abs() < 0.000001);
            assert_eq!(path, expected_path);
        }
    }
    #[test]
    fn ties_break_toward_the_lowest_state() {
        // Fully symmetric model: every path has the same probability.
        let model = CategoricalHmm::uniform(3, 2).unwrap();
        let lm = LogModel::new(&model);
        let (_, path) = viterbi(&lm, &[0, 1, 0, 1]);
        assert_eq!(path, vec![0, 0, 0, 0]);
        let (_, path) = map_decode(&lm, &[0, 1, 0, 1]);
        assert_eq!(path, vec![0, 0, 0, 0]);
    }
    #[test]
    fn decoding_is_deterministic() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(11);
        let model = CategoricalHmm::random(4, 4, &mut rng).unwrap();
        let lm = LogModel::new(&model);
        let obs: Vec<usize> = (0..100).map(|_| rng.gen_range(0..4)).collect();
        let first = viterbi(&lm, &obs);
        for _ in 0..5 {
            assert_eq!(viterbi(&lm, &obs), first);
        }
    }
    #[test]
    fn empty_sequence_decodes_to_empty_path() {
        let model = weather();
        let lm = LogModel::new(&model);
        assert_eq!(viterbi(&lm, &[]), (0f64, vec![]));
        assert_eq!(map_decode(&lm, &[]), (0f64, vec![]));
    }
}
