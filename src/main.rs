use chmm::{CategoricalHmm, FitConfig};
use clap::{App, Arg};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

fn main() {
    env_logger::init();
    let matches = App::new("chmm")
        .version("0.1")
        .about("Sample a synthetic dataset from a categorical HMM, then re-fit a randomized model on it")
        .arg(
            Arg::with_name("states")
                .long("states")
                .takes_value(true)
                .default_value(&"3")
                .help("Number of hidden states"),
        )
        .arg(
            Arg::with_name("symbols")
                .long("symbols")
                .takes_value(true)
                .default_value(&"4")
                .help("Size of the observation alphabet"),
        )
        .arg(
            Arg::with_name("sequences")
                .long("sequences")
                .takes_value(true)
                .default_value(&"20")
                .help("Number of sampled sequences"),
        )
        .arg(
            Arg::with_name("length")
                .long("length")
                .takes_value(true)
                .default_value(&"50")
                .help("Length of each sequence"),
        )
        .arg(
            Arg::with_name("iterations")
                .long("iterations")
                .takes_value(true)
                .default_value(&"10")
                .help("EM iteration cap"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .default_value(&"32389")
                .help("Seed"),
        )
        .get_matches();
    let states: usize = matches
        .value_of("states")
        .and_then(|e| e.parse().ok())
        .unwrap();
    let symbols: usize = matches
        .value_of("symbols")
        .and_then(|e| e.parse().ok())
        .unwrap();
    let sequences: usize = matches
        .value_of("sequences")
        .and_then(|e| e.parse().ok())
        .unwrap();
    let length: usize = matches
        .value_of("length")
        .and_then(|e| e.parse().ok())
        .unwrap();
    let iterations: usize = matches
        .value_of("iterations")
        .and_then(|e| e.parse().ok())
        .unwrap();
    let seed: u64 = matches
        .value_of("seed")
        .and_then(|e| e.parse().ok())
        .unwrap();
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
    let truth = CategoricalHmm::random(states, symbols, &mut rng).unwrap();
    let mut observations = Vec::with_capacity(sequences * length);
    for _ in 0..sequences {
        let (obs, _states) = truth.sample(length, &mut rng);
        observations.extend(obs);
    }
    let lengths = vec![length; sequences];
    let mut learner = CategoricalHmm::random(states, symbols, &mut rng).unwrap();
    let config = FitConfig {
        max_iter: iterations,
        tol: 0f64,
        seed,
        ..Default::default()
    };
    let history = learner.fit(&observations, &lengths, &config).unwrap();
    let truth_lk: f64 = {
        let mut offset = 0;
        lengths
            .iter()
            .map(|&len| {
                let lk = truth.score(&observations[offset..offset + len]).unwrap();
                offset += len;
                lk
            })
            .sum()
    };
    println!("iteration\tlog-likelihood");
    for (iteration, lk) in history.iter().enumerate() {
        println!("{}\t{:.4}", iteration, lk);
    }
    println!("truth\t{:.4}", truth_lk);
}
