use std::f64::consts::PI;

use rand::Rng;

/// Sample from N(mean, std_dev²) using the Box-Muller transform.
pub fn sample_gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return mean;
    }
    // u1 in (0, 1] keeps ln() finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

/// Bernoulli draw with probability `p`.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}

/// Seed for runs where the caller did not ask for one.
pub fn fresh_seed() -> u64 {
    rand::rng().random()
}
