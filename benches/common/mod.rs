#![allow(dead_code)]

use adtape::Traced;

// ─── Rosenbrock ────────────────────────────────────────────────────────────

pub fn rosenbrock(x: &[Traced<f64>]) -> Traced<f64> {
    let mut sum = Traced::constant(0.0);
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum = sum + t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

pub fn rosenbrock_f64(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum += t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

// ─── Rastrigin ─────────────────────────────────────────────────────────────
// f(x) = 10n + Σ[x_i² - 10·cos(2π·x_i)]

pub fn rastrigin(x: &[Traced<f64>]) -> Traced<f64> {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut sum = Traced::constant(10.0 * x.len() as f64);
    for &xi in x {
        sum = sum + xi * xi - 10.0 * (two_pi * xi).cos();
    }
    sum
}

// ─── Vector-valued ─────────────────────────────────────────────────────────
// Each output couples a sliding window of inputs, so the Jacobian is banded
// but every column and row is non-trivial.

pub fn banded(x: &[Traced<f64>], m: usize) -> Vec<Traced<f64>> {
    let n = x.len();
    (0..m)
        .map(|i| {
            let a = x[i % n];
            let b = x[(i + 1) % n];
            (a * b).sin() + (a - b).exp() / (1.0 + b * b)
        })
        .collect()
}

// ─── Finite differences ────────────────────────────────────────────────────

pub fn finite_diff_gradient(f: impl Fn(&[f64]) -> f64, x: &[f64], h: f64) -> Vec<f64> {
    let n = x.len();
    let mut grad = vec![0.0; n];
    for i in 0..n {
        let mut xp = x.to_vec();
        let mut xm = x.to_vec();
        xp[i] += h;
        xm[i] -= h;
        grad[i] = (f(&xp) - f(&xm)) / (2.0 * h);
    }
    grad
}

// ─── Inputs ────────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}
