//! Common test utilities and helpers for integration tests

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use framelens_common::{PipelineConfig, PipelineConfigBuilder};

/// Header of the synthetic bank dataset
pub const BANK_HEADER: [&str; 13] = [
    "fraud_bool",
    "income",
    "name_email_similarity",
    "customer_age",
    "payment_type",
    "zip_count_4w",
    "employment_status",
    "credit_risk_score",
    "housing_status",
    "source",
    "device_os",
    "velocity_6h",
    "month",
];

/// Small deterministic generator so fixtures are identical on every run
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    fn unit(&mut self) -> f64 {
        self.below(1_000_000) as f64 / 1_000_000.0
    }
}

/// Render `rows` rows of bank-style records as CSV text
pub fn bank_csv(rows: usize, seed: u64) -> String {
    let mut rng = Lcg(seed);
    let mut text = BANK_HEADER.join(",");
    text.push('\n');
    for _ in 0..rows {
        let fraud = (rng.below(100) < 3) as u8;
        let income = (rng.below(9) + 1) as f64 / 10.0;
        let similarity = rng.unit();
        let age = (rng.below(8) + 1) * 10;
        let payment = ["AA", "AB", "AC", "AD", "AE"][rng.below(5) as usize];
        let zip_count = rng.below(6000);
        let employment = ["CA", "CB", "CC", "CD", "CE", "CF", "CG"][rng.below(7) as usize];
        let risk = rng.below(500) as i64 - 170;
        let housing = ["BA", "BB", "BC", "BD", "BE", "BF", "BG"][rng.below(7) as usize];
        let source = ["INTERNET", "TELEAPP"][(rng.below(100) < 1) as usize];
        let os = ["linux", "windows", "macintosh", "x11", "other"][rng.below(5) as usize];
        let velocity = 20_000.0 + rng.below(10_000_000) as f64 / 1000.0;
        let month = rng.below(8);
        writeln!(
            text,
            "{},{},{:.6},{},{},{},{},{},{},{},{},{:.3},{}",
            fraud,
            income,
            similarity,
            age,
            payment,
            zip_count,
            employment,
            risk,
            housing,
            source,
            os,
            velocity,
            month
        )
        .unwrap();
    }
    text
}

/// Write a synthetic bank dataset into `dir`
pub fn write_bank_csv(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("bank_dataset.csv");
    fs::write(&path, bank_csv(rows, 42)).unwrap();
    path
}

/// Configuration that reads `input` and writes every output into `dir`
pub fn config_in(dir: &Path, input: &Path) -> PipelineConfig {
    PipelineConfigBuilder::new()
        .output_dir(dir)
        .input_path(input)
        .figure_size(600, 400)
        .build()
        .unwrap()
}
