//! Property-based tests using proptest.
//!
//! Invariants that must hold for all valid inputs:
//!   - kinship symmetry
//!   - eigendecomposition round trip and PSD after repair
//!   - MAF filter idempotence
//!   - p-values in [0, 1]

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use gwas_core::assoc::naive::NaiveLinearGwas;
use gwas_core::assoc::AssocConfig;
use gwas_core::kinship::{estimate_kinship, KinshipMatrix};
use gwas_core::lmm::{MixedModelGwas, RemlConfig};
use gwas_core::qc::filter_markers_by_maf;
use gwas_core::spectral::{is_psd, SpectralConfig, SpectralDecomposition};
use gwas_geno::{GenotypeMatrix, MarkerInfo, MISSING};
use gwas_linalg::DenseMatrix;

/// Random hard calls with a given missing rate, marker-major.
fn random_genotypes(n: usize, m: usize, missing_rate: f64, seed: u64) -> GenotypeMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(n * m);
    for _ in 0..m {
        let p: f64 = rng.gen_range(0.05..0.95);
        for _ in 0..n {
            if rng.gen::<f64>() < missing_rate {
                data.push(MISSING);
            } else {
                data.push((rng.gen::<f64>() < p) as u8 + (rng.gen::<f64>() < p) as u8);
            }
        }
    }
    let ids = (0..n).map(|i| format!("S{}", i)).collect();
    let markers = (0..m)
        .map(|j| MarkerInfo::new(format!("m{}", j), "1", j as u64 + 1))
        .collect();
    GenotypeMatrix::new(ids, markers, data).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Kinship is exactly symmetric
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_kinship_is_symmetric(
        n in 5usize..25,
        m in 10usize..60,
        missing in 0.0f64..0.3,
        seed in 0u64..1000,
    ) {
        let g = random_genotypes(n, m, missing, seed);
        let k = estimate_kinship(&g).unwrap();
        for i in 0..n {
            for j in 0..n {
                prop_assert_eq!(k.get(i, j), k.get(j, i));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Unclamped eigendecomposition reproduces the matrix; repair yields PSD
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn prop_reconstruction_round_trip(
        n in 2usize..20,
        seed in 0u64..1000,
    ) {
        // arbitrary symmetric matrix, usually indefinite
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut m = DenseMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let v = rng.gen_range(-1.0..1.0);
                m.set(i, j, v);
                m.set(j, i, v);
            }
        }
        let ids = (0..n).map(|i| format!("S{}", i)).collect();
        let k = KinshipMatrix::from_matrix(ids, m.clone()).unwrap();
        let sd = SpectralDecomposition::decompose(&k).unwrap();

        prop_assert!(sd.reconstruct().max_abs_diff(&m) < 1e-9);
        for w in sd.values().windows(2) {
            prop_assert!(w[0] >= w[1]);
        }

        let repaired = sd.repair(&SpectralConfig::default());
        prop_assert!(repaired.values().iter().all(|&v| v >= 0.0));
        prop_assert!(is_psd(repaired.matrix(), 1e-8).unwrap());
    }
}

// ---------------------------------------------------------------------------
// 3. MAF filtering is idempotent
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_maf_filter_idempotent(
        n in 2usize..30,
        m in 1usize..40,
        missing in 0.0f64..0.5,
        min_maf in 0.0f64..0.5,
        seed in 0u64..1000,
    ) {
        let g = random_genotypes(n, m, missing, seed);
        let once = filter_markers_by_maf(&g, min_maf).unwrap();
        let twice = filter_markers_by_maf(&once, min_maf).unwrap();
        prop_assert_eq!(once.n_markers(), twice.n_markers());
        prop_assert_eq!(once.markers(), twice.markers());
        for j in 0..once.n_markers() {
            prop_assert_eq!(once.marker(j), twice.marker(j));
        }
    }
}

// ---------------------------------------------------------------------------
// 4. p-values lie in [0, 1] for both methods
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_pvalues_in_unit_interval(
        n in 12usize..30,
        missing in 0.0f64..0.2,
        seed in 0u64..1000,
    ) {
        let g = random_genotypes(n, 40, missing, seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed + 1);
        let y: Vec<f64> = (0..n).map(|_| rng.gen_range(-2.0..2.0)).collect();

        let naive = NaiveLinearGwas::new(y.clone(), AssocConfig::default())
            .run(&g)
            .unwrap();
        prop_assert_eq!(naive.results().len(), 40);
        for p in naive.p_values() {
            prop_assert!((0.0..=1.0).contains(&p), "naive p-value {}", p);
        }

        let kin = SpectralDecomposition::decompose(&estimate_kinship(&g).unwrap())
            .unwrap()
            .repair(&SpectralConfig::default());
        // a flat likelihood is a legitimate outcome for tiny random cohorts
        if let Ok(gwas) = MixedModelGwas::fit(kin, y, &RemlConfig::default(), AssocConfig::default()) {
            let report = gwas.run(&g).unwrap();
            prop_assert_eq!(report.results().len(), 40);
            for p in report.p_values() {
                prop_assert!((0.0..=1.0).contains(&p), "mixed p-value {}", p);
            }
        }
    }
}
