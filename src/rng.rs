use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Build a deterministic random number generator. If no seed is given, the generator is seeded
/// from a fixed default so that behaviour in tests is still reproducible; callers that want
/// process-level entropy should draw a seed from [`fresh_seed`] first and pass it in explicitly.
///
/// # Arguments
///
/// * `seed`: The optional seed number.
///
/// returns: `Box<dyn RngCore + Send>`
pub(crate) fn get_rng(seed: Option<u64>) -> Box<dyn RngCore + Send> {
    let rng = match seed {
        None => ChaCha8Rng::from_seed(Default::default()),
        Some(s) => ChaCha8Rng::seed_from_u64(s),
    };
    Box::new(rng)
}

/// A meta-RNG used by the archipelago to derive distinct, reproducible per-island population
/// seeds from a single seed supplied at construction. A seed supplied to the archipelago is
/// never handed to islands verbatim, to avoid every island drawing identical decision vectors.
pub(crate) struct MetaRng(ChaCha8Rng);

impl MetaRng {
    pub(crate) fn new(seed: Option<u64>) -> Self {
        match seed {
            None => Self(ChaCha8Rng::from_seed(Default::default())),
            Some(s) => Self(ChaCha8Rng::seed_from_u64(s)),
        }
    }

    /// Derive the next per-island seed.
    pub(crate) fn next_seed(&mut self) -> u64 {
        self.0.next_u64()
    }
}
