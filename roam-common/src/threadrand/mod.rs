use rand::rngs::OsRng;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::RefCell;

thread_local! {
    static RNG: RefCell<ChaCha20Rng> = RefCell::new(ChaCha20Rng::from_seed(OsRng.gen()));
}

/// Handle to a per-thread ChaCha20 generator seeded from the OS.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecureRng;

impl SecureRng {
    pub fn fill(dest: &mut [u8]) {
        RNG.with(|rng| rand_chacha::rand_core::RngCore::fill_bytes(&mut *rng.borrow_mut(), dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn fill_produces_distinct_buffers() {
        let mut seen = HashSet::new();

        for _ in 0..1000 {
            let mut bytes = [0u8; 32];
            SecureRng::fill(&mut bytes);
            assert!(seen.insert(bytes));
        }
    }

    #[test]
    fn threads_do_not_share_a_stream() {
        let handles = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let mut bytes = [0u8; 16];
                    SecureRng::fill(&mut bytes);
                    bytes
                })
            })
            .collect::<Vec<_>>();

        let values = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<HashSet<_>>();

        assert_eq!(values.len(), 4);
    }
}
