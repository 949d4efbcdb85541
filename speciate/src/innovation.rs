use rand::rngs::StdRng;
use rand::SeedableRng;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Identifier type used to designate historically
/// identical structural units for the purposes of
/// genome comparison and genetic tracking.
pub type Innovation = usize;

/// Hands out innovation numbers to newly created
/// structural units (genes, nodes, branches...).
///
/// A context is meant to be shared by every genome of a run,
/// usually behind an [`Arc`], and passed into genome
/// constructors explicitly. Numbers are assigned atomically,
/// so genomes may mutate from several threads at once.
///
/// When seeded, the context also derives a deterministic
/// random source for each structural unit, which allows
/// fully reproducible runs. [`reset`] rewinds both the
/// counter and the seed between independent runs.
///
/// [`Arc`]: std::sync::Arc
/// [`reset`]: InnovationContext::reset
///
/// # Examples
/// ```
/// use speciate::InnovationContext;
///
/// let context = InnovationContext::new();
/// assert_eq!(context.next_innovation(), 0);
/// assert_eq!(context.next_innovation(), 1);
///
/// context.reset(Some(42));
/// assert_eq!(context.next_innovation(), 0);
/// assert_eq!(context.seed(), Some(42));
/// ```
#[derive(Debug, Default)]
pub struct InnovationContext {
    next: AtomicUsize,
    seeded: AtomicBool,
    seed: AtomicU64,
}

impl InnovationContext {
    /// Creates an unseeded context starting at innovation 0.
    pub fn new() -> InnovationContext {
        InnovationContext::default()
    }

    /// Creates a context whose instance random sources
    /// are derived deterministically from `seed`.
    pub fn seeded(seed: u64) -> InnovationContext {
        let context = InnovationContext::new();
        context.reset(Some(seed));
        context
    }

    /// Returns a new, never before assigned, innovation number.
    pub fn next_innovation(&self) -> Innovation {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the innovation number that will be assigned next,
    /// without assigning it.
    pub fn peek(&self) -> Innovation {
        self.next.load(Ordering::SeqCst)
    }

    /// Rewinds the counter to 0 and replaces the global seed.
    ///
    /// Must not be called while genomes of a previous run are
    /// still being mutated, as numbers would be handed out twice.
    pub fn reset(&self, seed: Option<u64>) {
        self.next.store(0, Ordering::SeqCst);
        match seed {
            Some(seed) => {
                self.seed.store(seed, Ordering::SeqCst);
                self.seeded.store(true, Ordering::SeqCst);
            }
            None => self.seeded.store(false, Ordering::SeqCst),
        }
    }

    /// Returns the global seed, if any.
    pub fn seed(&self) -> Option<u64> {
        if self.seeded.load(Ordering::SeqCst) {
            Some(self.seed.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Returns a random source for the structural unit
    /// identified by `innovation`.
    ///
    /// Seeded contexts always return the same stream for the
    /// same innovation number; unseeded ones draw from entropy.
    ///
    /// # Examples
    /// ```
    /// use rand::Rng;
    /// use speciate::InnovationContext;
    ///
    /// let context = InnovationContext::seeded(7);
    /// let a: u64 = context.instance_rng(3).gen();
    /// let b: u64 = context.instance_rng(3).gen();
    /// assert_eq!(a, b);
    /// ```
    pub fn instance_rng(&self, innovation: Innovation) -> StdRng {
        match self.seed() {
            Some(seed) => StdRng::seed_from_u64(mix(seed, innovation as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

/// Spreads instance numbers over the seed space so that
/// neighbouring innovations do not get correlated streams.
fn mix(seed: u64, instance: u64) -> u64 {
    let mut z = seed ^ instance.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn innovations_are_unique_across_threads() {
        let context = Arc::new(InnovationContext::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let context = Arc::clone(&context);
                thread::spawn(move || {
                    (0..250)
                        .map(|_| context.next_innovation())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let all: HashSet<Innovation> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 1000);
        assert_eq!(context.peek(), 1000);
    }

    #[test]
    fn reset_rewinds_counter() {
        let context = InnovationContext::new();
        for _ in 0..10 {
            context.next_innovation();
        }
        assert_eq!(context.next_innovation(), 10);
        context.reset(None);
        assert_eq!(context.next_innovation(), 0);
        assert_eq!(context.seed(), None);
    }

    #[test]
    fn seeded_instance_streams_are_reproducible() {
        let first = InnovationContext::seeded(99);
        let second = InnovationContext::seeded(99);
        let a: Vec<u32> = (0..5).map(|i| first.instance_rng(i).gen()).collect();
        let b: Vec<u32> = (0..5).map(|i| second.instance_rng(i).gen()).collect();
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }
}
