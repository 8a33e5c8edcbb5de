use rand::Rng;

use super::aggregate::Order;

// ============================================================================
// Tracking Code Generator
// ============================================================================
//
// Produces short human-facing order codes ("LP-7KQ2ZD"). Candidates are drawn
// from an alphabet without look-alike characters (no 0/O, 1/I) and checked
// against an injected uniqueness predicate; a collision simply triggers
// another draw. With 32 symbols and 6 positions there are ~1.07e9 codes, so
// the expected number of redraws stays negligible for any realistic store.
//
// ============================================================================

/// Upper-case letters and digits minus the visually confusable ones.
pub const UNAMBIGUOUS_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Clone, Debug)]
pub struct TrackingConfig {
    pub prefix: String,
    pub length: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            prefix: "LP-".to_string(),
            length: 6,
        }
    }
}

/// A generated code plus how many draws collided before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub code: String,
    pub collisions: u32,
}

#[derive(Clone, Debug, Default)]
pub struct TrackingIdGenerator {
    config: TrackingConfig,
}

impl TrackingIdGenerator {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Generate a code that does not match any `order_number` in `existing`.
    pub fn generate(&self, existing: &[Order]) -> String {
        self.generate_unique(|candidate| existing.iter().any(|o| o.order_number == candidate))
            .code
    }

    /// Draw codes until `is_taken` rejects none of them.
    pub fn generate_unique<F>(&self, is_taken: F) -> GeneratedCode
    where
        F: Fn(&str) -> bool,
    {
        self.generate_with(&mut rand::rng(), is_taken)
    }

    pub fn generate_with<R, F>(&self, rng: &mut R, is_taken: F) -> GeneratedCode
    where
        R: Rng + ?Sized,
        F: Fn(&str) -> bool,
    {
        let mut collisions = 0u32;

        loop {
            let candidate = self.draw(rng);
            if !is_taken(&candidate) {
                if collisions > 0 {
                    tracing::debug!(
                        code = %candidate,
                        collisions = collisions,
                        "Tracking code generated after collisions"
                    );
                }
                return GeneratedCode {
                    code: candidate,
                    collisions,
                };
            }

            collisions = collisions.saturating_add(1);
            tracing::warn!(
                candidate = %candidate,
                attempt = collisions,
                "Tracking code collision, drawing again"
            );
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut code = String::with_capacity(self.config.prefix.len() + self.config.length);
        code.push_str(&self.config.prefix);
        for _ in 0..self.config.length {
            let idx = rng.random_range(0..UNAMBIGUOUS_ALPHABET.len());
            code.push(UNAMBIGUOUS_ALPHABET[idx] as char);
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::aggregate::tests::sample_order;
    use crate::domain::order::OrderStatus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::collections::HashSet;

    fn order_with_code(code: &str) -> Order {
        let mut order = sample_order(OrderStatus::PartnerAssigned);
        order.order_number = code.to_string();
        order
    }

    #[test]
    fn test_code_shape() {
        let generator = TrackingIdGenerator::default();
        let code = generator.generate(&[]);

        assert!(code.starts_with("LP-"));
        assert_eq!(code.len(), 9);
        for ch in code[3..].chars() {
            assert!(UNAMBIGUOUS_ALPHABET.contains(&(ch as u8)), "unexpected char {ch}");
        }
    }

    #[test]
    fn test_alphabet_excludes_confusables() {
        for ch in [b'0', b'O', b'1', b'I'] {
            assert!(!UNAMBIGUOUS_ALPHABET.contains(&ch));
        }
        assert_eq!(UNAMBIGUOUS_ALPHABET.len(), 32);
    }

    #[test]
    fn test_never_returns_existing_codes() {
        let generator = TrackingIdGenerator::default();
        let existing = vec![order_with_code("LP-AAA111"), order_with_code("LP-BBB222")];

        for _ in 0..1_000 {
            let code = generator.generate(&existing);
            assert_ne!(code, "LP-AAA111");
            assert_ne!(code, "LP-BBB222");
        }
    }

    #[test]
    fn test_collision_triggers_redraw() {
        let generator = TrackingIdGenerator::default();
        let calls = Cell::new(0u32);

        // Reject the first three candidates regardless of value
        let generated = generator.generate_with(&mut StdRng::seed_from_u64(7), |_| {
            calls.set(calls.get() + 1);
            calls.get() <= 3
        });

        assert_eq!(generated.collisions, 3);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_ten_thousand_codes_are_unique_against_large_store() {
        let generator = TrackingIdGenerator::default();
        let mut rng = StdRng::seed_from_u64(42);

        let mut taken: HashSet<String> = (0..10_000)
            .map(|_| generator.generate_with(&mut rng, |_| false).code)
            .collect();
        let preexisting = taken.clone();

        let mut fresh = HashSet::new();
        for _ in 0..10_000 {
            let code = generator.generate_with(&mut rng, |c| taken.contains(c)).code;
            assert!(!preexisting.contains(&code));
            assert!(fresh.insert(code.clone()), "duplicate {code}");
            taken.insert(code);
        }

        assert_eq!(fresh.len(), 10_000);
    }

    #[test]
    fn test_custom_prefix_and_length() {
        let generator = TrackingIdGenerator::new(TrackingConfig {
            prefix: "WF#".to_string(),
            length: 4,
        });

        let code = generator.generate(&[]);
        assert!(code.starts_with("WF#"));
        assert_eq!(code.len(), 7);
    }
}
