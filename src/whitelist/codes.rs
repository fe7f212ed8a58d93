//! In-memory link codes.
//!
//! A player who is not linked yet gets a five-digit code on the kick
//! screen and redeems it on Discord with `!link <code>`. Codes live only in
//! memory, so a restart hands out fresh ones.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use rand::Rng;
use uuid::Uuid;

use crate::common::Identity;

/// Range link codes are drawn from.
pub const CODE_RANGE: RangeInclusive<u32> = 10_000..=99_999;

/// Attempts at finding an unused code before overwriting one.
const MAX_DRAWS: usize = 16;

/// Issued link codes, keyed by code.
#[derive(Debug, Default)]
pub struct LinkCodes {
    by_code: HashMap<u32, Identity>,
}

impl LinkCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the identity's existing code or issue a new one.
    pub fn code_for(&mut self, identity: &Identity) -> u32 {
        if let Some(code) = self.find(identity.uuid) {
            return code;
        }

        let mut rng = rand::thread_rng();
        let mut code = rng.gen_range(CODE_RANGE);
        // Bounded so a flood of join attempts cannot spin here; a clash
        // after that just replaces the older code.
        for _ in 0..MAX_DRAWS {
            if !self.by_code.contains_key(&code) {
                break;
            }
            code = rng.gen_range(CODE_RANGE);
        }
        self.by_code.insert(code, identity.clone());
        code
    }

    /// Code currently issued to a Minecraft account.
    pub fn find(&self, uuid: Uuid) -> Option<u32> {
        self.by_code
            .iter()
            .find(|(_, identity)| identity.uuid == uuid)
            .map(|(code, _)| *code)
    }

    /// Identity a code was issued to.
    pub fn get(&self, code: u32) -> Option<&Identity> {
        self.by_code.get(&code)
    }

    pub fn remove(&mut self, code: u32) -> Option<Identity> {
        self.by_code.remove(&code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> Identity {
        Identity::new(Uuid::new_v4(), name)
    }

    #[test]
    fn test_code_is_in_range() {
        let mut codes = LinkCodes::new();
        let code = codes.code_for(&identity("Steve"));
        assert!(CODE_RANGE.contains(&code));
    }

    #[test]
    fn test_code_is_stable_per_identity() {
        let mut codes = LinkCodes::new();
        let steve = identity("Steve");
        let first = codes.code_for(&steve);
        let second = codes.code_for(&steve);
        assert_eq!(first, second);
        assert_eq!(codes.len(), 1);
    }

    #[test]
    fn test_lookup_and_remove() {
        let mut codes = LinkCodes::new();
        let alex = identity("Alex");
        let code = codes.code_for(&alex);

        assert_eq!(codes.get(code), Some(&alex));
        assert_eq!(codes.find(alex.uuid), Some(code));
        assert_eq!(codes.remove(code), Some(alex.clone()));
        assert_eq!(codes.find(alex.uuid), None);
    }
}
