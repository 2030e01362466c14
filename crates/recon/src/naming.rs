use std::collections::HashMap;

use parking_lot::Mutex;

/// Per-run counter of how many outputs each code has produced.
///
/// Created fresh for every run and dropped with it; never seeded from disk.
#[derive(Debug, Default)]
pub struct NameRegistry {
    suffix: String,
    extension: String,
    counts: Mutex<HashMap<String, usize>>,
}

impl NameRegistry {
    pub fn new(suffix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            extension: extension.into(),
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Claim the next file name for `code`.
    ///
    /// First claim: `{code}{suffix}.{ext}`; the Nth: `{code}{suffix}(N).{ext}`.
    pub fn claim(&self, code: &str) -> String {
        let n = {
            let mut counts = self.counts.lock();
            let n = counts.entry(code.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        if n == 1 {
            format!("{code}{}.{}", self.suffix, self.extension)
        } else {
            format!("{code}{}({n}).{}", self.suffix, self.extension)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn duplicate_codes_get_numbered() {
        let reg = NameRegistry::new("_filled", "xlsx");
        assert_eq!(reg.claim("SWD392"), "SWD392_filled.xlsx");
        assert_eq!(reg.claim("PRN212"), "PRN212_filled.xlsx");
        assert_eq!(reg.claim("SWD392"), "SWD392_filled(2).xlsx");
        assert_eq!(reg.claim("SWD392"), "SWD392_filled(3).xlsx");
        assert_eq!(reg.claim("NONE"), "NONE_filled.xlsx");
    }

    #[test]
    fn fresh_registry_starts_over() {
        let first = NameRegistry::new("_filled", "xlsx");
        first.claim("A");
        let second = NameRegistry::new("_filled", "xlsx");
        assert_eq!(second.claim("A"), "A_filled.xlsx");
    }

    #[test]
    fn concurrent_claims_are_unique() {
        let reg = Arc::new(NameRegistry::new("_filled", "xlsx"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.claim("X"))
            })
            .collect();
        let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
        assert_eq!(reg.claim("X"), "X_filled(9).xlsx");
    }
}
