//! Randomised browser identity: User-Agent strings and Accept-Language values.
//!
//! Candidates carry a weight approximating their share of real traffic, so
//! generated identities blend in with ordinary visitors.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

// ============================================================================
// Platform
// ============================================================================

/// Device class a User-Agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Phones and tablets.
    Mobile,
    /// Desktop and laptop browsers.
    Pc,
}

/// One candidate User-Agent.
struct Candidate {
    platform: Platform,
    user_agent: &'static str,
    weight: u32,
}

const CANDIDATES: &[Candidate] = &[
    Candidate {
        platform: Platform::Pc,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        weight: 30,
    },
    Candidate {
        platform: Platform::Pc,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        weight: 14,
    },
    Candidate {
        platform: Platform::Pc,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36 Edg/129.0.0.0",
        weight: 9,
    },
    Candidate {
        platform: Platform::Pc,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0",
        weight: 6,
    },
    Candidate {
        platform: Platform::Pc,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Safari/605.1.15",
        weight: 6,
    },
    Candidate {
        platform: Platform::Pc,
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        weight: 3,
    },
    Candidate {
        platform: Platform::Mobile,
        user_agent: "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Mobile Safari/537.36",
        weight: 28,
    },
    Candidate {
        platform: Platform::Mobile,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 18_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Mobile/15E148 Safari/604.1",
        weight: 20,
    },
    Candidate {
        platform: Platform::Mobile,
        user_agent: "Mozilla/5.0 (Linux; Android 14; SM-S918B) AppleWebKit/537.36 (KHTML, like Gecko) SamsungBrowser/26.0 Chrome/122.0.0.0 Mobile Safari/537.36",
        weight: 6,
    },
    Candidate {
        platform: Platform::Mobile,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 18_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/129.0.6668.69 Mobile/15E148 Safari/604.1",
        weight: 4,
    },
];

/// Default desktop User-Agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

/// Client hints sent alongside a mobile User-Agent.
pub const MOBILE_CLIENT_HINTS: &[(&str, &str)] = &[
    ("Sec-Ch-Ua-Platform", "\"Android\""),
    ("Sec-Ch-Ua-Mobile", "?1"),
    (
        "Sec-Ch-Ua",
        "\"Not A;Brand\";v=\"99\", \"Chromium\";v=\"99\", \"Google Chrome\";v=\"99\"",
    ),
];

/// Accept-Language values drawn from in random mode.
pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US",
    "en-US,en;q=0.9",
    "en-US,en;q=0.9,ko;q=0.8",
    "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7",
    "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7,zh-CN;q=0.6",
    "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7,zh-CN;q=0.6,zh;q=0.5",
    "en",
    "ko",
    "ko-KR",
    "ja",
    "zh-CN",
    "zh",
];

// ============================================================================
// Generator
// ============================================================================

/// Platform-weighted User-Agent generator.
pub struct UserAgentGenerator {
    candidates: Vec<&'static Candidate>,
    weights: Option<WeightedIndex<u32>>,
}

impl UserAgentGenerator {
    /// Creates a generator restricted to `platforms`; an empty slice means
    /// every platform.
    pub fn new(platforms: &[Platform]) -> Self {
        Self::from_candidates(
            CANDIDATES
                .iter()
                .filter(|c| platforms.is_empty() || platforms.contains(&c.platform))
                .collect(),
        )
    }

    fn from_candidates(candidates: Vec<&'static Candidate>) -> Self {
        // No candidates or no usable weight leaves only the default agent.
        let weights = WeightedIndex::new(candidates.iter().map(|c| c.weight)).ok();
        Self {
            candidates,
            weights,
        }
    }

    /// Draws one User-Agent, or [`DEFAULT_USER_AGENT`] when there is
    /// nothing to draw from.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        match &self.weights {
            Some(weights) => self.candidates[weights.sample(rng)].user_agent,
            None => DEFAULT_USER_AGENT,
        }
    }

    /// Draws one User-Agent with the thread-local generator.
    pub fn random(&self) -> &'static str {
        self.generate(&mut rand::thread_rng())
    }

    /// Number of candidates this generator draws from.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the generator has no candidates.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Draws one Accept-Language value.
pub fn random_accept_language() -> &'static str {
    let index = rand::thread_rng().gen_range(0..ACCEPT_LANGUAGES.len());
    ACCEPT_LANGUAGES[index]
}

/// Returns true if `user_agent` is one of the mobile candidates.
pub fn is_mobile(user_agent: &str) -> bool {
    CANDIDATES
        .iter()
        .any(|c| c.platform == Platform::Mobile && c.user_agent == user_agent)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_platform_filter() {
        let mobile = UserAgentGenerator::new(&[Platform::Mobile]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            assert!(is_mobile(mobile.generate(&mut rng)));
        }

        let pc = UserAgentGenerator::new(&[Platform::Pc]);
        for _ in 0..200 {
            assert!(!is_mobile(pc.generate(&mut rng)));
        }
    }

    #[test]
    fn test_no_candidates_yields_default_agent() {
        let generator = UserAgentGenerator::from_candidates(Vec::new());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(generator.is_empty());
        assert_eq!(generator.generate(&mut rng), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_empty_platforms_means_all() {
        let all = UserAgentGenerator::new(&[]);
        assert_eq!(all.len(), CANDIDATES.len());
        let both = UserAgentGenerator::new(&[Platform::Mobile, Platform::Pc]);
        assert_eq!(both.len(), CANDIDATES.len());
    }

    #[test]
    fn test_weights_favour_common_agents() {
        let pc = UserAgentGenerator::new(&[Platform::Pc]);
        let mut rng = StdRng::seed_from_u64(9);
        let windows_chrome = CANDIDATES[0].user_agent;
        let linux_chrome = CANDIDATES[5].user_agent;

        let draws: Vec<&str> = (0..5_000).map(|_| pc.generate(&mut rng)).collect();
        let common = draws.iter().filter(|ua| **ua == windows_chrome).count();
        let rare = draws.iter().filter(|ua| **ua == linux_chrome).count();
        assert!(common > rare * 3, "common={common} rare={rare}");
    }

    #[test]
    fn test_random_accept_language_is_a_candidate() {
        for _ in 0..50 {
            assert!(ACCEPT_LANGUAGES.contains(&random_accept_language()));
        }
    }
}
