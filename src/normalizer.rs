//! Ingredient text normalization
//!
//! Maps free-form ingredient text ("2 cups MiracleWhip salad dressing") to a
//! canonical lookup key ("miracle whip salad") plus a confidence tier.
//! Glued product names are split by a frequency-ranked dictionary segmenter.
//!
//! Normalization is idempotent: feeding a canonical key back in yields the
//! same key. The segmenter keeps dictionary words whole and never splits a
//! word it cannot fully cover, so every emitted token re-segments to itself.

use crate::error::{PlannerError, Result};
use crate::types::{NormalizedIngredient, Tier};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

const MIN_TOKEN_LEN: usize = 3;

const DESCRIPTORS: &[&str] = &[
    "fresh", "frozen", "dried", "blanched", "steamed", "sweetened", "unsweetened",
    "canned", "instant", "chunky", "sliced", "grated", "crushed", "whole", "nonfat",
    "lowfat", "lean", "fatfree", "reduced", "condensed", "prepared", "thawed", "peeled",
];

const UNITS: &[&str] = &[
    "cup", "cups", "tbsp", "tablespoon", "tablespoons", "tsp", "teaspoon", "grams",
    "sticks", "ounces", "oz", "pound", "liters", "ml", "g", "lb", "can", "jar", "slice",
    "pack", "package", "stick", "serving",
];

const STOPWORDS: &[&str] = &[
    "with", "and", "from", "your", "for", "of", "only", "some", "a", "the", "to", "in",
];

const BLACKLIST: &[&str] = &["brand", "type", "style", "version", "blend", "classic", "premium"];

// One word per line, most frequent first. Filter-set tokens are appended at
// load time so glued units ("cupsugar") split too; compound ingredient names
// ("cupcake", "buttermilk") are listed whole so they never do.
const BUILTIN_WORDS: &str = include_str!("data/culinary_words.txt");

/// Token sets used to filter segmented words.
#[derive(Debug, Clone, Default)]
pub struct NormalizerConfig {
    pub descriptors: HashSet<String>,
    pub units: HashSet<String>,
    pub stopwords: HashSet<String>,
    pub blacklist: HashSet<String>,
    /// Tokens that survive filtering even when a set above lists them.
    pub whitelist: HashSet<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NormalizerConfigFile {
    descriptors: Option<Vec<String>>,
    units: Option<Vec<String>>,
    stopwords: Option<Vec<String>>,
    blacklist: Option<Vec<String>>,
    #[serde(default)]
    whitelist: Vec<String>,
    #[serde(default)]
    extra_words: Vec<String>,
}

fn to_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn lower_set(words: Vec<String>) -> HashSet<String> {
    words.into_iter().map(|w| w.trim().to_lowercase()).filter(|w| !w.is_empty()).collect()
}

impl NormalizerConfig {
    /// Token sets of the production pipeline.
    pub fn builtin() -> Self {
        Self {
            descriptors: to_set(DESCRIPTORS),
            units: to_set(UNITS),
            stopwords: to_set(STOPWORDS),
            blacklist: to_set(BLACKLIST),
            whitelist: HashSet::new(),
        }
    }

    fn is_filtered(&self, token: &str) -> bool {
        if self.whitelist.contains(token) {
            return false;
        }
        token.len() < MIN_TOKEN_LEN
            || self.descriptors.contains(token)
            || self.units.contains(token)
            || self.stopwords.contains(token)
            || self.blacklist.contains(token)
    }

    fn all_tokens(&self) -> impl Iterator<Item = &String> {
        self.descriptors
            .iter()
            .chain(self.units.iter())
            .chain(self.stopwords.iter())
            .chain(self.blacklist.iter())
            .chain(self.whitelist.iter())
    }
}

/// Splits glued words into dictionary words by minimum total cost.
///
/// A word of frequency rank `r` in a dictionary of `n` words costs
/// `ln((r + 1) * ln(n))`, so common words are cheap and long rare splits
/// are expensive.
#[derive(Debug, Clone)]
pub struct WordSegmenter {
    costs: HashMap<String, f64>,
    max_len: usize,
}

impl WordSegmenter {
    /// Build from words ordered most frequent first. Later duplicates are
    /// ignored.
    pub fn from_ranked<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranked: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if word.is_empty() || !word.bytes().all(|b| b.is_ascii_lowercase()) {
                continue;
            }
            if seen.insert(word.clone()) {
                ranked.push(word);
            }
        }

        let log_n = (ranked.len().max(2) as f64).ln();
        let max_len = ranked.iter().map(|w| w.len()).max().unwrap_or(0);
        let costs = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, word)| (word, ((rank as f64 + 1.0) * log_n).ln()))
            .collect();

        Self { costs, max_len }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.costs.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Segment a single lowercase ASCII word.
    pub fn segment(&self, word: &str) -> Vec<String> {
        if word.is_empty() {
            return vec![];
        }
        if self.contains(word) || !word.is_ascii() {
            return vec![word.to_string()];
        }

        let n = word.len();
        // best[i] = (cost of best split of word[..i], start of its last piece)
        let mut best: Vec<(f64, usize)> = vec![(f64::INFINITY, 0); n + 1];
        best[0] = (0.0, 0);
        for end in 1..=n {
            let lo = end.saturating_sub(self.max_len);
            for start in lo..end {
                let prefix = best[start].0;
                if !prefix.is_finite() {
                    continue;
                }
                if let Some(cost) = self.costs.get(&word[start..end]) {
                    let total = prefix + cost;
                    if total < best[end].0 {
                        best[end] = (total, start);
                    }
                }
            }
        }

        if !best[n].0.is_finite() {
            // Not fully coverable: keep the word intact.
            return vec![word.to_string()];
        }

        let mut pieces = Vec::new();
        let mut end = n;
        while end > 0 {
            let start = best[end].1;
            pieces.push(word[start..end].to_string());
            end = start;
        }
        pieces.reverse();
        pieces
    }
}

/// `.yaml`/`.yml` files are YAML, anything else JSON.
fn parse_config_file(path: &Path, raw: &str) -> Result<NormalizerConfigFile> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let parsed = if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| PlannerError::Config(format!("invalid normalizer config {}: {}", path.display(), e)))
}

/// Ingredient normalizer; immutable after construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    segmenter: WordSegmenter,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::builtin(), std::iter::empty::<String>())
    }
}

impl Normalizer {
    /// Build a normalizer. `extra_words` extend the built-in vocabulary and
    /// rank after it.
    pub fn new<I, S>(config: NormalizerConfig, extra_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = BUILTIN_WORDS.lines().map(|w| w.to_string()).collect();
        words.extend(extra_words.into_iter().map(|w| w.as_ref().to_string()));
        words.extend(config.all_tokens().cloned());
        let segmenter = WordSegmenter::from_ranked(words);
        Self { config, segmenter }
    }

    /// Load from an optional YAML or JSON config file and an optional word
    /// list (one word per line, most frequent first).
    pub fn load(config_path: Option<&Path>, wordlist_path: Option<&Path>) -> Result<Self> {
        let mut config = NormalizerConfig::builtin();
        let mut extra_words = Vec::new();

        if let Some(path) = config_path {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                PlannerError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            let file = parse_config_file(path, &raw)?;
            if let Some(v) = file.descriptors {
                config.descriptors = lower_set(v);
            }
            if let Some(v) = file.units {
                config.units = lower_set(v);
            }
            if let Some(v) = file.stopwords {
                config.stopwords = lower_set(v);
            }
            if let Some(v) = file.blacklist {
                config.blacklist = lower_set(v);
            }
            config.whitelist = lower_set(file.whitelist);
            extra_words.extend(file.extra_words);
        }

        if let Some(path) = wordlist_path {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                PlannerError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            extra_words.extend(raw.lines().map(|l| l.to_string()));
        }

        let normalizer = Self::new(config, extra_words);
        debug!("Normalizer loaded with {} dictionary words", normalizer.segmenter.len());
        Ok(normalizer)
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn segmenter(&self) -> &WordSegmenter {
        &self.segmenter
    }

    /// Normalize free-form ingredient text. Never fails; low confidence is
    /// reported through the tier.
    pub fn normalize(&self, raw: &str) -> NormalizedIngredient {
        let cleaned: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
            .collect();

        let subwords: Vec<String> = cleaned
            .split_whitespace()
            .flat_map(|word| self.segmenter.segment(word))
            .collect();

        let filtered: Vec<&str> = subwords
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !self.config.is_filtered(s))
            .collect();

        let (canonical, tier) = if filtered.is_empty() {
            let last = subwords.last().cloned().unwrap_or_default();
            (last, Tier::Fallback)
        } else {
            let tier = if filtered.len() >= 2 { Tier::Strong } else { Tier::Weak };
            (filtered.join(" "), tier)
        };

        NormalizedIngredient {
            raw: raw.to_string(),
            canonical,
            tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_blacklisted(words: &[&str]) -> Normalizer {
        let mut config = NormalizerConfig::builtin();
        config.blacklist.extend(words.iter().map(|w| w.to_string()));
        Normalizer::new(config, std::iter::empty::<String>())
    }

    #[test]
    fn test_miracle_whip_drops_blacklisted_dressing() {
        let normalizer = with_blacklisted(&["dressing"]);
        let n = normalizer.normalize("Miracle Whip Salad Dressing");
        assert_eq!(n.canonical, "miracle whip salad");
        assert_eq!(n.tier, Tier::Strong);
        assert_eq!(n.raw, "Miracle Whip Salad Dressing");
    }

    #[test]
    fn test_glued_words_are_segmented() {
        let normalizer = Normalizer::default();
        let n = normalizer.normalize("MiracleWhip");
        assert_eq!(n.canonical, "miracle whip");
        assert_eq!(n.tier, Tier::Strong);

        let n = normalizer.normalize("peanutbutter");
        assert_eq!(n.canonical, "peanut butter");
    }

    #[test]
    fn test_units_descriptors_and_stopwords_dropped() {
        let normalizer = Normalizer::default();
        let n = normalizer.normalize("2 cups of fresh Butter!");
        assert_eq!(n.canonical, "butter");
        assert_eq!(n.tier, Tier::Weak);

        let n = normalizer.normalize("some brand butter");
        assert_eq!(n.canonical, "butter");
        assert_eq!(n.tier, Tier::Weak);
    }

    #[test]
    fn test_fallback_uses_last_subword() {
        let normalizer = Normalizer::default();
        let n = normalizer.normalize("1 cup");
        assert_eq!(n.canonical, "cup");
        assert_eq!(n.tier, Tier::Fallback);

        let n = normalizer.normalize("fresh frozen");
        assert_eq!(n.canonical, "frozen");
        assert_eq!(n.tier, Tier::Fallback);
    }

    #[test]
    fn test_no_alphabetic_input_yields_empty_canonical() {
        let normalizer = Normalizer::default();
        let n = normalizer.normalize("  12 / 3.5 ");
        assert_eq!(n.canonical, "");
        assert_eq!(n.tier, Tier::Fallback);
        assert!(n.is_empty());
    }

    #[test]
    fn test_unknown_words_kept_whole() {
        let normalizer = Normalizer::default();
        let n = normalizer.normalize("gochujang");
        assert_eq!(n.canonical, "gochujang");
        assert_eq!(n.tier, Tier::Weak);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = with_blacklisted(&["dressing"]);
        let inputs = [
            "Miracle Whip Salad Dressing",
            "tblsp honey",
            "yellow sweet pepper",
            "kit kat fingers",
            "button garlic",
            "some brand butter",
            "2 cups MiracleWhip",
            "1 cup",
            "peanutbutterchips",
            "gochujang paste",
            "",
            "42",
        ];
        for input in inputs {
            let once = normalizer.normalize(input);
            let twice = normalizer.normalize(&once.canonical);
            assert_eq!(once.canonical, twice.canonical, "input {:?}", input);
        }
    }

    #[test]
    fn test_whitelist_overrides_filter_sets() {
        let mut config = NormalizerConfig::builtin();
        config.whitelist.insert("whole".to_string());
        let normalizer = Normalizer::new(config, std::iter::empty::<String>());
        let n = normalizer.normalize("whole wheat flour");
        assert_eq!(n.canonical, "whole wheat flour");
    }

    #[test]
    fn test_segmenter_prefers_common_words() {
        let seg = WordSegmenter::from_ranked(["the", "butter", "but", "ter", "peanut"]);
        assert_eq!(seg.segment("peanutbutter"), vec!["peanut", "butter"]);
        assert_eq!(seg.segment("xyz"), vec!["xyz"]);
        assert!(seg.segment("").is_empty());
    }

    #[test]
    fn test_load_config_file() {
        let dir = std::env::temp_dir().join(format!("plateplanner-normalizer-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("normalizer.json");
        std::fs::write(
            &config_path,
            r#"{"blacklist": ["Dressing", "brand"], "extra_words": ["gochujang"]}"#,
        )
        .unwrap();
        let wordlist = dir.join("words.txt");
        std::fs::write(&wordlist, "kimchi\nramen\n").unwrap();

        let normalizer = Normalizer::load(Some(&config_path), Some(&wordlist)).unwrap();
        assert!(normalizer.config().blacklist.contains("dressing"));
        assert!(normalizer.segmenter().contains("kimchi"));
        assert_eq!(normalizer.normalize("kimchiramen").canonical, "kimchi ramen");
        assert_eq!(normalizer.normalize("salad dressing").canonical, "salad");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_yaml_config_file() {
        let dir = std::env::temp_dir().join(format!("plateplanner-yaml-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("normalizer_config.yaml");
        std::fs::write(
            &config_path,
            "descriptors:\n- fresh\n- smoked\nunits:\n- cup\n- cups\nblacklist:\n- dressing\nwhitelist:\n- whole\n",
        )
        .unwrap();

        let normalizer = Normalizer::load(Some(&config_path), None).unwrap();
        assert!(normalizer.config().descriptors.contains("smoked"));
        assert!(!normalizer.config().descriptors.contains("frozen"));
        assert!(normalizer.config().whitelist.contains("whole"));
        assert_eq!(normalizer.normalize("2 cups smoked salmon").canonical, "salmon");
        assert_eq!(normalizer.normalize("ranch dressing").canonical, "ranch");

        std::fs::write(&config_path, "descriptors: [unclosed").unwrap();
        let err = Normalizer::load(Some(&config_path), None).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_compound_ingredients_stay_whole() {
        let normalizer = Normalizer::default();
        for (input, expected) in [
            ("cupcake", "cupcake"),
            ("Cupcakes", "cupcakes"),
            ("pancakes", "pancakes"),
            ("canola oil", "canola oil"),
            ("cornstarch", "cornstarch"),
            ("buttermilk", "buttermilk"),
        ] {
            assert_eq!(normalizer.normalize(input).canonical, expected, "input {:?}", input);
        }
        // Glued units still split off.
        assert_eq!(normalizer.normalize("cupsugar").canonical, "sugar");
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let path = std::env::temp_dir().join(format!("plateplanner-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = Normalizer::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
        std::fs::remove_file(&path).ok();
    }
}
