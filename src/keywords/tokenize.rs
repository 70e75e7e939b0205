//! Noun extraction from Korean bill text.
//!
//! [`HangulNounTokenizer`] is a dictionary-free approximation of a
//! part-of-speech noun filter: Korean attaches particles and verb endings
//! directly to the noun stem, so each word is cut at the longest known
//! particle/ending suffix and what remains is kept as the noun.

use once_cell::sync::Lazy;

/// Splits text into noun tokens, in order of appearance.
pub trait NounTokenizer {
    fn nouns(&self, text: &str) -> Vec<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HangulNounTokenizer;

/// Particles and verb endings, longest first.
static SUFFIXES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut suffixes = vec![
        "으로부터", "에서부터", "으로서", "으로써", "에게서", "에서는", "에서의", "으로는",
        "이라는", "에서", "에게", "으로", "부터", "까지", "하고", "하는", "하여", "하며",
        "한다", "했다", "된다", "되는", "되어", "이다", "에는", "에도", "과의", "와의",
        "이나", "이며", "하기", "함에", "은", "는", "이", "가", "을", "를", "의", "에", "로",
        "와", "과", "도", "만",
    ];
    suffixes.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));
    suffixes
});

/// Generic nouns that say nothing about a bill's subject.
const STOPWORDS: &[&str] = &[
    "경우", "다음", "이하", "해당", "대한", "위한", "따른", "관한", "통한", "또는", "그리고",
    "있다", "없다", "하다", "있는", "없는", "같은", "각호", "이를", "그밖",
];

const MIN_STEM_CHARS: usize = 2;

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn strip_particle(word: &str) -> &str {
    for suffix in SUFFIXES.iter() {
        if let Some(stem) = word.strip_suffix(suffix) {
            if stem.chars().count() >= MIN_STEM_CHARS {
                return stem;
            }
        }
    }
    word
}

fn noun_stem(word: &str) -> Option<String> {
    let stem = if word.chars().all(is_hangul_syllable) {
        strip_particle(word).to_string()
    } else if word.chars().all(|c| c.is_ascii_alphabetic()) {
        word.to_lowercase()
    } else {
        return None;
    };

    let long_enough = stem.chars().count() >= MIN_STEM_CHARS;
    (long_enough && !STOPWORDS.contains(&stem.as_str())).then_some(stem)
}

impl NounTokenizer for HangulNounTokenizer {
    fn nouns(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .filter_map(noun_stem)
            .collect()
    }
}
