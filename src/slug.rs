use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

const DESCRIPTOR_WORDS: &[&str] = &[
    "mini", "small", "medium", "large", "big", "huge", "slim", "thin", "thick", "long", "short",
    "new", "premium", "deluxe", "luxury", "luxe", "classic", "original", "pro", "plus", "super",
    "ultra", "extra", "soft", "hard", "firm", "silicone", "glass", "metal", "steel", "stainless",
    "leather", "rubber", "cotton", "lace", "satin", "vinyl", "latex", "mesh", "wet", "look",
    "realistic", "rechargeable", "waterproof", "wireless", "remote", "controlled", "vibrating",
    "vibrator", "vibe", "dual", "double", "triple", "set", "kit", "pack", "edition", "version",
    "limited", "travel", "size", "sized",
];

const COLOUR_WORDS: &[&str] = &[
    "black", "white", "red", "pink", "purple", "blue", "green", "yellow", "orange", "grey", "gray",
    "silver", "gold", "bronze", "brown", "beige", "nude", "clear", "transparent", "teal", "navy",
    "violet", "lilac", "lavender", "magenta", "fuchsia", "burgundy", "cream", "ivory", "rose",
    "coral", "turquoise", "aqua", "mint", "plum", "multicolour", "multicolor", "rainbow",
    "rose-gold", "hot-pink", "light-pink", "baby-pink", "light-blue", "sky-blue", "navy-blue",
    "royal-blue", "dark-blue", "off-white", "jet-black", "dark-grey", "light-grey",
];

const CLOTHING_SIZES: &[&str] = &["xs", "sm", "md", "lg", "xl", "xxl", "xxxl"];

static DESCRIPTORS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| DESCRIPTOR_WORDS.iter().copied().collect());

// Hyphenated and concatenated spellings.
static COLOURS: Lazy<HashSet<String>> = Lazy::new(|| {
    COLOUR_WORDS
        .iter()
        .flat_map(|word| [word.to_string(), word.replace('-', "")])
        .collect()
});

static SIZES: Lazy<HashSet<&'static str>> = Lazy::new(|| CLOTHING_SIZES.iter().copied().collect());

static DIMENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(mm|cm|m|in|inch|inches|ft|ml|l|g|kg|oz|x)?$").expect("dimension pattern")
});

/// Lowercase, accent-folded, hyphen-separated identifier.
pub fn normalize(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.nfd().filter(|ch| !is_combining_mark(*ch)) {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

// Falls back to the slug itself when nothing would remain.
pub fn comparison_key(slug: &str) -> String {
    let tokens: Vec<&str> = slug.split('-').filter(|t| !t.is_empty()).collect();
    let mut kept = Vec::with_capacity(tokens.len());
    let mut idx = 0;
    while idx < tokens.len() {
        if let Some(next) = tokens.get(idx + 1)
            && is_compound_colour(tokens[idx], next)
        {
            idx += 2;
            continue;
        }
        if !is_noise_token(tokens[idx]) {
            kept.push(tokens[idx]);
        }
        idx += 1;
    }
    if kept.is_empty() {
        slug.to_string()
    } else {
        kept.join("-")
    }
}

fn is_compound_colour(first: &str, second: &str) -> bool {
    COLOURS.contains(&format!("{first}-{second}")) || COLOURS.contains(&format!("{first}{second}"))
}

fn is_noise_token(token: &str) -> bool {
    DESCRIPTORS.contains(token)
        || COLOURS.contains(token)
        || SIZES.contains(token)
        || DIMENSION.is_match(token)
}
