//! Generated project names for obfuscation.
//!
//! Produces a readable two-adjective-noun name like `icy-quiet-meadow`.
//! Entropy comes from a v4 uuid; the name only needs to be unlikely to
//! collide within one user's projects, not cryptographically unique.

use uuid::Uuid;

const ADJECTIVES: &[&str] = &[
    "ancient", "autumn", "billowing", "bitter", "black", "blue", "bold", "broad", "broken",
    "calm", "cold", "cool", "crimson", "curly", "damp", "dark", "dawn", "delicate", "divine",
    "dry", "empty", "falling", "fancy", "flat", "floral", "fragrant", "frosty", "gentle",
    "green", "hidden", "holy", "icy", "jolly", "late", "lingering", "little", "lively", "long",
    "lucky", "misty", "morning", "muddy", "mute", "nameless", "noisy", "odd", "old", "orange",
    "patient", "plain", "polished", "proud", "purple", "quiet", "rapid", "raspy", "red",
    "restless", "rough", "round", "royal", "shiny", "shrill", "shy", "silent", "small",
    "snowy", "soft", "solitary", "sparkling", "spring", "square", "steep", "still", "summer",
    "super", "sweet", "throbbing", "tight", "tiny", "twilight", "wandering", "weathered",
    "white", "wild", "winter", "wispy", "withered", "yellow", "young",
];

const NOUNS: &[&str] = &[
    "art", "band", "bar", "base", "bird", "block", "boat", "bonus", "bread", "breeze", "brook",
    "bush", "butterfly", "cake", "cell", "cherry", "cloud", "credit", "darkness", "dawn",
    "dew", "disk", "dream", "dust", "feather", "field", "fire", "firefly", "flower", "fog",
    "forest", "frog", "frost", "glade", "glitter", "grass", "hall", "hat", "haze", "heart",
    "hill", "king", "lab", "lake", "leaf", "limit", "math", "meadow", "mode", "moon",
    "morning", "mountain", "mouse", "mud", "night", "paper", "pine", "poetry", "pond",
    "queen", "rain", "recipe", "resonance", "rice", "river", "salad", "scene", "sea",
    "shadow", "shape", "silence", "sky", "smoke", "snow", "snowflake", "sound", "star",
    "sun", "sunset", "surf", "term", "thunder", "tooth", "tree", "truth", "union", "unit",
    "violet", "voice", "water", "waterfall", "wave", "wildflower", "wind", "wood",
];

/// Generate a fresh two-adjective-noun project name.
pub fn generate_project_name() -> String {
    let bytes = *Uuid::new_v4().as_bytes();

    let first = u16::from_le_bytes([bytes[0], bytes[1]]) as usize % ADJECTIVES.len();
    let second = u16::from_le_bytes([bytes[2], bytes[3]]) as usize % ADJECTIVES.len();
    let noun = u16::from_le_bytes([bytes[4], bytes[5]]) as usize % NOUNS.len();

    format!("{}-{}-{}", ADJECTIVES[first], ADJECTIVES[second], NOUNS[noun])
}
