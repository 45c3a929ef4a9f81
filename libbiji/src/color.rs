//! Derive stable display colors for locations from their category
use std::{
    collections::HashMap,
    sync::{LazyLock, Mutex},
};
use tracing::warn;

/// The color used whenever a category color can't be derived
pub const DEFAULT_COLOR: &str = "#3b82f6";

const LIGHTNESS: [f64; 3] = [0.35, 0.5, 0.65];
const SATURATION: [f64; 3] = [0.35, 0.5, 0.65];

static DERIVER: LazyLock<ColorDeriver> = LazyLock::new(ColorDeriver::new);

/// Get the color for a location name from the process-wide [ColorDeriver]
pub fn color_for(name: &str) -> String {
    DERIVER.color_for(name)
}

/// The category of a location is the first word of its name, lower-cased
pub fn category_of(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Upper-case the first letter of every space-separated word and lower-case
/// the rest
pub fn to_title_case(text: &str) -> String {
    text.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps location names to colors. Every location in the same category gets the
/// same color, and derived colors are cached for the lifetime of the deriver.
/// The cache is never evicted.
#[derive(Debug, Default)]
pub struct ColorDeriver {
    cache: Mutex<HashMap<String, String>>,
}

impl ColorDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the color for the category of `name`. This never fails: if no color
    /// can be derived, [DEFAULT_COLOR] is returned.
    pub fn color_for(&self, name: &str) -> String {
        let category = category_of(name);
        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(_) => {
                warn!("color cache is poisoned, deriving without it");
                return derive(&category).unwrap_or_else(|| DEFAULT_COLOR.to_string());
            }
        };
        if let Some(color) = cache.get(&category) {
            return color.clone();
        }
        match derive(&category) {
            Some(color) => {
                cache.insert(category, color.clone());
                color
            }
            None => DEFAULT_COLOR.to_string(),
        }
    }

    /// The number of categories that have a cached color
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn derive(category: &str) -> Option<String> {
    if category.is_empty() {
        return None;
    }
    let (h, s, l) = hsl(bkdr_hash(category));
    let (r, g, b) = hsl_to_rgb(h, s, l);
    Some(format!("#{r:02x}{g:02x}{b:02x}"))
}

// BKDR string hash over UTF-16 code units, kept below 2^53
fn bkdr_hash(s: &str) -> u64 {
    const SEED: u64 = 131;
    const SEED2: u64 = 137;
    const MAX_SAFE: u64 = ((1u64 << 53) - 1) / SEED2;
    let mut hash: u64 = 0;
    for unit in s.encode_utf16().chain("x".encode_utf16()) {
        if hash > MAX_SAFE {
            hash /= SEED2;
        }
        hash = hash * SEED + u64::from(unit);
    }
    hash
}

fn hsl(mut hash: u64) -> (f64, f64, f64) {
    let h = (hash % 359) as f64;
    hash /= 360;
    let s = SATURATION[(hash % SATURATION.len() as u64) as usize];
    hash /= SATURATION.len() as u64;
    let l = LIGHTNESS[(hash % LIGHTNESS.len() as u64) as usize];
    (h, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let h = h / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut c: f64| {
        if c < 0.0 {
            c += 1.0;
        }
        if c > 1.0 {
            c -= 1.0;
        }
        let v = if c < 1.0 / 6.0 {
            p + (q - p) * 6.0 * c
        } else if c < 0.5 {
            q
        } else if c < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - c)
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex_color(s: &str) -> bool {
        s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_category() {
        assert_eq!(category_of("Cafe Tugu Kunstkring"), "cafe");
        assert_eq!(category_of("  Museum  Nasional"), "museum");
        assert_eq!(category_of("TAMAN"), "taman");
        assert_eq!(category_of(""), "");
        assert_eq!(category_of("   "), "");
    }

    #[test]
    fn test_same_category_same_color() {
        let deriver = ColorDeriver::new();
        let a = deriver.color_for("Cafe Tugu");
        let b = deriver.color_for("cafe batavia");
        assert!(is_hex_color(&a), "{a} is not a hex color");
        assert_eq!(a, b);
        assert_eq!(deriver.len(), 1);
        // calling again hits the cache and returns the same value
        assert_eq!(deriver.color_for("CAFE"), a);
        assert_eq!(deriver.len(), 1);
    }

    #[test]
    fn test_derivation_is_deterministic_across_derivers() {
        let a = ColorDeriver::new().color_for("masjid istiqlal");
        let b = ColorDeriver::new().color_for("masjid agung");
        assert_eq!(a, b);
        assert_eq!(color_for("Masjid Raya"), a);
    }

    #[test]
    fn test_different_categories_are_cached_separately() {
        let deriver = ColorDeriver::new();
        deriver.color_for("cafe one");
        deriver.color_for("museum two");
        deriver.color_for("pasar three");
        assert_eq!(deriver.len(), 3);
    }

    #[test]
    fn test_default_color() {
        let deriver = ColorDeriver::new();
        assert_eq!(deriver.color_for(""), DEFAULT_COLOR);
        assert_eq!(deriver.color_for("   \t "), DEFAULT_COLOR);
        assert!(deriver.is_empty());
    }

    #[test]
    fn test_hsl_to_rgb() {
        assert_eq!(hsl_to_rgb(0.0, 0.5, 0.5), (191, 64, 64));
        assert_eq!(hsl_to_rgb(120.0, 0.5, 0.5), (64, 191, 64));
        assert_eq!(hsl_to_rgb(240.0, 0.5, 0.5), (64, 64, 191));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(to_title_case("cafe TUGU kunstkring"), "Cafe Tugu Kunstkring");
        assert_eq!(to_title_case("a  b"), "A  B");
        assert_eq!(to_title_case(""), "");
    }
}
