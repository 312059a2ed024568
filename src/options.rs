//! Configuration options for the debug dump and the random generator.
//!
//! - [`DebugOptions`]: layout of the indentation-based debug text
//! - [`RandomOptions`]: seed and size limits for random values
//!
//! ## Examples
//!
//! ```rust
//! use shapewire::{to_debug_string_with_options, DebugOptions};
//!
//! let mut point = (1u8, 2u16);
//! let options = DebugOptions::new().with_indent(4).with_kinds(true);
//! let text = to_debug_string_with_options(&mut point, options);
//! assert_eq!(text, "(\n    1u8\n    2u16\n)\n");
//! ```

/// Configuration for [`crate::DebugEncoder`].
///
/// # Examples
///
/// ```rust
/// use shapewire::DebugOptions;
///
/// let options = DebugOptions::new();
/// assert_eq!(options.indent, 2);
/// assert!(!options.show_kinds);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Suffix every number with its scalar kind, as in `7u32`.
    pub show_kinds: bool,
}

impl Default for DebugOptions {
    fn default() -> Self {
        DebugOptions {
            indent: 2,
            show_kinds: false,
        }
    }
}

impl DebugOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation size (number of spaces per level).
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn with_kinds(mut self, show_kinds: bool) -> Self {
        self.show_kinds = show_kinds;
        self
    }
}

const DEFAULT_NONE_PROBABILITY: f64 = 0.25;

/// Configuration for [`crate::RandomGenerator`].
///
/// The same seed and options always produce the same value.
///
/// # Examples
///
/// ```rust
/// use shapewire::{random_value, RandomOptions};
///
/// let options = RandomOptions::new().with_seed(7).with_max_len(3);
/// let a: Vec<u32> = random_value(&options).unwrap();
/// let b: Vec<u32> = random_value(&options).unwrap();
/// assert_eq!(a, b);
/// assert!(a.len() <= 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RandomOptions {
    pub seed: u64,
    /// Upper bound on list, map and binary block element counts.
    pub max_len: usize,
    /// Upper bound on string lengths, in characters.
    pub max_string_len: usize,
    /// Chance that an optional value is absent, in `[0, 1]`.
    pub none_probability: f64,
    /// Regions nested deeper than this get no list elements and no optional
    /// payloads, which keeps recursive shapes finite.
    pub max_depth: usize,
}

impl Default for RandomOptions {
    fn default() -> Self {
        RandomOptions {
            seed: 0,
            max_len: 8,
            max_string_len: 16,
            none_probability: DEFAULT_NONE_PROBABILITY,
            max_depth: 16,
        }
    }
}

impl RandomOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    #[must_use]
    pub fn with_max_string_len(mut self, max_string_len: usize) -> Self {
        self.max_string_len = max_string_len;
        self
    }

    /// Sets the chance that an optional value is absent. Clamped to `[0, 1]`;
    /// NaN falls back to the default.
    #[must_use]
    pub fn with_none_probability(mut self, probability: f64) -> Self {
        self.none_probability = probability_or_default(probability);
        self
    }

    /// The effective absence chance, valid even if the field was set directly.
    pub(crate) fn absent_chance(&self) -> f64 {
        probability_or_default(self.none_probability)
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn probability_or_default(probability: f64) -> f64 {
    if probability.is_nan() {
        DEFAULT_NONE_PROBABILITY
    } else {
        probability.clamp(0.0, 1.0)
    }
}
