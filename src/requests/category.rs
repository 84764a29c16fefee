//! # Operation categories.
//!
//! The set of categories is fixed at compile time. Each one owns exactly one
//! pending queue and one dispatch loop inside a [`Dispatcher`](crate::Dispatcher);
//! categories never share ordering or concurrency state.
//!
//! Names are parsed case-insensitively:
//! ```rust
//! use docdispatch::Category;
//!
//! assert_eq!("Conversion".parse::<Category>().unwrap(), Category::Conversion);
//! assert!("watermark".parse::<Category>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::SubmitError;

/// Independent class of document operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Format conversions (pdf → docx, images → pdf, ...).
    Conversion,
    /// Page-level editing (merge, split, watermark, ...).
    Editor,
    /// AI-assisted tools.
    Ai,
}

impl Category {
    /// Every category, in registry order.
    pub const ALL: [Category; 3] = [Category::Conversion, Category::Editor, Category::Ai];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Conversion => "conversion",
            Category::Editor => "editor",
            Category::Ai => "ai",
        }
    }

    /// Position of this category in [`Category::ALL`].
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SubmitError::InvalidCategory {
                name: s.to_string(),
            })
    }
}
