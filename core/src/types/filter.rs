use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Image derivation filter applied before feature computation
///
/// Each enabled category produces one or more derived images, and every
/// derived image contributes its own block of feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterCategory {
    Original,
    Wavelet,
    Square,
    SquareRoot,
    Logarithm,
    Exponential,
    Gradient,
    LoG,
    Lbp2D,
    Lbp3D,
}

impl FilterCategory {
    /// Every category, in enumeration order
    pub const ALL: [FilterCategory; 10] = [
        FilterCategory::Original,
        FilterCategory::Wavelet,
        FilterCategory::Square,
        FilterCategory::SquareRoot,
        FilterCategory::Logarithm,
        FilterCategory::Exponential,
        FilterCategory::Gradient,
        FilterCategory::LoG,
        FilterCategory::Lbp2D,
        FilterCategory::Lbp3D,
    ];

    /// Returns the canonical category name used on input
    pub fn name(&self) -> &'static str {
        match self {
            FilterCategory::Original => "Original",
            FilterCategory::Wavelet => "Wavelet",
            FilterCategory::Square => "Square",
            FilterCategory::SquareRoot => "SquareRoot",
            FilterCategory::Logarithm => "Logarithm",
            FilterCategory::Exponential => "Exponential",
            FilterCategory::Gradient => "Gradient",
            FilterCategory::LoG => "LoG",
            FilterCategory::Lbp2D => "LBP2D",
            FilterCategory::Lbp3D => "LBP3D",
        }
    }

    /// Returns simple lowercase name, used in export file names
    pub fn simple_name(&self) -> &'static str {
        match self {
            FilterCategory::Original => "original",
            FilterCategory::Wavelet => "wavelet",
            FilterCategory::Square => "square",
            FilterCategory::SquareRoot => "squareroot",
            FilterCategory::Logarithm => "logarithm",
            FilterCategory::Exponential => "exponential",
            FilterCategory::Gradient => "gradient",
            FilterCategory::LoG => "log",
            FilterCategory::Lbp2D => "lbp2d",
            FilterCategory::Lbp3D => "lbp3d",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FilterCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FilterCategory::ALL
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| format!("unknown filter type '{}'", wanted))
    }
}

/// Set of enabled derivation categories
///
/// `All` is kept distinct from an explicit list naming every category so
/// that export naming can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterSelection {
    /// Every category in [`FilterCategory::ALL`]
    All,
    /// Only the listed categories (never empty once validated)
    Only(BTreeSet<FilterCategory>),
}

impl FilterSelection {
    /// Parses a list of user-selected names
    ///
    /// The special name `All` anywhere in the list selects every category.
    ///
    /// # Example
    ///
    /// ```
    /// use radiobatch_core::{FilterCategory, FilterSelection};
    ///
    /// let selection = FilterSelection::parse(&["original", "LoG"]).unwrap();
    /// assert_eq!(
    ///     selection.enabled(),
    ///     vec![FilterCategory::Original, FilterCategory::LoG]
    /// );
    ///
    /// let all = FilterSelection::parse(&["Wavelet", "All"]).unwrap();
    /// assert_eq!(all, FilterSelection::All);
    /// ```
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut selected = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case("all") {
                return Ok(FilterSelection::All);
            }
            selected.insert(name.parse::<FilterCategory>()?);
        }

        if selected.is_empty() {
            return Err("at least one filter type must be selected".to_string());
        }
        Ok(FilterSelection::Only(selected))
    }

    /// Returns the enabled categories in enumeration order
    pub fn enabled(&self) -> Vec<FilterCategory> {
        match self {
            FilterSelection::All => FilterCategory::ALL.to_vec(),
            FilterSelection::Only(set) => set.iter().copied().collect(),
        }
    }

    /// Checks whether a category is enabled
    pub fn contains(&self, category: FilterCategory) -> bool {
        match self {
            FilterSelection::All => true,
            FilterSelection::Only(set) => set.contains(&category),
        }
    }

    /// Returns true when the selection enables nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterSelection::Only(set) if set.is_empty())
    }

    /// Scope tag used in export file names
    pub fn scope(&self) -> String {
        match self {
            FilterSelection::All => "all".to_string(),
            FilterSelection::Only(set) => set
                .iter()
                .map(|c| c.simple_name())
                .collect::<Vec<_>>()
                .join("-"),
        }
    }
}

impl Default for FilterSelection {
    fn default() -> Self {
        FilterSelection::Only(BTreeSet::from([FilterCategory::Original]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Original", FilterCategory::Original)]
    #[case("wavelet", FilterCategory::Wavelet)]
    #[case("SQUAREROOT", FilterCategory::SquareRoot)]
    #[case("log", FilterCategory::LoG)]
    #[case("lbp2d", FilterCategory::Lbp2D)]
    #[case(" LBP3D ", FilterCategory::Lbp3D)]
    fn test_category_from_str(#[case] input: &str, #[case] expected: FilterCategory) {
        assert_eq!(input.parse::<FilterCategory>().unwrap(), expected);
    }

    #[test]
    fn test_category_from_str_unknown() {
        assert!("Laplacian".parse::<FilterCategory>().is_err());
    }

    #[test]
    fn test_all_expands_to_full_enumeration() {
        let enabled = FilterSelection::All.enabled();
        assert_eq!(enabled.len(), 10);
        assert_eq!(enabled, FilterCategory::ALL.to_vec());
    }

    #[test]
    fn test_parse_empty_selection_fails() {
        let empty: [&str; 0] = [];
        assert!(FilterSelection::parse(&empty).is_err());
        assert!(FilterSelection::parse(&["", "  "]).is_err());
    }

    #[test]
    fn test_parse_deduplicates_and_orders() {
        let selection = FilterSelection::parse(&["Gradient", "original", "Gradient"]).unwrap();
        assert_eq!(
            selection.enabled(),
            vec![FilterCategory::Original, FilterCategory::Gradient]
        );
        assert!(selection.contains(FilterCategory::Gradient));
        assert!(!selection.contains(FilterCategory::Wavelet));
    }

    #[test]
    fn test_scope() {
        assert_eq!(FilterSelection::All.scope(), "all");
        let selection = FilterSelection::parse(&["LoG", "Original"]).unwrap();
        assert_eq!(selection.scope(), "original-log");
    }

    #[test]
    fn test_default_is_original_only() {
        let selection = FilterSelection::default();
        assert_eq!(selection.enabled(), vec![FilterCategory::Original]);
        assert!(!selection.is_empty());
    }
}
