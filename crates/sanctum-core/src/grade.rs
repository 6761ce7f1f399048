//! Letter grade classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A discrete letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F")]
    F,
}

impl LetterGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bound of each band, highest first.
///
/// Bands are half-open: a band covers `[lower, next higher band's lower)`,
/// and the top band has no upper bound. A score sitting exactly on a
/// boundary therefore lands in the higher band.
pub const GRADE_BANDS: [(f64, LetterGrade); 11] = [
    (90.0, LetterGrade::A),
    (87.0, LetterGrade::AMinus),
    (83.0, LetterGrade::BPlus),
    (80.0, LetterGrade::B),
    (77.0, LetterGrade::BMinus),
    (73.0, LetterGrade::CPlus),
    (70.0, LetterGrade::C),
    (67.0, LetterGrade::CMinus),
    (63.0, LetterGrade::DPlus),
    (60.0, LetterGrade::D),
    (50.0, LetterGrade::DMinus),
];

/// Map a `[0, 100]` score to its letter grade. Anything below 50, and NaN,
/// is an F.
pub fn classify(score: f64) -> LetterGrade {
    GRADE_BANDS
        .iter()
        .find(|(lower, _)| score >= *lower)
        .map(|(_, grade)| *grade)
        .unwrap_or(LetterGrade::F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_values() {
        assert_eq!(classify(95.0), LetterGrade::A);
        assert_eq!(classify(88.5), LetterGrade::AMinus);
        assert_eq!(classify(85.0), LetterGrade::BPlus);
        assert_eq!(classify(81.0), LetterGrade::B);
        assert_eq!(classify(78.0), LetterGrade::BMinus);
        assert_eq!(classify(75.0), LetterGrade::CPlus);
        assert_eq!(classify(71.0), LetterGrade::C);
        assert_eq!(classify(68.0), LetterGrade::CMinus);
        assert_eq!(classify(65.0), LetterGrade::DPlus);
        assert_eq!(classify(61.0), LetterGrade::D);
        assert_eq!(classify(55.0), LetterGrade::DMinus);
        assert_eq!(classify(40.0), LetterGrade::F);
    }

    #[test]
    fn boundaries_resolve_to_higher_band() {
        assert_eq!(classify(100.0), LetterGrade::A);
        assert_eq!(classify(90.0), LetterGrade::A);
        assert_eq!(classify(87.0), LetterGrade::AMinus);
        assert_eq!(classify(83.0), LetterGrade::BPlus);
        assert_eq!(classify(60.0), LetterGrade::D);
        assert_eq!(classify(50.0), LetterGrade::DMinus);
        assert_eq!(classify(49.999), LetterGrade::F);
        assert_eq!(classify(89.999), LetterGrade::AMinus);
    }

    #[test]
    fn total_over_range() {
        let mut previous = classify(0.0);
        assert_eq!(previous, LetterGrade::F);
        // Walking upward, the band index never moves back down the table.
        let rank = |g: LetterGrade| {
            GRADE_BANDS
                .iter()
                .position(|(_, b)| *b == g)
                .unwrap_or(GRADE_BANDS.len())
        };
        for step in 0..=10_000 {
            let score = step as f64 / 100.0;
            let grade = classify(score);
            assert!(rank(grade) <= rank(previous), "regressed at {score}");
            previous = grade;
        }
    }

    #[test]
    fn nan_is_f() {
        assert_eq!(classify(f64::NAN), LetterGrade::F);
    }

    #[test]
    fn display_matches_serde() {
        for (_, grade) in GRADE_BANDS {
            let json = serde_json::to_string(&grade).unwrap();
            assert_eq!(json, format!("\"{grade}\""));
        }
    }
}
