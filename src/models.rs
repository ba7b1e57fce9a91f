//! Data models for the survey analysis.
//!
//! This module contains the core data structures used throughout the
//! application: one row of the combined BRFSS extract plus the codebook
//! enums its coded columns decode into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First survey year covered by the combined extract.
pub const MIN_SURVEY_YEAR: u16 = 2018;
/// Last survey year covered by the combined extract.
pub const MAX_SURVEY_YEAR: u16 = 2024;
/// Calendar year the `year_centered` column is centered on.
pub const CENTER_YEAR: i32 = 2020;

/// Decodes the centered year column into a calendar year.
///
/// Returns `None` outside the 2018-2024 window the extract covers.
pub fn year_from_centered(centered: i32) -> Option<u16> {
    let year = CENTER_YEAR + centered;
    if (MIN_SURVEY_YEAR as i32..=MAX_SURVEY_YEAR as i32).contains(&year) {
        Some(year as u16)
    } else {
        None
    }
}

/// Census FIPS code of a US state or territory (`_STATE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateFips(pub u16);

impl fmt::Display for StateFips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Urban/rural classification of the respondent's county (`URRU`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Urbanity {
    /// Metropolitan counties (code 0).
    Urban,
    /// Non-metropolitan counties (code 1).
    Rural,
}

impl Urbanity {
    /// Decodes the 0/1 `URRU` code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Urbanity::Urban),
            1 => Some(Urbanity::Rural),
            _ => None,
        }
    }
}

impl fmt::Display for Urbanity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urbanity::Urban => write!(f, "Urban"),
            Urbanity::Rural => write!(f, "Rural"),
        }
    }
}

/// Six-level age group (`_AGE_G`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Age18To24,
    Age25To34,
    Age35To44,
    Age45To54,
    Age55To64,
    Age65Plus,
}

impl AgeGroup {
    /// Decodes the 1-6 `_AGE_G` code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AgeGroup::Age18To24),
            2 => Some(AgeGroup::Age25To34),
            3 => Some(AgeGroup::Age35To44),
            4 => Some(AgeGroup::Age45To54),
            5 => Some(AgeGroup::Age55To64),
            6 => Some(AgeGroup::Age65Plus),
            _ => None,
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgeGroup::Age18To24 => "18-24",
            AgeGroup::Age25To34 => "25-34",
            AgeGroup::Age35To44 => "35-44",
            AgeGroup::Age45To54 => "45-54",
            AgeGroup::Age55To64 => "55-64",
            AgeGroup::Age65Plus => "65 or older",
        };
        write!(f, "{}", label)
    }
}

/// Respondent sex (`SEXVAR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Decodes the 1/2 `SEXVAR` code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Sex::Male),
            2 => Some(Sex::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
        }
    }
}

/// Five-level race/ethnicity grouping (`_RACEGR3`).
///
/// Code 9 ("don't know / refused") is treated as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RaceEthnicity {
    WhiteNonHispanic,
    BlackNonHispanic,
    OtherNonHispanic,
    MultiracialNonHispanic,
    Hispanic,
}

impl RaceEthnicity {
    /// Decodes the 1-5 `_RACEGR3` code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(RaceEthnicity::WhiteNonHispanic),
            2 => Some(RaceEthnicity::BlackNonHispanic),
            3 => Some(RaceEthnicity::OtherNonHispanic),
            4 => Some(RaceEthnicity::MultiracialNonHispanic),
            5 => Some(RaceEthnicity::Hispanic),
            _ => None,
        }
    }
}

impl fmt::Display for RaceEthnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RaceEthnicity::WhiteNonHispanic => "Non-Hispanic White",
            RaceEthnicity::BlackNonHispanic => "Non-Hispanic Black",
            RaceEthnicity::OtherNonHispanic => "Non-Hispanic Other",
            RaceEthnicity::MultiracialNonHispanic => "Non-Hispanic Multiracial",
            RaceEthnicity::Hispanic => "Hispanic",
        };
        write!(f, "{}", label)
    }
}

/// Four-level educational attainment (`_EDUCAG`).
///
/// Code 9 ("don't know / refused") is treated as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Education {
    NoHighSchoolDiploma,
    HighSchoolGraduate,
    SomeCollege,
    CollegeGraduate,
}

impl Education {
    /// Decodes the 1-4 `_EDUCAG` code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Education::NoHighSchoolDiploma),
            2 => Some(Education::HighSchoolGraduate),
            3 => Some(Education::SomeCollege),
            4 => Some(Education::CollegeGraduate),
            _ => None,
        }
    }
}

impl fmt::Display for Education {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Education::NoHighSchoolDiploma => "Did not graduate high school",
            Education::HighSchoolGraduate => "Graduated high school",
            Education::SomeCollege => "Attended college or technical school",
            Education::CollegeGraduate => "Graduated from college or technical school",
        };
        write!(f, "{}", label)
    }
}

/// One respondent row after coercion and decoding.
///
/// Only the survey year and the sampling weight are required; every coded
/// column keeps an explicit missing state so grouped tables can report a
/// `Missing` category instead of silently dropping rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRecord {
    /// Survey calendar year, decoded from `year_centered`.
    pub year: u16,
    /// Design weight (`_LLCPWT`), always positive.
    pub weight: f64,
    /// State FIPS code, if present and integral.
    pub state: Option<StateFips>,
    /// Urban/rural county classification.
    pub urbanity: Option<Urbanity>,
    /// Current-smoker indicator (`currentsmoker`): 1 = yes, 0 = no.
    pub smoker: Option<bool>,
    /// Age group.
    pub age: Option<AgeGroup>,
    /// Sex.
    pub sex: Option<Sex>,
    /// Race/ethnicity grouping.
    pub race: Option<RaceEthnicity>,
    /// Educational attainment.
    pub education: Option<Education>,
}
