//! US state geography: the FIPS directory and state-name handling.

pub mod atlas;

pub use atlas::{Bounds, StateAtlas, StateShape};

use crate::models::StateFips;

/// Census FIPS codes and names for every state, DC, and the BRFSS
/// territories (Guam, Puerto Rico, Virgin Islands).
const STATE_DIRECTORY: &[(u16, &str)] = &[
    (1, "Alabama"),
    (2, "Alaska"),
    (4, "Arizona"),
    (5, "Arkansas"),
    (6, "California"),
    (8, "Colorado"),
    (9, "Connecticut"),
    (10, "Delaware"),
    (11, "District of Columbia"),
    (12, "Florida"),
    (13, "Georgia"),
    (15, "Hawaii"),
    (16, "Idaho"),
    (17, "Illinois"),
    (18, "Indiana"),
    (19, "Iowa"),
    (20, "Kansas"),
    (21, "Kentucky"),
    (22, "Louisiana"),
    (23, "Maine"),
    (24, "Maryland"),
    (25, "Massachusetts"),
    (26, "Michigan"),
    (27, "Minnesota"),
    (28, "Mississippi"),
    (29, "Missouri"),
    (30, "Montana"),
    (31, "Nebraska"),
    (32, "Nevada"),
    (33, "New Hampshire"),
    (34, "New Jersey"),
    (35, "New Mexico"),
    (36, "New York"),
    (37, "North Carolina"),
    (38, "North Dakota"),
    (39, "Ohio"),
    (40, "Oklahoma"),
    (41, "Oregon"),
    (42, "Pennsylvania"),
    (44, "Rhode Island"),
    (45, "South Carolina"),
    (46, "South Dakota"),
    (47, "Tennessee"),
    (48, "Texas"),
    (49, "Utah"),
    (50, "Vermont"),
    (51, "Virginia"),
    (53, "Washington"),
    (54, "West Virginia"),
    (55, "Wisconsin"),
    (56, "Wyoming"),
    (66, "Guam"),
    (72, "Puerto Rico"),
    (78, "Virgin Islands"),
];

/// Looks up the display name for a FIPS code.
pub fn state_name(fips: StateFips) -> Option<&'static str> {
    STATE_DIRECTORY
        .iter()
        .find(|(code, _)| *code == fips.0)
        .map(|(_, name)| *name)
}

/// Restores state names mangled by upstream exports.
///
/// The regression export truncates names to ten characters and replaces
/// spaces with underscores; this undoes both.
pub fn canonical_name(raw: &str) -> String {
    match raw {
        "North_Dako" => "North Dakota".to_string(),
        "South_Dako" => "South Dakota".to_string(),
        "Mississipp" => "Mississippi".to_string(),
        "North_Caro" => "North Carolina".to_string(),
        "South_Caro" => "South Carolina".to_string(),
        "Pennsylvan" => "Pennsylvania".to_string(),
        "West_Virgi" => "West Virginia".to_string(),
        "New_Mexico" => "New Mexico".to_string(),
        "New_York" => "New York".to_string(),
        other => other.replace('_', " "),
    }
}
