use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suffix the front end appends to floor numbers ("floor" in Korean).
pub const FLOOR_SUFFIX: &str = "층";

/// A floor inside a building, identified the way clients name it.
///
/// `building` may be either the building alias or its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub building: String,
    pub floor: i32,
}

impl Location {
    pub fn new(building: impl Into<String>, floor: i32) -> Self {
        Self {
            building: building.into(),
            floor,
        }
    }
}

/// Parses the legacy `"<building> <floor>층"` form.
///
/// The split happens on the last space, so building names that contain
/// spaces still parse. The `층` suffix is optional.
impl FromStr for Location {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidInput("location".to_string(), reason.to_string());

        let (building, floor) = s
            .trim()
            .rsplit_once(' ')
            .ok_or_else(|| invalid("expected \"<building> <floor>층\""))?;

        let building = building.trim();
        if building.is_empty() {
            return Err(invalid("building is empty"));
        }

        let floor = floor.strip_suffix(FLOOR_SUFFIX).unwrap_or(floor);
        let floor = floor
            .parse::<i32>()
            .map_err(|_| invalid("floor is not a number"))?;

        Ok(Self::new(building, floor))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.building, self.floor, FLOOR_SUFFIX)
    }
}
