use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A building that can be shown on the campus map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Place {
    /// Unique short code, also the key floors point at.
    pub alias: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub maxfloor: i32,
}

/// A marker on a floor plan together with the floor number it sits on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MarkerPoint {
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub floor: i32,
}

/// One management row joined with its marker, type, floor and building.
///
/// `location` is rendered as `"<building> <floor>층"` so the front end can show
/// it directly and send it back unchanged on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ManagementEntry {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub date: Option<NaiveDate>,
    pub shake_date: Option<DateTime<Utc>>,
    pub location: String,
    pub status: Option<String>,
}

/// A point of interest from the denormalized `category` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CategoryPlace {
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// The marker name and observation anchor of a management row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShakeAnchor {
    pub name: String,
    pub shake_date: Option<DateTime<Utc>>,
}

/// The number of shake events recorded on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// A management update whose type and location have already been resolved
/// to their foreign keys.
///
/// `None` dates leave the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementUpdate {
    pub name: String,
    pub type_id: i32,
    pub floor_key: String,
    pub date: Option<NaiveDate>,
    pub shake_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_place_serializes_numeric_coordinates_under_type_key() {
        let place = CategoryPlace {
            name: "Vending machine".to_string(),
            kind: 3,
            latitude: 37.5665,
            longitude: 126.978,
        };
        assert_eq!(
            serde_json::to_value(&place).unwrap(),
            json!({ "name": "Vending machine", "type": 3, "latitude": 37.5665, "longitude": 126.978 })
        );
    }

    #[test]
    fn management_entry_exposes_type_name_as_type() {
        let entry = ManagementEntry {
            id: 7,
            name: "FE-12".to_string(),
            type_name: "Fire extinguisher".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            shake_date: None,
            location: "ENG 3층".to_string(),
            status: Some("normal".to_string()),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "Fire extinguisher");
        assert_eq!(value["date"], "2024-05-01");
        assert!(value["shake_date"].is_null());
        assert!(value.get("type_name").is_none());
    }
}
