// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route export from the activity history table to GeoJSON.

use crate::db::Row;
use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

/// Locates cells by header name, so column order changes do not matter.
struct Columns {
    date: Option<usize>,
    distance_km: Option<usize>,
    polyline: Option<usize>,
    start_latlng: Option<usize>,
    end_latlng: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Self {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        Self {
            date: find("date"),
            distance_km: find("distance_km"),
            polyline: find("polyline"),
            start_latlng: find("start_latlng"),
            end_latlng: find("end_latlng"),
        }
    }
}

/// Convert activity rows (header first) into one feature per activity.
///
/// Rows with neither a date nor a distance are skipped. A polyline that
/// fails to decode is logged and the activity is exported without a route.
pub fn export_routes(rows: &[Row]) -> FeatureCollection {
    let mut features = Vec::new();

    if let Some((header, data)) = rows.split_first() {
        let columns = Columns::from_header(header);

        for row in data {
            let date = cell(row, columns.date);
            let distance = cell(row, columns.distance_km);
            if date.is_empty() && distance.is_empty() {
                continue;
            }

            let route = decode_route(cell(row, columns.polyline), date);
            features.push(feature(row, &columns, route));
        }
    }

    tracing::info!(features = features.len(), "Routes exported");
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature(row: &[String], columns: &Columns, route: Option<LineString<f64>>) -> Feature {
    let (start_lat, start_lng) = lat_lng(cell(row, columns.start_latlng));
    let (end_lat, end_lng) = lat_lng(cell(row, columns.end_latlng));
    let num_points = route.as_ref().map_or(0, |line| line.0.len());

    let mut properties = JsonObject::new();
    properties.insert("date".into(), cell(row, columns.date).into());
    properties.insert(
        "distance_km".into(),
        number_or_null(cell(row, columns.distance_km)),
    );
    properties.insert("start_lng".into(), optional(start_lng));
    properties.insert("start_lat".into(), optional(start_lat));
    properties.insert("end_lng".into(), optional(end_lng));
    properties.insert("end_lat".into(), optional(end_lat));
    properties.insert(
        "has_route".into(),
        if route.is_some() { "yes" } else { "no" }.into(),
    );
    properties.insert("num_points".into(), num_points.into());

    Feature {
        bbox: None,
        geometry: route.map(|line| Geometry::new(geojson::Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Decode a Strava polyline (precision 5); `None` when absent or invalid.
fn decode_route(encoded: &str, date: &str) -> Option<LineString<f64>> {
    if encoded.is_empty() {
        return None;
    }
    match polyline::decode_polyline(encoded, 5) {
        Ok(line) if line.0.len() >= 2 => Some(line),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(date, error = %e, "Failed to decode polyline, exporting without route");
            None
        }
    }
}

fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| row.get(i))
        .map(|c| c.trim())
        .unwrap_or("")
}

/// Split a `lat,lng` cell.
fn lat_lng(value: &str) -> (Option<f64>, Option<f64>) {
    let Some((lat, lng)) = value.split_once(',') else {
        return (None, None);
    };
    match (lat.trim().parse(), lng.trim().parse()) {
        (Ok(lat), Ok(lng)) => (Some(lat), Some(lng)),
        _ => (None, None),
    }
}

fn number_or_null(value: &str) -> JsonValue {
    value
        .parse::<f64>()
        .ok()
        .map_or(JsonValue::Null, JsonValue::from)
}

fn optional(value: Option<f64>) -> JsonValue {
    value.map_or(JsonValue::Null, JsonValue::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_parsing() {
        assert_eq!(lat_lng("59.33,18.06"), (Some(59.33), Some(18.06)));
        assert_eq!(lat_lng(""), (None, None));
        assert_eq!(lat_lng("north,east"), (None, None));
    }

    #[test]
    fn test_decode_route_requires_two_points() {
        // Google's reference polyline: three points
        let line = decode_route("_p~iF~ps|U_ulLnnqC_mqNvxq`@", "2024-01-01").unwrap();
        assert_eq!(line.0.len(), 3);
        // Coordinates are (lon, lat)
        assert!((line.0[0].x - -120.2).abs() < 1e-9);
        assert!((line.0[0].y - 38.5).abs() < 1e-9);

        assert!(decode_route("", "2024-01-01").is_none());
    }
}
