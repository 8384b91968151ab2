//! Flight Record
//!
//! One row of the on-time performance table. Every field is optional; an
//! empty CSV cell and a JSON `null` both mean "not reported".

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// How a field's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `YYYY-MM-DD` calendar date, stored as text
    Date,
    /// Non-negative integer
    Int,
    /// Free text
    Str,
    /// Finite floating-point number
    Float,
}

/// Borrowed view of one present field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
}

/// Value types a flight field can hold
pub trait FieldValue {
    fn cell(&self) -> Cell<'_>;
}

impl FieldValue for String {
    fn cell(&self) -> Cell<'_> {
        Cell::Text(self)
    }
}

impl FieldValue for i64 {
    fn cell(&self) -> Cell<'_> {
        Cell::Int(*self)
    }
}

impl FieldValue for f64 {
    fn cell(&self) -> Cell<'_> {
        Cell::Float(*self)
    }
}

macro_rules! flight_record {
    ($($field:ident: $ty:ty => $name:literal as $kind:ident,)*) => {
        /// One flight, with the column names of the source table
        #[derive(
            Debug, Clone, Default, PartialEq,
            Serialize, Deserialize,
            Archive, RkyvSerialize, RkyvDeserialize,
        )]
        #[archive(check_bytes)]
        pub struct Flight {
            $(
                #[serde(rename = $name)]
                pub $field: Option<$ty>,
            )*
        }

        /// Column names in table order
        pub const FIELD_NAMES: &[&str] = &[$($name),*];

        impl Flight {
            /// Visit every column in table order
            pub fn visit_fields<F>(&self, mut visitor: F)
            where
                F: FnMut(&'static str, FieldKind, Option<Cell<'_>>),
            {
                $(
                    visitor(
                        $name,
                        FieldKind::$kind,
                        self.$field.as_ref().map(FieldValue::cell),
                    );
                )*
            }
        }
    };
}

flight_record! {
    fl_date: String => "FL_DATE" as Date,
    airline_id: i64 => "AIRLINE_ID" as Int,
    carrier: String => "CARRIER" as Str,
    tail_num: String => "TAIL_NUM" as Str,
    fl_num: i64 => "FL_NUM" as Int,
    origin_airport_id: i64 => "ORIGIN_AIRPORT_ID" as Int,
    origin_airport_seq_id: i64 => "ORIGIN_AIRPORT_SEQ_ID" as Int,
    origin_city_market_id: i64 => "ORIGIN_CITY_MARKET_ID" as Int,
    origin: String => "ORIGIN" as Str,
    origin_city_name: String => "ORIGIN_CITY_NAME" as Str,
    origin_state_abr: String => "ORIGIN_STATE_ABR" as Str,
    origin_state_fips: i64 => "ORIGIN_STATE_FIPS" as Int,
    origin_state_nm: String => "ORIGIN_STATE_NM" as Str,
    origin_wac: i64 => "ORIGIN_WAC" as Int,
    dest_airport_id: i64 => "DEST_AIRPORT_ID" as Int,
    dest_airport_seq_id: i64 => "DEST_AIRPORT_SEQ_ID" as Int,
    dest_city_market_id: i64 => "DEST_CITY_MARKET_ID" as Int,
    dest: String => "DEST" as Str,
    dest_city_name: String => "DEST_CITY_NAME" as Str,
    dest_state_abr: String => "DEST_STATE_ABR" as Str,
    dest_state_fips: i64 => "DEST_STATE_FIPS" as Int,
    dest_state_nm: String => "DEST_STATE_NM" as Str,
    dest_wac: i64 => "DEST_WAC" as Int,
    dep_delay: f64 => "DEP_DELAY" as Float,
    taxi_out: f64 => "TAXI_OUT" as Float,
    wheels_off: f64 => "WHEELS_OFF" as Float,
    wheels_on: f64 => "WHEELS_ON" as Float,
    taxi_in: f64 => "TAXI_IN" as Float,
    arr_delay: f64 => "ARR_DELAY" as Float,
    air_time: f64 => "AIR_TIME" as Float,
    distance: f64 => "DISTANCE" as Float,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_31_columns() {
        assert_eq!(FIELD_NAMES.len(), 31);
        assert_eq!(FIELD_NAMES[0], "FL_DATE");
        assert_eq!(FIELD_NAMES[30], "DISTANCE");
    }

    #[test]
    fn test_visit_fields_reports_kinds() {
        let flight = Flight {
            fl_num: Some(1234),
            dep_delay: Some(-3.5),
            origin_city_name: Some("Boston, MA".to_string()),
            ..Flight::default()
        };
        let mut seen = Vec::new();
        flight.visit_fields(|name, kind, cell| {
            if let Some(cell) = cell {
                seen.push((name, kind, format!("{:?}", cell)));
            }
        });
        assert_eq!(
            seen,
            vec![
                ("FL_NUM", FieldKind::Int, "Int(1234)".to_string()),
                ("ORIGIN_CITY_NAME", FieldKind::Str, "Text(\"Boston, MA\")".to_string()),
                ("DEP_DELAY", FieldKind::Float, "Float(-3.5)".to_string()),
            ]
        );
    }

    #[test]
    fn test_visit_fields_in_table_order() {
        let flight = Flight {
            carrier: Some("AA".to_string()),
            distance: Some(187.0),
            ..Flight::default()
        };
        let mut names = Vec::new();
        let mut present = Vec::new();
        flight.visit_fields(|name, _, cell| {
            names.push(name);
            if let Some(cell) = cell {
                present.push((name, format!("{:?}", cell)));
            }
        });
        assert_eq!(names, FIELD_NAMES);
        assert_eq!(present.len(), 2);
        assert_eq!(present[0].0, "CARRIER");
    }

    #[test]
    fn test_json_uses_column_names() {
        let flight = Flight {
            fl_date: Some("2017-01-05".to_string()),
            ..Flight::default()
        };
        let json = serde_json::to_value(&flight).unwrap();
        assert_eq!(json["FL_DATE"], "2017-01-05");
        assert!(json["ARR_DELAY"].is_null());
    }
}
