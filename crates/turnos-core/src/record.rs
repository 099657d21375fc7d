//! Pharmacy-on-duty records before and after normalization.

use serde::{Deserialize, Serialize};

/// One pharmacy-on-duty entry as produced by a single source.
///
/// Accepts the Spanish keys used by the hand-maintained source files
/// (`nombre`, `direccion`, `fecha`, ...) as well as the English field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "direccion")]
    pub address: String,
    #[serde(default, alias = "telefono")]
    pub phone: String,
    #[serde(alias = "localidad")]
    pub locality: String,
    #[serde(default, alias = "fuente")]
    pub source_url: String,
    /// 1 = heuristic extraction, 3 = structured/official source.
    #[serde(default = "default_confidence", alias = "nivel_confianza")]
    pub confidence: u8,
    /// Day of month, possibly not zero-padded.
    #[serde(alias = "fecha")]
    pub day_of_month: String,
    #[serde(default, alias = "mapa")]
    pub map_url: Option<String>,
}

fn default_confidence() -> u8 {
    1
}

/// A resolved (or failed) geographic position.
///
/// Both fields `None` means resolution was attempted and failed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    /// The marker written after a failed lookup.
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

/// A record in canonical, persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedRecord {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(rename = "mapa", default)]
    pub map_url: Option<String>,
    #[serde(rename = "coordenadas", default)]
    pub coordinates: Coordinates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_accepts_english_keys() {
        let json = r#"{
            "name": "Farmacia Centro",
            "address": "Av. Libertador 100",
            "phone": "4700-0000",
            "locality": "San Isidro",
            "source_url": "http://x",
            "confidence": 3,
            "day_of_month": "5"
        }"#;
        let rec: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.name, "Farmacia Centro");
        assert_eq!(rec.confidence, 3);
        assert!(rec.map_url.is_none());
    }

    #[test]
    fn raw_record_accepts_spanish_keys() {
        let json = r#"{
            "nombre": "Farmacia Sur",
            "direccion": "Belgrano 55",
            "telefono": "",
            "localidad": "Quilmes",
            "fuente": "https://example.org",
            "nivel_confianza": 2,
            "fecha": "12",
            "mapa": "https://maps.example/@-34.7,-58.2,17z"
        }"#;
        let rec: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.locality, "Quilmes");
        assert_eq!(rec.day_of_month, "12");
        assert_eq!(rec.confidence, 2);
        assert!(rec.map_url.is_some());
    }

    #[test]
    fn confidence_defaults_to_low_trust() {
        let json = r#"{"nombre":"A","direccion":"B","localidad":"C","fecha":"1"}"#;
        let rec: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.confidence, 1);
        assert_eq!(rec.phone, "");
    }

    #[test]
    fn unresolved_coordinates_serialize_as_nulls() {
        let json = serde_json::to_string(&Coordinates::unresolved()).unwrap();
        assert_eq!(json, r#"{"lat":null,"lng":null}"#);
        assert!(!Coordinates::unresolved().is_resolved());
        assert!(Coordinates::new(-34.5, -58.5).is_resolved());
    }

    #[test]
    fn formatted_record_uses_persisted_field_names() {
        let rec = FormattedRecord {
            name: "Farmacia Centro".into(),
            address: "Av. Libertador 100".into(),
            phone: "47000000".into(),
            map_url: None,
            coordinates: Coordinates::new(-34.47, -58.52),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["nombre"], "Farmacia Centro");
        assert_eq!(value["direccion"], "Av. Libertador 100");
        assert_eq!(value["telefono"], "47000000");
        assert!(value["mapa"].is_null());
        assert_eq!(value["coordenadas"]["lat"], -34.47);
    }
}
