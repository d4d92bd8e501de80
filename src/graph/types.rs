use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Graph timestamps look like `2014-05-01T12:34:56+0000`.
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// One photo or video entry from a `/me/photos*` or `/me/videos*` edge.
///
/// Every field is optional: the Graph API omits what it does not have, and
/// an entry without `source` is simply not downloadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssetRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub from: Option<ProfileRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl AssetRecord {
    pub fn album_name(&self) -> Option<&str> {
        self.album.as_ref().and_then(|a| a.name.as_deref())
    }

    /// Parsed `created_time`, if present and well-formed.
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.created_time.as_deref()?;
        DateTime::parse_from_str(raw, GRAPH_TIME_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
    }
}

/// Subset of `/me` used to label the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_full_record_deserializes() {
        let rec: AssetRecord = serde_json::from_value(json!({
            "id": "101",
            "source": "https://scontent.example/v/t1/p720x720/a.jpg?oh=abc",
            "album": {"id": "9", "name": "Trip"},
            "created_time": "2014-05-01T12:34:56+0000",
            "updated_time": "2014-05-02T00:00:00+0000",
            "name": "Beach",
            "from": {"id": "42", "name": "Jo"}
        }))
        .unwrap();
        assert_eq!(rec.album_name(), Some("Trip"));
        assert_eq!(rec.from.unwrap().name.as_deref(), Some("Jo"));
    }

    #[test]
    fn test_record_without_source_deserializes() {
        let rec: AssetRecord = serde_json::from_value(json!({"id": "7"})).unwrap();
        assert!(rec.source.is_none());
        assert!(rec.album_name().is_none());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let rec: AssetRecord =
            serde_json::from_value(json!({"source": "http://x/a.jpg", "images": []})).unwrap();
        assert_eq!(rec.source.as_deref(), Some("http://x/a.jpg"));
    }

    #[test]
    fn test_created_parses_graph_format() {
        let rec = AssetRecord {
            created_time: Some("2014-05-01T12:34:56+0000".into()),
            ..Default::default()
        };
        let expected = Utc.with_ymd_and_hms(2014, 5, 1, 12, 34, 56).unwrap();
        assert_eq!(rec.created().unwrap(), expected);
    }

    #[test]
    fn test_created_accepts_rfc3339() {
        let rec = AssetRecord {
            created_time: Some("2014-05-01T12:34:56+02:00".into()),
            ..Default::default()
        };
        assert_eq!(rec.created().unwrap().timestamp(), 1398940496);
    }

    #[test]
    fn test_created_garbage_is_none() {
        let rec = AssetRecord {
            created_time: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(rec.created().is_none());
    }
}
