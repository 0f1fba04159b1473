use crate::domain::news::FeedItem;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Envelope returned by the KOSCOM per-stock news endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KoscomEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<KoscomMessage>,
    #[serde(default)]
    pub results: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KoscomMessage {
    #[serde(default)]
    pub desc: Option<String>,
}

impl KoscomEnvelope {
    pub fn error_description(&self) -> String {
        self.message
            .as_ref()
            .and_then(|m| m.desc.clone())
            .unwrap_or_else(|| "success flag missing or false".to_string())
    }

    /// Converts `results`, dropping rows that are not objects or lack `DATE`, `CODE` or `TITLE`.
    pub fn into_feed_items(self) -> Vec<FeedItem> {
        let rows = self.results.unwrap_or_default();
        let total = rows.len();
        let items: Vec<FeedItem> = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(obj) => feed_item_from_row(&obj),
                _ => None,
            })
            .collect();

        if items.len() < total {
            tracing::warn!(
                dropped = total - items.len(),
                total,
                "dropped malformed KOSCOM news rows"
            );
        }
        items
    }
}

fn feed_item_from_row(row: &Map<String, Value>) -> Option<FeedItem> {
    let date = text_field(row, "DATE")?;
    let code = text_field(row, "CODE")?;
    let title = text_field(row, "TITLE")?;

    Some(FeedItem {
        date,
        code,
        time: text_field(row, "TIME").unwrap_or_else(|| "000000".to_string()),
        title,
        category: text_field(row, "BIGCD").unwrap_or_else(|| "1".to_string()),
        importance: text_field(row, "IMPCD").unwrap_or_default(),
    })
}

// KOSCOM mixes string and numeric encodings for the same field.
fn text_field(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_rows_missing_required_fields_and_defaults_optional_ones() {
        let envelope: KoscomEnvelope = serde_json::from_value(json!({
            "success": true,
            "results": [
                {"DATE": "20261012", "CODE": "N1001", "TITLE": "반도체 수출 호조"},
                {"DATE": "20261012", "TITLE": "no code"},
                "garbage",
                {"DATE": 20261013, "CODE": "N1002", "TIME": "093000", "TITLE": "실적 발표", "BIGCD": "2", "IMPCD": "A"}
            ]
        }))
        .unwrap();

        let items = envelope.into_feed_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].time, "000000");
        assert_eq!(items[0].category, "1");
        assert_eq!(items[1].date, "20261013");
        assert_eq!(items[1].category, "2");
        assert_eq!(items[1].importance, "A");
    }

    #[test]
    fn error_description_prefers_message_desc() {
        let envelope: KoscomEnvelope = serde_json::from_value(json!({
            "success": false,
            "message": {"desc": "invalid auth_key"}
        }))
        .unwrap();
        assert_eq!(envelope.error_description(), "invalid auth_key");
    }
}
