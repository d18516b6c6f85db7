use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Verification documents for one order, as served by the lookup endpoint.
/// Paths are opaque; turning them into display URLs is the render surface's job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "orderID", default, deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub cnic: Option<String>,
    #[serde(rename = "fullName", default, deserialize_with = "lenient_opt_string")]
    pub full_name: Option<String>,
    #[serde(rename = "cnicUrl", default, deserialize_with = "lenient_opt_string")]
    pub cnic_front_path: Option<String>,
    #[serde(rename = "cnicBackUrl", default, deserialize_with = "lenient_opt_string")]
    pub cnic_back_path: Option<String>,
    #[serde(rename = "customerImage", default, deserialize_with = "lenient_opt_string")]
    pub customer_image_path: Option<String>,
    #[serde(rename = "signature", default, deserialize_with = "lenient_opt_string")]
    pub signature_path: Option<String>,
    #[serde(rename = "utilityBill", default, deserialize_with = "lenient_opt_string")]
    pub utility_bill_path: Option<String>,
}

// ids and CNICs show up as numbers on some records
fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_opt_string(deserializer).map(Option::unwrap_or_default)
}
