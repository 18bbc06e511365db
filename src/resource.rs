//! Resource query and the records parsed from the downstream collection.

// crates.io
use serde::de::{self, Deserializer};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::ResourceId};

/// Identifier the caller wants fetched, captured once at pipeline entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceQuery {
	/// Identifier forwarded verbatim to the resource endpoint.
	pub resource_id: ResourceId,
}
impl ResourceQuery {
	/// Creates a query for the provided identifier.
	pub fn new(resource_id: ResourceId) -> Self {
		Self { resource_id }
	}
}

/// Read-only projection of one entity in the downstream collection.
///
/// Well-known product fields are lifted into typed members; everything else, including the
/// OData `__metadata` block, stays available through [`ResourceRecord::extra`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
	/// Entity identifier.
	#[serde(rename = "ProductID", alias = "Id", default)]
	pub id: Option<String>,
	/// Display name.
	#[serde(rename = "Name", default)]
	pub name: Option<String>,
	/// Long description.
	#[serde(rename = "Description", default)]
	pub description: Option<String>,
	/// Category label.
	#[serde(rename = "Category", default)]
	pub category: Option<String>,
	/// Price as sent by the service; OData verbose encodes decimals as strings.
	#[serde(rename = "Price", default, deserialize_with = "string_or_number")]
	pub price: Option<String>,
	/// ISO currency code for [`ResourceRecord::price`].
	#[serde(rename = "CurrencyCode", default)]
	pub currency_code: Option<String>,
	/// Image reference.
	#[serde(rename = "ProductPicUrl", alias = "ImageUrl", default)]
	pub image_url: Option<String>,
	/// Supplier display name.
	#[serde(rename = "SupplierName", default)]
	pub supplier_name: Option<String>,
	/// Remaining entity fields.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct Envelope {
	d: EnvelopeBody,
}

#[derive(Deserialize)]
struct EnvelopeBody {
	results: Vec<ResourceRecord>,
}

/// Parses the `{ "d": { "results": [...] } }` envelope.
///
/// A missing `results` array is an error; an empty one yields zero records.
pub fn parse_envelope(
	body: &[u8],
) -> Result<Vec<ResourceRecord>, serde_path_to_error::Error<serde_json::Error>> {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let envelope: Envelope = serde_path_to_error::deserialize(de)?;

	Ok(envelope.d.results)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(text)) => Ok(Some(text)),
		Some(Value::Number(number)) => Ok(Some(number.to_string())),
		Some(other) => Err(de::Error::custom(format!("expected a price, found {}", kind(&other)))),
	}
}

fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
