//! Domain records returned by the service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::magnitude::wire_to_canonical;
use crate::options::VoteMagnitude;

/// Remote identifier of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

/// Remote identifier of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named comparison group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub unlisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Tag {
    /// Web link to the tag's page.
    pub fn link(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.id,
            self.slug.as_deref().unwrap_or_default()
        )
    }
}

/// An element ranked within one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "title", alias = "name")]
    pub name: String,
    #[serde(default, alias = "body")]
    pub description: Option<String>,
    /// Owning tag. Filled in from the request context when the service
    /// omits it.
    #[serde(default)]
    pub tag_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Web link to this item within its tag's page.
    pub fn link(&self, base_url: &str, tag: &Tag) -> String {
        format!("{}?item={}", tag.link(base_url), self.id)
    }

    pub(crate) fn scoped_to(mut self, tag_id: i64) -> Self {
        self.tag_id.get_or_insert(tag_id);
        self
    }
}

/// A secondary comparison dimension, shared across tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A recorded pairwise judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(default)]
    pub id: Option<i64>,
    pub left_item_id: ItemId,
    pub right_item_id: ItemId,
    /// Canonical signed magnitude.
    #[serde(deserialize_with = "canonical_from_wire")]
    pub magnitude: i32,
    /// `None` means the default dimension.
    #[serde(default, deserialize_with = "attribute_ref")]
    pub attribute: Option<AttributeId>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Vote {
    /// Magnitude expressed on `scale`.
    pub fn magnitude_on(&self, scale: VoteMagnitude) -> i32 {
        scale.present(self.magnitude)
    }
}

fn canonical_from_wire<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    // The service may report fractional magnitudes.
    let wire = f64::deserialize(deserializer)?;
    let (min, max) = VoteMagnitude::Positive.range();
    if !wire.is_finite() || wire < f64::from(min) || wire > f64::from(max) {
        return Err(D::Error::custom(format!(
            "vote magnitude {wire} is outside the wire scale ({min}..={max})"
        )));
    }
    Ok(wire_to_canonical(wire.round() as i32))
}

fn attribute_ref<'de, D>(deserializer: D) -> Result<Option<AttributeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != 0).map(AttributeId))
}

/// Tags visible to the session's namespace, grouped by visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagListing {
    #[serde(default)]
    pub public: Vec<Tag>,
    #[serde(default)]
    pub private: Vec<Tag>,
    #[serde(default)]
    pub unlisted: Vec<Tag>,
}

impl TagListing {
    pub(crate) fn retain_namespace(mut self, ns: &str) -> Self {
        for group in [&mut self.public, &mut self.private, &mut self.unlisted] {
            group.retain(|t| t.ns.as_deref() == Some(ns));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.public.len() + self.private.len() + self.unlisted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_reads_title_and_body_aliases() {
        let item: Item = serde_json::from_value(json!({
            "id": 4,
            "title": "B",
            "body": "second letter",
            "created_at": "2024-03-27T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(item.id, ItemId(4));
        assert_eq!(item.name, "B");
        assert_eq!(item.description.as_deref(), Some("second letter"));
        assert_eq!(item.scoped_to(9).tag_id, Some(9));
    }

    #[test]
    fn vote_converts_wire_magnitude_and_default_attribute() {
        let vote: Vote = serde_json::from_value(json!({
            "id": 1,
            "left_item_id": 1,
            "right_item_id": 2,
            "magnitude": 75,
            "attribute": 0,
            "created_at": "2024-03-27T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(vote.magnitude, 25);
        assert_eq!(vote.attribute, None);
        assert_eq!(vote.magnitude_on(VoteMagnitude::Positive), 75);
        assert_eq!(vote.magnitude_on(VoteMagnitude::Equal), 25);
    }

    #[test]
    fn vote_rejects_magnitude_off_the_wire_scale() {
        for magnitude in [json!(-1e12), json!(1e12), json!(101), json!(-0.6)] {
            let result = serde_json::from_value::<Vote>(json!({
                "left_item_id": 1,
                "right_item_id": 2,
                "magnitude": magnitude
            }));
            assert!(result.is_err(), "{magnitude} accepted");
        }

        let vote: Vote = serde_json::from_value(json!({
            "left_item_id": 1,
            "right_item_id": 2,
            "magnitude": 99.6
        }))
        .unwrap();
        assert_eq!(vote.magnitude, 50);
    }

    #[test]
    fn links_include_ids_and_slug() {
        let tag: Tag = serde_json::from_value(json!({
            "id": 1, "title": "test_tag", "slug": "test-tag"
        }))
        .unwrap();
        assert_eq!(tag.link("https://sorter.social/"), "https://sorter.social/1/test-tag");

        let item: Item = serde_json::from_value(json!({"id": 3, "title": "x"})).unwrap();
        assert_eq!(
            item.link("https://sorter.social", &tag),
            "https://sorter.social/1/test-tag?item=3"
        );
    }

    #[test]
    fn listing_filters_by_namespace() {
        let listing: TagListing = serde_json::from_value(json!({
            "public": [
                {"id": 1, "title": "a", "ns": "abcd1234"},
                {"id": 2, "title": "b", "ns": "other"}
            ],
            "unlisted": [{"id": 3, "title": "c", "ns": "abcd1234"}]
        }))
        .unwrap();
        let mine = listing.retain_namespace("abcd1234");
        assert_eq!(mine.len(), 2);
        assert_eq!(mine.public[0].id, 1);
        assert!(mine.private.is_empty());
    }
}
