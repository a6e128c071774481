//! Point-in-time rankings snapshot for one tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SorterError;
use crate::resources::{Attribute, Item, Vote};

/// Minimal tag reference embedded in a rankings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

/// Wire shape of the rankings page.
#[derive(Debug, Deserialize)]
pub(crate) struct RankingsPage {
    pub tag: TagRef,
    #[serde(default)]
    pub sorted: Vec<Item>,
    #[serde(default)]
    pub unsorted: Vec<Item>,
    #[serde(default)]
    pub skipped: Vec<Item>,
    #[serde(default)]
    pub pair: Option<Vec<Item>>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub selected_attribute: Option<Attribute>,
    #[serde(default)]
    pub users_who_voted: Vec<Value>,
}

/// Rankings of a tag as of one request.
///
/// Snapshots are never refreshed in place; request a new one to see votes
/// cast since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rankings {
    tag: TagRef,
    sorted: Vec<Item>,
    unsorted: Vec<Item>,
    skipped: Vec<Item>,
    pair: Option<(Item, Item)>,
    votes: Vec<Vote>,
    attributes: Vec<Attribute>,
    selected_attribute: Option<Attribute>,
    voters: Vec<String>,
}

impl From<RankingsPage> for Rankings {
    fn from(page: RankingsPage) -> Self {
        let tag_id = page.tag.id;
        let scope = |items: Vec<Item>| -> Vec<Item> {
            items.into_iter().map(|i| i.scoped_to(tag_id)).collect()
        };

        let pair = page.pair.and_then(|items| {
            let mut it = items.into_iter().map(|i| i.scoped_to(tag_id));
            match (it.next(), it.next()) {
                (Some(left), Some(right)) => Some((left, right)),
                _ => None,
            }
        });

        Self {
            tag: page.tag,
            sorted: scope(page.sorted),
            unsorted: scope(page.unsorted),
            skipped: scope(page.skipped),
            pair,
            votes: page.votes,
            attributes: page.attributes,
            selected_attribute: page.selected_attribute,
            voters: page.users_who_voted.iter().filter_map(voter_name).collect(),
        }
    }
}

impl Rankings {
    pub fn tag(&self) -> &TagRef {
        &self.tag
    }

    /// Items with a settled position, best first.
    pub fn sorted(&self) -> &[Item] {
        &self.sorted
    }

    /// Items without enough votes to place.
    pub fn unsorted(&self) -> &[Item] {
        &self.unsorted
    }

    pub fn skipped(&self) -> &[Item] {
        &self.skipped
    }

    /// Number of distinct items in the snapshot.
    pub fn item_count(&self) -> usize {
        self.sorted.len() + self.unsorted.len() + self.skipped.len()
    }

    /// The pair the service recommends voting on next.
    pub fn pair(&self) -> Result<(&Item, &Item), SorterError> {
        if let Some((left, right)) = &self.pair {
            return Ok((left, right));
        }
        let count = self.item_count();
        let name = self.tag.title.as_deref().unwrap_or("<untitled>");
        if count < 2 {
            Err(SorterError::not_found(format!(
                "tag {name:?} has {count} item(s); at least two are needed to form a voting pair"
            )))
        } else {
            Err(SorterError::not_found(format!(
                "no voting pair available for tag {name:?}"
            )))
        }
    }

    /// Vote history, oldest first as reported.
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The attribute the snapshot is scoped to; `None` for the default dimension.
    pub fn selected_attribute(&self) -> Option<&Attribute> {
        self.selected_attribute.as_ref()
    }

    pub fn voters(&self) -> &[String] {
        &self.voters
    }
}

fn voter_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["username", "name", "id"]
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> Rankings {
        serde_json::from_value::<RankingsPage>(value).unwrap().into()
    }

    #[test]
    fn projects_every_section() {
        let r = page(json!({
            "tag": {"id": 1, "title": "test_tag"},
            "sorted": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}],
            "unsorted": [{"id": 3, "title": "C"}],
            "skipped": [{"id": 4, "title": "D"}],
            "pair": [{"id": 1, "title": "A"}, {"id": 3, "title": "C"}],
            "votes": [{"left_item_id": 1, "right_item_id": 2, "magnitude": 50}],
            "attributes": [{"id": 5, "title": "quality"}],
            "selected_attribute": {"id": 5, "title": "quality"},
            "perms": {},
            "users_who_voted": ["alice", {"username": "bob"}, 17]
        }));

        assert_eq!(r.tag().id, 1);
        let names: Vec<_> = r.sorted().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(r.unsorted()[0].tag_id, Some(1));
        assert_eq!(r.skipped().len(), 1);
        let (l, rt) = r.pair().unwrap();
        assert_eq!((l.name.as_str(), rt.name.as_str()), ("A", "C"));
        assert_eq!(r.votes()[0].magnitude, 0);
        assert_eq!(r.attributes().len(), 1);
        assert_eq!(r.selected_attribute().unwrap().title, "quality");
        assert_eq!(r.voters(), ["alice", "bob", "17"]);
    }

    #[test]
    fn pair_with_one_item_is_not_found() {
        let r = page(json!({
            "tag": {"id": 1, "title": "lonely"},
            "unsorted": [{"id": 3, "title": "C"}],
            "pair": null
        }));
        let err = r.pair().unwrap_err();
        assert!(matches!(err, SorterError::NotFound { .. }));
        assert!(err.to_string().contains("at least two"));
    }

    #[test]
    fn short_pair_is_treated_as_missing() {
        let r = page(json!({
            "tag": {"id": 1},
            "sorted": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}],
            "pair": [{"id": 1, "title": "A"}]
        }));
        let err = r.pair().unwrap_err();
        assert!(err.to_string().contains("no voting pair"));
    }
}
