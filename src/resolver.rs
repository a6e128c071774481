//! Get-or-create resolution for tags, items and attributes.
//!
//! Each resolver offers the same three contracts:
//! - `resolve`: fetch by natural id, creating it when absent. Existing
//!   resources come back untouched; a supplied description is only used on
//!   creation.
//! - `exists`: side-effect-free lookup.
//! - `get` / `get_by_id`: strict fetch, `NotFound` when absent.
//!
//! The service is the authority on uniqueness. Natural ids are passed through
//! as given; the only local check is that they are not blank.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::SorterError;
use crate::gateway::Method;
use crate::resources::{Attribute, AttributeId, Item, ItemId, Tag, TagListing};
use crate::session::{api_path, Session};

#[derive(Deserialize)]
struct ExistsBody {
    exists: bool,
    #[serde(default)]
    id: Option<i64>,
}

#[derive(Deserialize)]
struct ItemsBody {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct AttributesBody {
    #[serde(default)]
    attributes: Vec<Attribute>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeBody {
    Wrapped { attributes: Vec<Attribute> },
    Bare(Attribute),
}

#[derive(Deserialize)]
struct DeletedBody {
    #[serde(default)]
    deleted: bool,
}

/// Reject blank natural identifiers before anything reaches the network.
fn natural_id<'a>(kind: &str, value: &'a str) -> Result<&'a str, SorterError> {
    if value.trim().is_empty() {
        return Err(SorterError::validation(format!(
            "{kind} identifier must not be empty"
        )));
    }
    Ok(value)
}

impl Session {
    /// Remote id for a natural id, or `None`. A 404 from the exists
    /// endpoint means "does not exist".
    async fn lookup_id(
        &self,
        kind: &str,
        query: &[(&str, String)],
    ) -> Result<Option<i64>, SorterError> {
        let path = api_path(&format!("{kind}/exists"), query);
        let resp = match self.request(Method::Get, &path, None).await {
            Ok(resp) => resp,
            Err(SorterError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };

        let body = ExistsBody::deserialize(&resp.body)
            .map_err(|e| SorterError::unexpected_body(&resp, "exists", e))?;
        match (body.exists, body.id) {
            (false, _) => Ok(None),
            (true, Some(id)) => Ok(Some(id)),
            (true, None) => Err(SorterError::unexpected_body(
                &resp,
                "exists",
                "resource exists but no id was returned",
            )),
        }
    }
}

// =============================================================================
// TAGS
// =============================================================================

/// Changes to apply to a tag. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct TagUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub unlisted: Option<bool>,
}

/// Tag resolver, scoped to the session's namespace.
#[derive(Debug, Clone, Copy)]
pub struct Tags<'s> {
    session: &'s Session,
}

impl<'s> Tags<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self { session }
    }

    pub async fn resolve(&self, title: &str, description: Option<&str>) -> Result<Tag, SorterError> {
        let title = natural_id("tag", title)?;
        match self.find(title).await? {
            Some(id) => self.get_by_id(id).await,
            None => self.create(title, description, false).await,
        }
    }

    pub async fn exists(&self, title: &str) -> Result<bool, SorterError> {
        let title = natural_id("tag", title)?;
        Ok(self.find(title).await?.is_some())
    }

    pub async fn get(&self, title: &str) -> Result<Tag, SorterError> {
        let title = natural_id("tag", title)?;
        match self.find(title).await? {
            Some(id) => self.get_by_id(id).await,
            None => Err(SorterError::not_found(format!("tag {title:?}"))),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Tag, SorterError> {
        let path = api_path("tag", &[("id", id.to_string())]);
        self.session.fetch(Method::Get, &path, None, "tag").await
    }

    /// Create without an existence check; the service decides what a
    /// duplicate title means.
    pub async fn create(
        &self,
        title: &str,
        description: Option<&str>,
        unlisted: bool,
    ) -> Result<Tag, SorterError> {
        let title = natural_id("tag", title)?;
        let payload = json!({
            "title": title,
            "description": description.unwrap_or_default(),
            "ns": self.session.namespace(),
            "unlisted": unlisted,
        });
        let path = api_path("tag", &[]);
        let tag: Tag = self
            .session
            .fetch(Method::Post, &path, Some(&payload), "tag")
            .await?;
        log_event!(self.session.options(), INFO, id = tag.id, title = %tag.title, "tag created");
        Ok(tag)
    }

    /// Tags in this session's namespace.
    pub async fn list(&self) -> Result<TagListing, SorterError> {
        let path = api_path("tag", &[]);
        let listing: TagListing = self.session.fetch(Method::Get, &path, None, "tag list").await?;
        Ok(listing.retain_namespace(self.session.namespace()))
    }

    pub async fn update(&self, tag: &Tag, update: TagUpdate) -> Result<Tag, SorterError> {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(tag.id));
        if let Some(title) = &update.title {
            payload.insert("title".into(), json!(natural_id("tag", title)?));
        }
        if let Some(description) = update.description {
            payload.insert("description".into(), json!(description));
        }
        if let Some(unlisted) = update.unlisted {
            payload.insert("unlisted".into(), json!(unlisted));
        }
        let path = api_path("tag", &[]);
        self.session
            .fetch(Method::Post, &path, Some(&Value::Object(payload)), "tag")
            .await
    }

    /// Returns the service's `deleted` flag.
    pub async fn delete(&self, tag: &Tag) -> Result<bool, SorterError> {
        let path = api_path("tag", &[("id", tag.id.to_string())]);
        let body: DeletedBody = self.session.fetch(Method::Delete, &path, None, "delete").await?;
        Ok(body.deleted)
    }

    async fn find(&self, title: &str) -> Result<Option<i64>, SorterError> {
        self.session
            .lookup_id(
                "tag",
                &[
                    ("title", title.to_string()),
                    ("ns", self.session.namespace().to_string()),
                ],
            )
            .await
    }
}

// =============================================================================
// ITEMS
// =============================================================================

/// Changes to apply to an item. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Item resolver for one tag. Item names are unique only within the tag.
#[derive(Debug, Clone, Copy)]
pub struct Items<'s> {
    session: &'s Session,
    tag: &'s Tag,
}

impl<'s> Items<'s> {
    pub(crate) fn new(session: &'s Session, tag: &'s Tag) -> Self {
        Self { session, tag }
    }

    pub fn tag(&self) -> &Tag {
        self.tag
    }

    pub async fn resolve(&self, name: &str, description: Option<&str>) -> Result<Item, SorterError> {
        let name = natural_id("item", name)?;
        match self.find(name).await? {
            Some(id) => self.get_by_id(ItemId(id)).await,
            None => self.create(name, description).await,
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, SorterError> {
        let name = natural_id("item", name)?;
        Ok(self.find(name).await?.is_some())
    }

    pub async fn get(&self, name: &str) -> Result<Item, SorterError> {
        let name = natural_id("item", name)?;
        match self.find(name).await? {
            Some(id) => self.get_by_id(ItemId(id)).await,
            None => Err(SorterError::not_found(format!(
                "item {name:?} in tag {:?}",
                self.tag.title
            ))),
        }
    }

    /// Strict fetch. An item belonging to another tag counts as absent.
    pub async fn get_by_id(&self, id: ItemId) -> Result<Item, SorterError> {
        let path = api_path("item", &[("id", id.to_string())]);
        let item: Item = self.session.fetch(Method::Get, &path, None, "item").await?;
        match item.tag_id {
            Some(owner) if owner != self.tag.id => Err(SorterError::not_found(format!(
                "item {id} in tag {:?}",
                self.tag.title
            ))),
            _ => Ok(item.scoped_to(self.tag.id)),
        }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Item, SorterError> {
        let name = natural_id("item", name)?;
        let payload = json!({
            "title": name,
            "description": description.unwrap_or_default(),
            "tag_id": self.tag.id,
        });
        let path = api_path("item", &[]);
        let item: Item = self
            .session
            .fetch(Method::Post, &path, Some(&payload), "item")
            .await?;
        log_event!(
            self.session.options(),
            INFO,
            id = %item.id,
            name = %item.name,
            tag = %self.tag.title,
            "item created"
        );
        Ok(item.scoped_to(self.tag.id))
    }

    /// Every item in the tag.
    pub async fn list(&self) -> Result<Vec<Item>, SorterError> {
        let path = api_path("feed", &[("tag_id", self.tag.id.to_string())]);
        let body: ItemsBody = self.session.fetch(Method::Get, &path, None, "feed").await?;
        Ok(body
            .items
            .into_iter()
            .map(|i| i.scoped_to(self.tag.id))
            .collect())
    }

    pub async fn update(&self, item: &Item, update: ItemUpdate) -> Result<Item, SorterError> {
        let mut payload = Map::new();
        payload.insert("id".into(), json!(item.id));
        payload.insert("tag_id".into(), json!(self.tag.id));
        if let Some(name) = &update.name {
            payload.insert("title".into(), json!(natural_id("item", name)?));
        }
        if let Some(description) = update.description {
            payload.insert("description".into(), json!(description));
        }
        let path = api_path("item", &[]);
        let item: Item = self
            .session
            .fetch(Method::Post, &path, Some(&Value::Object(payload)), "item")
            .await?;
        Ok(item.scoped_to(self.tag.id))
    }

    async fn find(&self, name: &str) -> Result<Option<i64>, SorterError> {
        self.session
            .lookup_id(
                "item",
                &[
                    ("title", name.to_string()),
                    ("tag_id", self.tag.id.to_string()),
                ],
            )
            .await
    }
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Attribute resolver. Attributes are account-wide, not per tag.
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'s> {
    session: &'s Session,
}

impl<'s> Attributes<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self { session }
    }

    pub async fn resolve(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Attribute, SorterError> {
        let title = natural_id("attribute", title)?;
        match self.find(title).await? {
            Some(id) => self.get_by_id(AttributeId(id)).await,
            None => self.create(title, description).await,
        }
    }

    pub async fn exists(&self, title: &str) -> Result<bool, SorterError> {
        let title = natural_id("attribute", title)?;
        Ok(self.find(title).await?.is_some())
    }

    pub async fn get(&self, title: &str) -> Result<Attribute, SorterError> {
        let title = natural_id("attribute", title)?;
        match self.find(title).await? {
            Some(id) => self.get_by_id(AttributeId(id)).await,
            None => Err(SorterError::not_found(format!("attribute {title:?}"))),
        }
    }

    pub async fn get_by_id(&self, id: AttributeId) -> Result<Attribute, SorterError> {
        let path = api_path("attribute", &[("id", id.to_string())]);
        let body: AttributeBody = self
            .session
            .fetch(Method::Get, &path, None, "attribute")
            .await?;
        let found = match body {
            AttributeBody::Bare(attr) => Some(attr).filter(|a| a.id == id),
            AttributeBody::Wrapped { attributes } => attributes.into_iter().find(|a| a.id == id),
        };
        found.ok_or_else(|| SorterError::not_found(format!("attribute {id}")))
    }

    pub async fn create(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Attribute, SorterError> {
        let title = natural_id("attribute", title)?;
        let payload = json!({
            "title": title,
            "description": description.unwrap_or_default(),
        });
        let path = api_path("attribute", &[]);
        let attr: Attribute = self
            .session
            .fetch(Method::Post, &path, Some(&payload), "attribute")
            .await?;
        log_event!(self.session.options(), INFO, id = %attr.id, title = %attr.title, "attribute created");
        Ok(attr)
    }

    pub async fn list(&self) -> Result<Vec<Attribute>, SorterError> {
        let path = api_path("attribute", &[]);
        let body: AttributesBody = self
            .session
            .fetch(Method::Get, &path, None, "attribute list")
            .await?;
        Ok(body.attributes)
    }

    async fn find(&self, title: &str) -> Result<Option<i64>, SorterError> {
        self.session
            .lookup_id("attribute", &[("title", title.to_string())])
            .await
    }
}
