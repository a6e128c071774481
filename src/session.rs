//! The session: owns configuration and transport, routes every call.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::compat::{check_compatibility, Compatibility, COMPATIBLE_API_VERSIONS};
use crate::error::SorterError;
use crate::gateway::{HttpTransport, Method, Transport, TransportError, TransportResponse};
use crate::magnitude::{VoteArg, VoteArgs, VoteRequest};
use crate::options::{Options, OptionsUpdate};
use crate::rankings::{Rankings, RankingsPage};
use crate::resolver::{Attributes, Items, Tags};
use crate::resources::{Attribute, Item, Tag, Vote};

/// Prefix of every service path.
pub const API_PREFIX: &str = "/api";

const NAMESPACE_LEN: usize = 8;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated connection to the Sorter service.
///
/// Configuration belongs to the session; [`Session::update_options`] needs
/// `&mut self`, so no in-flight call can observe a partially applied update.
pub struct Session {
    base_url: String,
    namespace: String,
    options: Options,
    transport: Box<dyn Transport>,
    server_version: Option<String>,
    compatibility: Compatibility,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .field("server_version", &self.server_version)
            .field("compatibility", &self.compatibility)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct VersionBody {
    #[serde(alias = "api_version")]
    version: String,
}

impl Session {
    /// Connect over HTTP.
    pub async fn connect(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        overrides: OptionsUpdate,
    ) -> Result<Self, SorterError> {
        let api_key = api_key.into();
        let base_url = base_url.into();
        let transport = HttpTransport::with_config(&api_key, &base_url, DEFAULT_TIMEOUT)?;
        Self::with_transport(api_key, base_url, transport, overrides).await
    }

    /// Connect using `SORTER_API_KEY` / `SORTER_BASE_URL`.
    pub async fn from_env(overrides: OptionsUpdate) -> Result<Self, SorterError> {
        let transport = HttpTransport::from_env()?;
        let api_key = std::env::var("SORTER_API_KEY")
            .map_err(|_| TransportError::config("SORTER_API_KEY not set"))?;
        let base_url = transport.base_url().to_string();
        Self::with_transport(api_key, base_url, transport, overrides).await
    }

    /// Build a session over any transport and run the compatibility check.
    ///
    /// `base_url` is only used to build web links; requests go wherever the
    /// transport sends them.
    pub async fn with_transport<T>(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        transport: T,
        overrides: OptionsUpdate,
    ) -> Result<Self, SorterError>
    where
        T: Transport + 'static,
    {
        let api_key = api_key.into();
        let mut session = Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespace: api_key.chars().take(NAMESPACE_LEN).collect(),
            options: Options::default().merged(&overrides),
            transport: Box::new(transport),
            server_version: None,
            compatibility: Compatibility::Unknown,
        };
        log_event!(session.options, INFO, base_url = %session.base_url, "sorter session initialized");
        session.negotiate_version().await?;
        Ok(session)
    }

    async fn negotiate_version(&mut self) -> Result<(), SorterError> {
        let path = api_path("version", &[]);
        let version = match self.fetch::<VersionBody>(Method::Get, &path, None, "version").await {
            Ok(body) => Some(body.version),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log_event!(self.options, DEBUG, code = err.code(), "version request failed: {err}");
                None
            }
        };

        self.compatibility = match &version {
            Some(v) => check_compatibility(v, COMPATIBLE_API_VERSIONS),
            None => Compatibility::Unknown,
        };

        if self.options.compatibility_warnings && !self.compatibility.is_compatible() {
            log_event!(
                self.options,
                WARN,
                server_version = version.as_deref().unwrap_or("unknown"),
                compatible = ?COMPATIBLE_API_VERSIONS,
                compatibility = ?self.compatibility,
                "server API version is outside the known-compatible set; continuing"
            );
        }
        self.server_version = version;
        Ok(())
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Merge `update` into the active configuration and return the result.
    pub fn update_options(&mut self, update: &OptionsUpdate) -> &Options {
        self.options = self.options.merged(update);
        log_event!(self.options, DEBUG, options = ?self.options, "options updated");
        &self.options
    }

    /// Like [`Session::update_options`], from a JSON object of option keys.
    pub fn update_options_json(&mut self, value: &Value) -> Result<&Options, SorterError> {
        let update = OptionsUpdate::from_json(value)?;
        Ok(self.update_options(&update))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Account namespace tags are created under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn compatibility(&self) -> Compatibility {
        self.compatibility
    }

    pub fn is_compatible(&self) -> bool {
        self.compatibility.is_compatible()
    }

    // ---------------------------------------------------------------------
    // Resources
    // ---------------------------------------------------------------------

    pub fn tags(&self) -> Tags<'_> {
        Tags::new(self)
    }

    pub fn items<'s>(&'s self, tag: &'s Tag) -> Items<'s> {
        Items::new(self, tag)
    }

    pub fn attributes(&self) -> Attributes<'_> {
        Attributes::new(self)
    }

    /// Get or create a tag by title.
    pub async fn tag(&self, title: &str, description: Option<&str>) -> Result<Tag, SorterError> {
        self.tags().resolve(title, description).await
    }

    /// Get or create an item in `tag` by name.
    pub async fn item(
        &self,
        tag: &Tag,
        name: &str,
        description: Option<&str>,
    ) -> Result<Item, SorterError> {
        self.items(tag).resolve(name, description).await
    }

    /// Get or create an attribute by title.
    pub async fn attribute(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Attribute, SorterError> {
        self.attributes().resolve(title, description).await
    }

    pub async fn get_attribute(&self, title: &str) -> Result<Attribute, SorterError> {
        self.attributes().get(title).await
    }

    pub async fn list_attributes(&self) -> Result<Vec<Attribute>, SorterError> {
        self.attributes().list().await
    }

    pub fn tag_link(&self, tag: &Tag) -> String {
        tag.link(&self.base_url)
    }

    pub fn item_link(&self, tag: &Tag, item: &Item) -> String {
        item.link(&self.base_url, tag)
    }

    // ---------------------------------------------------------------------
    // Voting
    // ---------------------------------------------------------------------

    /// Record a vote. Accepts `(left, right, magnitude)` or the legacy
    /// `(left, magnitude, right)`; the magnitude is read on the configured
    /// scale.
    ///
    /// Submissions are never retried here: a duplicate would count twice.
    pub async fn vote(
        &self,
        tag: &Tag,
        first: impl Into<VoteArg>,
        second: impl Into<VoteArg>,
        third: impl Into<VoteArg>,
        attribute: Option<&Attribute>,
    ) -> Result<Vote, SorterError> {
        let args = VoteArgs::from_positional(first, second, third)?;
        self.submit_vote(tag, args, attribute).await
    }

    pub async fn submit_vote(
        &self,
        tag: &Tag,
        args: VoteArgs,
        attribute: Option<&Attribute>,
    ) -> Result<Vote, SorterError> {
        if args.is_legacy() {
            log_event!(
                self.options,
                DEBUG,
                "vote(left, magnitude, right) ordering is deprecated; use vote(left, right, magnitude)"
            );
        }
        let request = VoteRequest::new(args, self.options.vote_magnitude, attribute)?;
        let payload = serde_json::to_value(request.payload(tag.id))
            .map_err(|e| SorterError::validation(format!("unencodable vote: {e}")))?;

        let path = api_path("vote", &[]);
        let vote: Vote = self.fetch(Method::Post, &path, Some(&payload), "vote").await?;
        log_event!(
            self.options,
            INFO,
            tag = %tag.title,
            left = %request.left,
            right = %request.right,
            magnitude = request.magnitude,
            "vote recorded"
        );
        Ok(vote)
    }

    // ---------------------------------------------------------------------
    // Rankings
    // ---------------------------------------------------------------------

    /// Fetch a fresh rankings snapshot, optionally scoped to an attribute.
    pub async fn rankings(
        &self,
        tag: &Tag,
        attribute: Option<&Attribute>,
    ) -> Result<Rankings, SorterError> {
        let mut query = vec![("id", tag.id.to_string())];
        if let Some(attr) = attribute {
            query.push(("attribute", attr.id.to_string()));
        }
        query.push(("elo", "true".to_string()));
        let path = api_path("tag/page", &query);

        let page: RankingsPage = self.fetch(Method::Get, &path, None, "rankings").await?;
        Ok(page.into())
    }

    pub async fn sorted(&self, tag: &Tag) -> Result<Vec<Item>, SorterError> {
        Ok(self.rankings(tag, None).await?.sorted().to_vec())
    }

    pub async fn unsorted(&self, tag: &Tag) -> Result<Vec<Item>, SorterError> {
        Ok(self.rankings(tag, None).await?.unsorted().to_vec())
    }

    /// Next pair to vote on, as chosen by the service.
    pub async fn pair(&self, tag: &Tag) -> Result<(Item, Item), SorterError> {
        let rankings = self.rankings(tag, None).await?;
        let (left, right) = rankings.pair()?;
        Ok((left.clone(), right.clone()))
    }

    // ---------------------------------------------------------------------
    // Plumbing
    // ---------------------------------------------------------------------

    /// Send a request; non-2xx statuses become classified errors.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, SorterError> {
        if self.options.allows(tracing::Level::DEBUG) {
            let shown = body.map(Value::to_string).unwrap_or_default();
            log_event!(
                self.options,
                DEBUG,
                %method,
                path,
                body = %self.options.loggable_body(&shown),
                "request"
            );
        }

        let resp = match self.transport.send(method, path, body).await {
            Ok(resp) => resp,
            Err(err) => {
                log_event!(self.options, ERROR, %method, path, code = err.code(), "transport failed: {err}");
                return Err(err.into());
            }
        };

        if self.options.allows(tracing::Level::TRACE) {
            let shown = resp.body.to_string();
            log_event!(
                self.options,
                TRACE,
                status = resp.status,
                body = %self.options.loggable_body(&shown),
                "response"
            );
        }

        if resp.is_success() {
            return Ok(resp);
        }

        let err = SorterError::from_response(&resp);
        if err.is_fatal() {
            log_event!(self.options, ERROR, %method, path, status = resp.status, "{err}");
        } else {
            log_event!(self.options, DEBUG, %method, path, status = resp.status, "{err}");
        }
        Err(err)
    }

    /// Send a request and decode the success body.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        what: &str,
    ) -> Result<T, SorterError> {
        let resp = self.request(method, path, body).await?;
        T::deserialize(&resp.body).map_err(|e| SorterError::unexpected_body(&resp, what, e))
    }
}

/// Build `/api/{resource}` with a form-encoded query string.
pub(crate) fn api_path(resource: &str, query: &[(&str, String)]) -> String {
    let mut path = format!("{API_PREFIX}/{resource}");
    if !query.is_empty() {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        path.push('?');
        path.push_str(&encoded);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_path_encodes_query() {
        assert_eq!(api_path("tag", &[]), "/api/tag");
        assert_eq!(
            api_path("tag/exists", &[("title", "a b&c".into()), ("ns", "k".into())]),
            "/api/tag/exists?title=a+b%26c&ns=k"
        );
    }
}
