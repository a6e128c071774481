#![forbid(unsafe_code)]

//! # sorter-client
//!
//! Client for the Sorter pairwise-ranking service.
//!
//! Group things to rank under a tag, add items, vote on pairs ("how much
//! better is left than right?") and read back the rankings the service
//! derives from those votes. Ranking itself happens server-side; this crate
//! resolves resources, normalizes vote magnitudes onto one canonical scale,
//! carries per-session configuration and classifies service failures into a
//! single error type.
//!
//! ```no_run
//! # async fn demo() -> Result<(), sorter_client::SorterError> {
//! use sorter_client::{OptionsUpdate, Session};
//!
//! let session = Session::connect("sk-...", "https://sorter.social", OptionsUpdate::new()).await?;
//! let tag = session.tag("alphabet", None).await?;
//! let a = session.item(&tag, "A", None).await?;
//! let b = session.item(&tag, "B", None).await?;
//! session.vote(&tag, &a, &b, 25, None).await?;
//! let rankings = session.rankings(&tag, None).await?;
//! println!("{} sorted", rankings.sorted().len());
//! # Ok(())
//! # }
//! ```

/// Emit a tracing event if the session's configured verbosity allows it.
macro_rules! log_event {
    ($opts:expr, $level:ident, $($arg:tt)+) => {
        if $opts.allows(::tracing::Level::$level) {
            ::tracing::event!(::tracing::Level::$level, $($arg)+);
        }
    };
}

pub mod compat;
pub mod error;
pub mod gateway;
pub mod magnitude;
pub mod options;
pub mod rankings;
pub mod resolver;
pub mod resources;
pub mod session;

pub use compat::{check_compatibility, Compatibility, COMPATIBLE_API_VERSIONS};
pub use error::SorterError;
pub use gateway::{
    ErrorContext, HttpTransport, Method, Transport, TransportError, TransportResponse,
};
pub use magnitude::{VoteArg, VoteArgs, VoteRequest, CANONICAL_MAX, CANONICAL_MIN};
pub use options::{Options, OptionsUpdate, VoteMagnitude};
pub use rankings::{Rankings, TagRef};
pub use resolver::{Attributes, ItemUpdate, Items, TagUpdate, Tags};
pub use resources::{Attribute, AttributeId, Item, ItemId, Tag, TagListing, Vote};
pub use session::Session;
