//! Sort the alphabet by pairwise votes.
//!
//! Creates (or reuses) an `alphabet` tag, adds the letters A-Z, then keeps
//! voting on whatever pair the service recommends until every letter has a
//! settled position. Earlier letters win; the magnitude grows with the
//! distance between the two letters.
//!
//! To run:
//! - Set `SORTER_API_KEY` (and optionally `SORTER_BASE_URL`)
//! - `cargo run --example alphabet`

use sorter_client::{Item, OptionsUpdate, Session, SorterError, VoteMagnitude};

const MAX_ROUNDS: usize = 200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("sorter_client=info")
        .with_writer(std::io::stderr)
        .init();

    // Votes below are written on the 0..=100 scale.
    let session = Session::from_env(
        OptionsUpdate::new().vote_magnitude(VoteMagnitude::Positive),
    )
    .await?;

    let tag = session
        .tag("alphabet", Some("Letters A-Z, earliest first"))
        .await?;
    println!("tag: {}", session.tag_link(&tag));

    for letter in 'A'..='Z' {
        session.item(&tag, &letter.to_string(), None).await?;
    }

    for round in 1..=MAX_ROUNDS {
        let (left, right) = match session.pair(&tag).await {
            Ok(pair) => pair,
            Err(SorterError::NotFound { .. }) => break,
            Err(err) => return Err(err.into()),
        };
        let magnitude = preference(&left, &right);
        session.vote(&tag, &left, &right, magnitude, None).await?;

        let rankings = session.rankings(&tag, None).await?;
        println!(
            "round {round}: {} vs {} -> {magnitude} ({} sorted, {} unsorted)",
            left.name,
            right.name,
            rankings.sorted().len(),
            rankings.unsorted().len()
        );
        if rankings.unsorted().is_empty() {
            break;
        }
    }

    let sorted = session.sorted(&tag).await?;
    let order: String = sorted.iter().map(|i| i.name.as_str()).collect();
    println!("sorted: {order}");
    Ok(())
}

/// Positive-scale magnitude; 50 means no preference.
fn preference(left: &Item, right: &Item) -> i32 {
    let pos = |item: &Item| item.name.bytes().next().map_or(0, i32::from);
    let distance = pos(right) - pos(left);
    (50 - distance * 2).clamp(0, 100)
}
