//! Username collation for the card layout.
//!
//! Root-locale Unicode collation at tertiary strength: accents sort with
//! their base letter, case only breaks ties (lowercase first), and
//! punctuation is non-ignorable and ordered before digits and letters.

use icu_collator::{Collator, CollatorOptions, Strength};
use std::cmp::Ordering;
use tracing::warn;

thread_local! {
    static ROOT_COLLATOR: Option<Collator> = root_collator();
}

fn root_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Tertiary);
    match Collator::try_new(&Default::default(), options) {
        Ok(collator) => Some(collator),
        Err(e) => {
            warn!(error = %e, "root collator unavailable, falling back to code point order");
            None
        }
    }
}

/// Orders two usernames the way the card column lists them.
///
/// Strings the collator considers equal fall back to code point order so the
/// result is total.
pub fn compare_usernames(a: &str, b: &str) -> Ordering {
    ROOT_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}
