//! Run-name allocation.
//!
//! Run names are mnemonic `{adjective}-{noun}-{n}` strings. Allocation
//! lists the existing markers of the chosen word pair and takes the next
//! index, then writes a reservation marker. There is no cross-process
//! coordination: two clients racing on the same pair in the same instant can
//! collide, which the contract explicitly leaves to callers (the word-pair
//! space makes it unlikely in practice).

use rand::seq::SliceRandom;

use drover_commons::{timestamp_millis, RepoAddress, RunName};
use drover_store::{keys, Storage};

use crate::error::Result;

const ADJECTIVES: &[&str] = &[
    "able", "brave", "calm", "dizzy", "eager", "fancy", "gentle", "happy", "icy", "jolly",
    "keen", "lucky", "merry", "noble", "proud", "quick", "rapid", "sharp", "tidy", "vivid",
    "wise", "young", "zesty", "bold", "clever", "daring", "early", "fierce", "grand", "humble",
];

const NOUNS: &[&str] = &[
    "otter", "falcon", "badger", "lynx", "heron", "marmot", "puffin", "stoat", "walrus", "ibis",
    "tapir", "gecko", "dingo", "bison", "crane", "donkey", "ermine", "ferret", "gopher", "hippo",
    "impala", "jackal", "koala", "lemur", "marten", "newt", "ocelot", "panda", "quokka", "raven",
];

/// Allocates a fresh run name and writes its reservation marker.
pub async fn create_run(storage: &Storage, repo: &RepoAddress) -> Result<RunName> {
    let (adjective, noun) = {
        let mut rng = rand::thread_rng();
        (
            *ADJECTIVES.choose(&mut rng).unwrap_or(&ADJECTIVES[0]),
            *NOUNS.choose(&mut rng).unwrap_or(&NOUNS[0]),
        )
    };
    let pair = format!("{adjective}-{noun}-");

    // Next free index within this word pair.
    let prefix = keys::run_markers_prefix(repo, Some(&pair));
    let mut max_index: u64 = 0;
    for key in storage.list_keys(&prefix).await? {
        if let Ok((existing, _)) = keys::parse_run_marker_key(repo, &key) {
            if let Some(index) = existing
                .as_str()
                .strip_prefix(&pair)
                .and_then(|suffix| suffix.parse::<u64>().ok())
            {
                max_index = max_index.max(index);
            }
        }
    }

    let run_name = RunName::new(format!("{pair}{}", max_index + 1));
    storage
        .put_marker(&keys::run_marker_key(repo, &run_name, timestamp_millis()))
        .await?;
    log::debug!("allocated run name '{run_name}' in {repo}");
    Ok(run_name)
}
