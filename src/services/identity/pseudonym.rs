use rand::Rng;

// Adjective-noun-number template. With 40x40 word pairs and 90 numbers the
// pool is 144k handles; the unique-retry loop absorbs the birthday
// collisions long before that matters.
const ADJECTIVES: &[&str] = &[
    "Amber", "Bold", "Brave", "Breezy", "Bright", "Calm", "Cheery", "Clever",
    "Cosmic", "Crisp", "Daring", "Dapper", "Eager", "Fierce", "Gentle", "Glad",
    "Golden", "Happy", "Humble", "Jolly", "Keen", "Kind", "Lively", "Lucky",
    "Mellow", "Merry", "Nimble", "Noble", "Peppy", "Plucky", "Quiet", "Rapid",
    "Silver", "Snappy", "Sunny", "Swift", "Tidy", "Vivid", "Witty", "Zesty",
];

const NOUNS: &[&str] = &[
    "Badger", "Beacon", "Breeze", "Comet", "Coral", "Cricket", "Dolphin", "Ember",
    "Falcon", "Fern", "Finch", "Firefly", "Fox", "Glacier", "Harbor", "Hawk",
    "Heron", "Koala", "Lantern", "Lynx", "Maple", "Meadow", "Nebula", "Orca",
    "Otter", "Panda", "Pebble", "Penguin", "Pine", "Puffin", "Raven", "River",
    "Robin", "Sparrow", "Spruce", "Summit", "Thistle", "Tiger", "Willow", "Wren",
];

/// A fresh pseudonym candidate, e.g. `MellowFalcon42`. Uniqueness is the
/// store's job; this only needs to spread candidates across the pool.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number: u32 = rng.random_range(10..100);
    format!("{adjective}{noun}{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_adjective_noun_number_template() {
        for _ in 0..50 {
            let handle = generate();
            let digits: String = handle.chars().filter(char::is_ascii_digit).collect();
            let number: u32 = digits.parse().expect("handle should end in a number");
            assert!((10..100).contains(&number), "unexpected number in {handle}");

            let word = &handle[..handle.len() - digits.len()];
            assert!(
                ADJECTIVES.iter().any(|adj| word.starts_with(adj)),
                "no known adjective in {handle}"
            );
            assert!(
                NOUNS.iter().any(|noun| word.ends_with(noun)),
                "no known noun in {handle}"
            );
        }
    }

    #[test]
    fn draws_are_spread_across_the_pool() {
        let distinct: std::collections::HashSet<String> =
            (0..200).map(|_| generate()).collect();
        // 200 draws from a 144k pool should essentially never collapse to a
        // handful of values.
        assert!(distinct.len() > 100, "only {} distinct handles", distinct.len());
    }
}
