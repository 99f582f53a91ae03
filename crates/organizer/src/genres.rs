use std::collections::HashMap;
use std::sync::OnceLock;

use common::ParentGenre;

use common::ParentGenre::*;

pub const PARENT_GENRES: [ParentGenre; ParentGenre::COUNT] = ParentGenre::ALL;

/// Tie-break order for `score`: earlier entries win. More specific genres
/// come before broad ones.
pub const GENRE_PRIORITY: [ParentGenre; ParentGenre::COUNT] = [
    Classical, Jazz, Blues, Reggae, Folk, Country, Metal, Punk, Funk, Soul, RnB, Latin, World,
    Rock, Electronic, HipHop, Pop, Indie, Other,
];

// Substring matches scan this table top to bottom, so order matters.
const MICRO_GENRES: &[(&str, ParentGenre)] = &[
    ("rock", Rock),
    ("indie rock", Rock),
    ("alternative rock", Rock),
    ("garage rock", Rock),
    ("classic rock", Rock),
    ("hard rock", Rock),
    ("soft rock", Rock),
    ("progressive rock", Rock),
    ("psychedelic rock", Rock),
    ("art rock", Rock),
    ("glam rock", Rock),
    ("grunge", Rock),
    ("post-rock", Rock),
    ("shoegaze", Rock),
    ("britpop", Rock),
    ("pop", Pop),
    ("indie pop", Pop),
    ("synth-pop", Pop),
    ("electropop", Pop),
    ("dance pop", Pop),
    ("art pop", Pop),
    ("dream pop", Pop),
    ("chamber pop", Pop),
    ("power pop", Pop),
    ("teen pop", Pop),
    ("k-pop", Pop),
    ("j-pop", Pop),
    ("hip hop", HipHop),
    ("rap", HipHop),
    ("trap", HipHop),
    ("conscious hip hop", HipHop),
    ("gangsta rap", HipHop),
    ("underground hip hop", HipHop),
    ("boom bap", HipHop),
    ("drill", HipHop),
    ("crunk", HipHop),
    ("grime", HipHop),
    ("electronic", Electronic),
    ("edm", Electronic),
    ("house", Electronic),
    ("techno", Electronic),
    ("trance", Electronic),
    ("dubstep", Electronic),
    ("drum and bass", Electronic),
    ("ambient", Electronic),
    ("idm", Electronic),
    ("downtempo", Electronic),
    ("trip hop", Electronic),
    ("chillwave", Electronic),
    ("synthwave", Electronic),
    ("deep house", Electronic),
    ("tech house", Electronic),
    ("progressive house", Electronic),
    ("r&b", RnB),
    ("rnb", RnB),
    ("contemporary r&b", RnB),
    ("neo soul", RnB),
    ("new jack swing", RnB),
    ("quiet storm", RnB),
    ("jazz", Jazz),
    ("jazz fusion", Jazz),
    ("smooth jazz", Jazz),
    ("bebop", Jazz),
    ("cool jazz", Jazz),
    ("free jazz", Jazz),
    ("acid jazz", Jazz),
    ("nu jazz", Jazz),
    ("swing", Jazz),
    ("big band", Jazz),
    ("classical", Classical),
    ("baroque", Classical),
    ("romantic", Classical),
    ("contemporary classical", Classical),
    ("opera", Classical),
    ("orchestral", Classical),
    ("chamber music", Classical),
    ("symphony", Classical),
    ("country", Country),
    ("country rock", Country),
    ("alt-country", Country),
    ("bluegrass", Country),
    ("americana", Country),
    ("outlaw country", Country),
    ("country pop", Country),
    ("metal", Metal),
    ("heavy metal", Metal),
    ("thrash metal", Metal),
    ("death metal", Metal),
    ("black metal", Metal),
    ("doom metal", Metal),
    ("power metal", Metal),
    ("progressive metal", Metal),
    ("nu metal", Metal),
    ("metalcore", Metal),
    ("folk", Folk),
    ("indie folk", Folk),
    ("folk rock", Folk),
    ("freak folk", Folk),
    ("contemporary folk", Folk),
    ("traditional folk", Folk),
    ("latin", Latin),
    ("reggaeton", Latin),
    ("salsa", Latin),
    ("bachata", Latin),
    ("cumbia", Latin),
    ("bossa nova", Latin),
    ("latin pop", Latin),
    ("latin rock", Latin),
    ("blues", Blues),
    ("electric blues", Blues),
    ("delta blues", Blues),
    ("chicago blues", Blues),
    ("blues rock", Blues),
    ("reggae", Reggae),
    ("dub", Reggae),
    ("ska", Reggae),
    ("dancehall", Reggae),
    ("roots reggae", Reggae),
    ("punk", Punk),
    ("punk rock", Punk),
    ("pop punk", Punk),
    ("post-punk", Punk),
    ("hardcore punk", Punk),
    ("emo", Punk),
    ("skate punk", Punk),
    ("indie", Indie),
    ("lo-fi", Indie),
    ("bedroom pop", Indie),
    ("soul", Soul),
    ("motown", Soul),
    ("northern soul", Soul),
    ("southern soul", Soul),
    ("funk", Funk),
    ("p-funk", Funk),
    ("funk rock", Funk),
    ("disco", Funk),
    ("world", World),
    ("afrobeat", World),
    ("afropop", World),
    ("celtic", World),
    ("flamenco", World),
    ("indian", World),
    ("middle eastern", World),
];

pub fn micro_genres() -> &'static [(&'static str, ParentGenre)] {
    MICRO_GENRES
}

fn exact_index() -> &'static HashMap<&'static str, ParentGenre> {
    static INDEX: OnceLock<HashMap<&'static str, ParentGenre>> = OnceLock::new();
    INDEX.get_or_init(|| MICRO_GENRES.iter().copied().collect())
}

/// Maps one free-form micro-genre to its parent bucket.
pub fn consolidate(micro_genre: &str) -> ParentGenre {
    let normalized = micro_genre.trim().to_lowercase();
    if normalized.is_empty() {
        return Other;
    }
    if let Some(parent) = exact_index().get(normalized.as_str()) {
        return *parent;
    }
    MICRO_GENRES
        .iter()
        .find(|(micro, _)| normalized.contains(micro) || micro.contains(normalized.as_str()))
        .map(|(_, parent)| *parent)
        .unwrap_or(Other)
}

/// Distinct parents of `micro_genres`, in first-seen order.
pub fn consolidate_all<S: AsRef<str>>(micro_genres: &[S]) -> Vec<ParentGenre> {
    let mut out: Vec<ParentGenre> = Vec::new();
    for micro in micro_genres {
        let parent = consolidate(micro.as_ref());
        if !out.contains(&parent) {
            out.push(parent);
        }
    }
    out
}

/// Picks the best-fit parent genre for a tag set.
///
/// Each tag casts one vote for its consolidated parent. The highest tally
/// wins; ties go to whichever candidate comes first in [`GENRE_PRIORITY`].
pub fn score<S: AsRef<str>>(micro_genres: &[S]) -> ParentGenre {
    if micro_genres.is_empty() {
        return Other;
    }

    let mut votes = [0usize; ParentGenre::COUNT];
    for micro in micro_genres {
        votes[consolidate(micro.as_ref()).index()] += 1;
    }
    let max_votes = votes.iter().copied().max().unwrap_or(0);

    let mut candidates = PARENT_GENRES
        .iter()
        .copied()
        .filter(|genre| votes[genre.index()] == max_votes);
    let first = match candidates.next() {
        Some(genre) => genre,
        None => return Other,
    };
    if candidates.next().is_none() {
        return first;
    }

    GENRE_PRIORITY
        .iter()
        .copied()
        .find(|genre| votes[genre.index()] == max_votes)
        .unwrap_or(Other)
}

/// Same as [`score`], but an empty tag set short-circuits to Other.
pub fn classify_track(track: &common::Track) -> ParentGenre {
    if track.genres.is_empty() {
        Other
    } else {
        score(track.genres.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidates_known_micro_genres() {
        let cases = [
            ("indie rock", Rock),
            ("alternative rock", Rock),
            ("classic rock", Rock),
            ("edm", Electronic),
            ("house", Electronic),
            ("hip hop", HipHop),
            ("rap", HipHop),
            ("jazz fusion", Jazz),
            ("  Bossa Nova ", Latin),
            ("zzz", Other),
        ];
        for (input, expected) in cases {
            assert_eq!(consolidate(input), expected, "consolidate({input:?})");
        }
    }

    #[test]
    fn substring_matches_follow_table_order() {
        // "swedish indie rock" contains both "rock" and "indie"; "rock" is listed first.
        assert_eq!(consolidate("swedish indie rock"), Rock);
        assert_eq!(consolidate("uk garage rock revival"), Rock);
        assert_eq!(consolidate("nordic folk"), Folk);
        // the tag may also be a substring of a key
        assert_eq!(consolidate("synthw"), Electronic);
    }

    #[test]
    fn blank_tags_are_other() {
        assert_eq!(consolidate(""), Other);
        assert_eq!(consolidate("   "), Other);
    }

    #[test]
    fn consolidate_all_keeps_first_seen_order() {
        let parents = consolidate_all(&["jazz", "rock", "bebop", "edm"]);
        assert_eq!(parents, vec![Jazz, Rock, Electronic]);
    }

    #[test]
    fn score_examples() {
        let empty: [&str; 0] = [];
        assert_eq!(score(&empty), Other);
        assert_eq!(score(&["rock"]), Rock);
        assert_eq!(score(&["hip hop", "dub", "reggae"]), Reggae);
        assert_eq!(score(&["hip hop", "dub"]), Reggae);
    }

    #[test]
    fn score_counts_tags_not_distinct_parents() {
        assert_eq!(score(&["rock", "hard rock", "grunge", "jazz", "bebop"]), Rock);
    }

    #[test]
    fn ties_prefer_the_earliest_priority() {
        assert_eq!(score(&["pop", "indie"]), Pop);
        assert_eq!(score(&["rock", "classical"]), Classical);
        assert_eq!(score(&["zzz", "indie"]), Indie);
    }

    #[test]
    fn score_returns_a_maximal_candidate() {
        let samples: [&[&str]; 5] = [
            &["rock", "pop", "pop", "zzz"],
            &["techno", "house", "jazz", "swing", "opera"],
            &["soul", "funk", "disco", "motown"],
            &["k-pop", "j-pop", "rap", "trap", "drill"],
            &["emo", "ska", "celtic"],
        ];
        for tags in samples {
            let mut votes = [0usize; ParentGenre::COUNT];
            for tag in tags {
                votes[consolidate(tag).index()] += 1;
            }
            let max = votes.iter().copied().max().unwrap();
            let winner = score(tags);
            assert_eq!(votes[winner.index()], max, "{tags:?}");
            let earlier_tied = GENRE_PRIORITY
                .iter()
                .take_while(|genre| **genre != winner)
                .any(|genre| votes[genre.index()] == max);
            assert!(!earlier_tied, "{tags:?}");
        }
    }

    #[test]
    fn priority_is_a_permutation_of_parent_genres() {
        let mut seen = [false; ParentGenre::COUNT];
        for genre in GENRE_PRIORITY {
            assert!(!seen[genre.index()]);
            seen[genre.index()] = true;
        }
        assert!(seen.iter().all(|value| *value));
    }

    #[test]
    fn every_table_key_is_normalized() {
        for (micro, _) in micro_genres() {
            assert_eq!(*micro, micro.trim().to_lowercase());
        }
    }
}
