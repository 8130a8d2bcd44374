/// TMDB genre ids for movies and TV. Anything outside this table is dropped.
const GENRES: &[(i64, &str)] = &[
    (12, "Adventure"),
    (14, "Fantasy"),
    (16, "Animation"),
    (18, "Drama"),
    (27, "Horror"),
    (28, "Action"),
    (35, "Comedy"),
    (36, "History"),
    (37, "Western"),
    (53, "Thriller"),
    (80, "Crime"),
    (99, "Documentary"),
    (878, "Science Fiction"),
    (9648, "Mystery"),
    (10402, "Music"),
    (10749, "Romance"),
    (10751, "Family"),
    (10752, "War"),
    (10759, "Action & Adventure"),
    (10762, "Kids"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
    (10770, "TV Movie"),
];

pub fn genre_name(id: i64) -> Option<&'static str> {
    GENRES
        .binary_search_by_key(&id, |(gid, _)| *gid)
        .ok()
        .map(|idx| GENRES[idx].1)
}

pub fn genre_names(ids: &[i64]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for name in ids.iter().filter_map(|id| genre_name(*id)) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.join(", ")
}

/// Split stored genre strings into a sorted, de-duplicated list of names.
pub fn distinct_genres<S: AsRef<str>>(stored: &[S]) -> Vec<String> {
    let mut names: Vec<String> = stored
        .iter()
        .flat_map(|g| g.as_ref().split(','))
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .map(|g| g.to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(GENRES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn unknown_ids_are_dropped() {
        assert_eq!(genre_names(&[28, 424242, 878]), "Action, Science Fiction");
        assert_eq!(genre_names(&[]), "");
        assert_eq!(genre_names(&[1]), "");
    }

    #[test]
    fn distinct_genres_splits_and_sorts() {
        let stored = vec!["Drama, Crime", "Crime", "Action & Adventure"];
        assert_eq!(
            distinct_genres(&stored),
            vec!["Action & Adventure", "Crime", "Drama"]
        );
    }
}
