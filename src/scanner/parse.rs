use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};

use crate::config::Library;
use crate::models::media::MediaType;

static SEASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])(?:(?:season|temporada|saison|staffel|stagione)[\s_]*|s)(\d{1,3})(?:[^0-9]|$)",
    )
    .expect("season pattern")
});

static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:episode|episodio|cap[ií]tulo|ep|e)[\s_.-]*(\d{1,4})")
        .expect("episode pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLocation {
    pub series_name: String,
    pub season: i64,
    pub episode: i64,
}

/// Search query for a file: the stem with any `<tag>-` prefix removed.
/// "RARBG-The Matrix.mkv" → "The Matrix", "Interstellar (2014).mp4" → "Interstellar (2014)"
pub fn query_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    let query = match stem.split_once('-') {
        Some((_, rest)) => rest.trim(),
        None => stem.trim(),
    };
    if query.is_empty() {
        stem.trim().to_string()
    } else {
        query.to_string()
    }
}

/// Split a trailing "(YYYY)" off a title: "Inception (2010)" → ("Inception", Some(2010))
pub fn split_title_year(name: &str) -> (String, Option<i64>) {
    if let Some(idx) = name.rfind('(') {
        let year_part = name[idx + 1..].trim_end_matches(')').trim();
        if year_part.len() == 4 {
            if let Ok(year) = year_part.parse::<i64>() {
                let title = name[..idx].trim().to_string();
                if !title.is_empty() {
                    return (title, Some(year));
                }
            }
        }
    }
    (name.to_string(), None)
}

/// Path segments below the media root, or every normal segment when the path
/// lives elsewhere.
fn library_segments(path: &Path, library: &Library) -> Vec<String> {
    let relative = path.strip_prefix(&library.media_root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

/// Directory segments only; the final segment is the file itself.
fn dir_segment_position(segments: &[String], name: &str) -> Option<usize> {
    let dirs = segments.len().saturating_sub(1);
    segments[..dirs]
        .iter()
        .position(|s| s.eq_ignore_ascii_case(name))
}

pub fn classify(path: &Path, library: &Library) -> Option<MediaType> {
    let segments = library_segments(path, library);
    let series = dir_segment_position(&segments, &library.series_dir);
    let movies = dir_segment_position(&segments, &library.movies_dir);
    match (series, movies) {
        (Some(s), Some(m)) if m < s => Some(MediaType::Movie),
        (Some(_), _) => Some(MediaType::Episode),
        (None, Some(_)) => Some(MediaType::Movie),
        (None, None) => None,
    }
}

/// Series name, season and episode for a file under the series root. The series
/// name is the directory right below the series root; `None` when the file sits
/// directly in the series root.
pub fn episode_location(path: &Path, library: &Library) -> Option<EpisodeLocation> {
    let segments = library_segments(path, library);
    let root = dir_segment_position(&segments, &library.series_dir)?;
    let name_idx = root + 1;
    if name_idx + 1 >= segments.len() {
        return None;
    }
    let series_name = segments[name_idx].trim().to_string();
    if series_name.is_empty() {
        return None;
    }

    let below_series = segments[name_idx + 1..].join("/");
    let file_stem = Path::new(&segments[segments.len() - 1])
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    Some(EpisodeLocation {
        series_name,
        season: season_number(&below_series).unwrap_or(1),
        episode: episode_number(&file_stem).unwrap_or(1),
    })
}

pub fn season_number(text: &str) -> Option<i64> {
    SEASON_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn episode_number(text: &str) -> Option<i64> {
    EPISODE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn library() -> Library {
        Library::new(
            PathBuf::from("/media"),
            "Movies",
            "Series",
            &[".mp4".to_string()],
        )
    }

    #[test]
    fn query_strips_extension() {
        assert_eq!(query_from_filename("Interstellar (2014).mp4"), "Interstellar (2014)");
    }

    #[test]
    fn query_drops_tag_prefix() {
        assert_eq!(query_from_filename("YTS - The Matrix.mkv"), "The Matrix");
        assert_eq!(query_from_filename("grp-Alien.mp4"), "Alien");
    }

    #[test]
    fn query_keeps_stem_when_nothing_follows_hyphen() {
        assert_eq!(query_from_filename("Alien-.mp4"), "Alien-");
    }

    #[test]
    fn split_title_year_with_year() {
        assert_eq!(
            split_title_year("Inception (2010)"),
            ("Inception".to_string(), Some(2010))
        );
    }

    #[test]
    fn split_title_year_without_year() {
        assert_eq!(split_title_year("SomeMovie"), ("SomeMovie".to_string(), None));
    }

    #[test]
    fn split_title_year_with_non_year_parens() {
        assert_eq!(
            split_title_year("Movie (Extended Cut)"),
            ("Movie (Extended Cut)".to_string(), None)
        );
    }

    #[test]
    fn classify_by_root_segment() {
        let lib = library();
        assert_eq!(
            classify(Path::new("/media/Movies/Alien.mp4"), &lib),
            Some(MediaType::Movie)
        );
        assert_eq!(
            classify(Path::new("/media/Series/Lost/Season 1/E01.mp4"), &lib),
            Some(MediaType::Episode)
        );
        assert_eq!(classify(Path::new("/media/Other/Alien.mp4"), &lib), None);
    }

    #[test]
    fn classify_ignores_file_named_like_a_root() {
        let lib = library();
        assert_eq!(classify(Path::new("/media/Other/Series"), &lib), None);
    }

    #[test]
    fn classify_outside_media_root_uses_segments() {
        let lib = library();
        assert_eq!(
            classify(Path::new("/mnt/nas/Series/Lost/E02.mp4"), &lib),
            Some(MediaType::Episode)
        );
    }

    #[test]
    fn episode_location_from_season_dir() {
        let lib = library();
        let loc = episode_location(Path::new("/media/Series/Breaking Bad/Season 1/E01.mp4"), &lib)
            .unwrap();
        assert_eq!(
            loc,
            EpisodeLocation {
                series_name: "Breaking Bad".to_string(),
                season: 1,
                episode: 1,
            }
        );
    }

    #[test]
    fn episode_location_from_sxxexx_filename() {
        let lib = library();
        let loc =
            episode_location(Path::new("/media/Series/The Office/The.Office.S02E03.mkv"), &lib)
                .unwrap();
        assert_eq!(loc.series_name, "The Office");
        assert_eq!(loc.season, 2);
        assert_eq!(loc.episode, 3);
    }

    #[test]
    fn episode_location_localized_season() {
        let lib = library();
        let loc = episode_location(
            Path::new("/media/Series/La Casa de Papel/Temporada_3/Episodio 5.mp4"),
            &lib,
        )
        .unwrap();
        assert_eq!(loc.season, 3);
        assert_eq!(loc.episode, 5);
    }

    #[test]
    fn episode_location_defaults_to_one() {
        let lib = library();
        let loc = episode_location(Path::new("/media/Series/Lost/pilot.mp4"), &lib).unwrap();
        assert_eq!(loc.season, 1);
        assert_eq!(loc.episode, 1);
    }

    #[test]
    fn episode_location_requires_series_directory() {
        let lib = library();
        assert!(episode_location(Path::new("/media/Series/E01.mp4"), &lib).is_none());
    }

    #[test]
    fn season_marker_needs_a_word_boundary() {
        assert_eq!(season_number("Season 10/x.mp4"), Some(10));
        assert_eq!(season_number("Specials/x.mp4"), None);
        assert_eq!(season_number("Series 5"), None);
    }

    #[test]
    fn episode_marker_variants() {
        assert_eq!(episode_number("E07"), Some(7));
        assert_eq!(episode_number("Episode 12"), Some(12));
        assert_eq!(episode_number("ep_4"), Some(4));
        assert_eq!(episode_number("Show.S01E09.720p"), Some(9));
        assert_eq!(episode_number("pilot"), None);
    }
}
