//! Maps raw provider records to the reduced `MovieSummary` shape.
use crate::models::{Genre, MovieSummary, RawMovie};

const MAX_GENRES: usize = 3;

/// Records without a backdrop are dropped. Genre ids that do not resolve
/// against `genres` are skipped before the three-name cap is applied.
pub fn normalize(raw: &[RawMovie], genres: &[Genre]) -> Vec<MovieSummary> {
    raw.iter()
        .filter_map(|movie| normalize_one(movie, genres))
        .collect()
}

pub fn normalize_one(movie: &RawMovie, genres: &[Genre]) -> Option<MovieSummary> {
    let image = movie.backdrop_path.as_deref().filter(|p| !p.is_empty())?;
    let names = movie
        .genre_ids
        .iter()
        .filter_map(|id| genres.iter().find(|g| g.id == *id))
        .map(|g| g.name.clone())
        .take(MAX_GENRES)
        .collect();
    let name = movie
        .original_name
        .clone()
        .or_else(|| movie.original_title.clone())
        .unwrap_or_default();

    Some(MovieSummary {
        id: movie.id,
        name,
        image: image.to_string(),
        genres: names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: i64, name: &str) -> Genre {
        Genre {
            id,
            name: name.to_string(),
        }
    }

    fn raw(id: i64, genre_ids: Vec<i64>, backdrop: Option<&str>) -> RawMovie {
        RawMovie {
            id,
            genre_ids,
            backdrop_path: backdrop.map(str::to_string),
            original_title: Some(format!("Title {id}")),
            original_name: None,
        }
    }

    #[test]
    fn maps_single_record_with_resolved_genre() {
        let genres = vec![genre(28, "Action")];
        let record = RawMovie {
            id: 1,
            genre_ids: vec![28],
            backdrop_path: Some("/x.jpg".to_string()),
            original_title: Some("T".to_string()),
            original_name: None,
        };
        let out = normalize(&[record], &genres);
        assert_eq!(
            out,
            vec![MovieSummary {
                id: 1,
                name: "T".to_string(),
                image: "/x.jpg".to_string(),
                genres: vec!["Action".to_string()],
            }]
        );
    }

    #[test]
    fn drops_records_without_backdrop() {
        let out = normalize(
            &[raw(1, vec![], None), raw(2, vec![], Some("")), raw(3, vec![], Some("/b.jpg"))],
            &[],
        );
        assert_eq!(out.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn keeps_provider_genre_order_and_caps_at_three() {
        let genres = vec![
            genre(1, "Drama"),
            genre(2, "Comedy"),
            genre(3, "Horror"),
            genre(4, "Family"),
        ];
        let out = normalize(&[raw(9, vec![4, 99, 2, 1, 3], Some("/b.jpg"))], &genres);
        assert_eq!(out[0].genres, vec!["Family", "Comedy", "Drama"]);
    }

    #[test]
    fn prefers_original_name_for_shows() {
        let mut record = raw(5, vec![], Some("/s.jpg"));
        record.original_name = Some("Show".to_string());
        let out = normalize_one(&record, &[]).expect("kept");
        assert_eq!(out.name, "Show");
    }
}
