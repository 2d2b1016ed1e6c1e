use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Which slice of the provider catalog a request targets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    #[default]
    All,
}

impl MediaType {
    pub fn as_path(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::All => "all",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            "all" => Ok(MediaType::All),
            _ => Err(anyhow::anyhow!("media type must be 'movie', 'tv' or 'all'")),
        }
    }
}

/// Movie or show record as the provider returns it in paged listings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawMovie {
    pub id: i64,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    pub backdrop_path: Option<String>,
    pub original_title: Option<String>,
    pub original_name: Option<String>,
}

/// Reduced catalog entry shown in grids and sliders.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MovieSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub genres: Vec<String>,
}

/// Entry of a user's persisted list. Stored verbatim from the summary that was liked.
pub type LikedMovie = MovieSummary;

/// Search hit passed through close to the provider's shape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResult {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub genres: Vec<String>,
    pub runtime: Option<u32>,
    pub adult: bool,
    pub popularity: Option<f64>,
    pub homepage: Option<String>,
    pub cast: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_parses_case_insensitively() {
        assert_eq!("TV".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert_eq!("all".parse::<MediaType>().unwrap(), MediaType::All);
        assert!("anime".parse::<MediaType>().is_err());
    }

    #[test]
    fn search_result_keeps_only_present_fields() {
        let hit: SearchResult = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "Heat",
            "poster_path": "/p.jpg",
            "vote_count": 10
        }))
        .expect("search hit");
        let out = serde_json::to_value(&hit).unwrap();
        assert_eq!(
            out,
            serde_json::json!({ "id": 7, "title": "Heat", "poster_path": "/p.jpg" })
        );
    }
}
