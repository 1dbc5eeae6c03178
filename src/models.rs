use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::entities::{director, genre, movie};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieView {
    pub id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub trailer: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub genre_id: Option<i32>,
    pub director_id: Option<i32>,
}

impl From<movie::Model> for MovieView {
    fn from(m: movie::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            trailer: m.trailer,
            year: m.year,
            rating: m.rating,
            genre_id: m.genre_id,
            director_id: m.director_id,
        }
    }
}

/// Director and genre rows share the same `{id, name}` shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamedView {
    pub id: i32,
    pub name: Option<String>,
}

impl From<director::Model> for NamedView {
    fn from(m: director::Model) -> Self {
        Self { id: m.id, name: m.name }
    }
}

impl From<genre::Model> for NamedView {
    fn from(m: genre::Model) -> Self {
        Self { id: m.id, name: m.name }
    }
}

/// Inbound movie body. Every field is optional; an absent field is stored as null.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MoviePayload {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trailer: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_finite")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub genre_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub director_id: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NamedPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    pub director_id: Option<String>,
    pub genre_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MovieFilter {
    All,
    Director(i32),
    Genre(i32),
}

impl ListQuery {
    /// Resolves the query into a single filter.
    ///
    /// `genre_id` replaces `director_id` when both are given; the two are never
    /// intersected. Returns `None` when the chosen value is not an integer, in
    /// which case no row can match.
    pub fn filter(&self) -> Option<MovieFilter> {
        let director = self.director_id.as_deref().filter(|s| !s.is_empty());
        let genre = self.genre_id.as_deref().filter(|s| !s.is_empty());

        let mut filter = Some(MovieFilter::All);
        if let Some(raw) = director {
            filter = raw.parse().ok().map(MovieFilter::Director);
        }
        if let Some(raw) = genre {
            filter = raw.parse().ok().map(MovieFilter::Genre);
        }
        filter
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Value(T),
    Text(String),
}

/// Accepts a JSON number or a numeric string. Blank strings and `null` read as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Loose<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Value(v)) => Ok(Some(v)),
        Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Loose::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

/// Like [`lenient`], but rejects values that SQLite cannot store as a real
/// (`inf`, `NaN`, `1e400`).
fn lenient_finite<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match lenient::<D, f64>(deserializer)? {
        Some(v) if !v.is_finite() => Err(de::Error::custom(format!("{v} is not a finite number"))),
        other => Ok(other),
    }
}
