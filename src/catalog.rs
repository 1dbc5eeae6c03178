use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait, sea_query::Expr,
};
use tracing::debug;

use crate::{
    entities::{director, genre, movie},
    error::{AppError, AppResult},
    models::{MovieFilter, MoviePayload, NamedPayload},
};

/// Handle to the movie catalog. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn close(self) -> AppResult<()> {
        self.db.close().await?;
        Ok(())
    }

    pub async fn list_movies(&self, filter: MovieFilter) -> AppResult<Vec<movie::Model>> {
        let query = match filter {
            MovieFilter::All => movie::Entity::find(),
            MovieFilter::Director(id) => {
                movie::Entity::find().filter(movie::Column::DirectorId.eq(id))
            },
            MovieFilter::Genre(id) => movie::Entity::find().filter(movie::Column::GenreId.eq(id)),
        };
        Ok(query.order_by_asc(movie::Column::Id).all(&self.db).await?)
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<movie::Model> {
        movie::Entity::find_by_id(id).one(&self.db).await?.ok_or(AppError::NotFound)
    }

    /// Inserts a movie and returns the id it was stored under.
    pub async fn create_movie(&self, payload: MoviePayload) -> AppResult<i32> {
        let model = movie::ActiveModel {
            id: payload.id.map_or(NotSet, Set),
            title: Set(payload.title),
            description: Set(payload.description),
            trailer: Set(payload.trailer),
            year: Set(payload.year),
            rating: Set(payload.rating),
            genre_id: Set(payload.genre_id),
            director_id: Set(payload.director_id),
        };

        let res = movie::Entity::insert(model).exec(&self.db).await?;
        debug!(movie_id = res.last_insert_id, "created movie");
        Ok(res.last_insert_id)
    }

    /// Overwrites every column of movie `id`. Fields absent from `payload` become
    /// null; the id changes only when the payload carries one.
    pub async fn replace_movie(&self, id: i32, payload: MoviePayload) -> AppResult<()> {
        let txn = self.db.begin().await?;

        if movie::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(AppError::NotFound);
        }

        movie::Entity::update_many()
            .col_expr(movie::Column::Id, Expr::value(payload.id.unwrap_or(id)))
            .col_expr(movie::Column::Title, Expr::value(payload.title))
            .col_expr(movie::Column::Description, Expr::value(payload.description))
            .col_expr(movie::Column::Trailer, Expr::value(payload.trailer))
            .col_expr(movie::Column::Year, Expr::value(payload.year))
            .col_expr(movie::Column::Rating, Expr::value(payload.rating))
            .col_expr(movie::Column::GenreId, Expr::value(payload.genre_id))
            .col_expr(movie::Column::DirectorId, Expr::value(payload.director_id))
            .filter(movie::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        debug!(movie_id = id, "replaced movie");
        Ok(())
    }

    pub async fn delete_movie(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let Some(found) = movie::Entity::find_by_id(id).one(&txn).await? else {
            return Err(AppError::NotFound);
        };
        movie::Entity::delete_by_id(found.id).exec(&txn).await?;

        txn.commit().await?;

        debug!(movie_id = id, "deleted movie");
        Ok(())
    }

    pub async fn list_directors(&self) -> AppResult<Vec<director::Model>> {
        Ok(director::Entity::find().order_by_asc(director::Column::Id).all(&self.db).await?)
    }

    pub async fn get_director(&self, id: i32) -> AppResult<director::Model> {
        director::Entity::find_by_id(id).one(&self.db).await?.ok_or(AppError::NotFound)
    }

    pub async fn create_director(&self, payload: NamedPayload) -> AppResult<i32> {
        let model = director::ActiveModel {
            id: payload.id.map_or(NotSet, Set),
            name: Set(payload.name),
        };
        let res = director::Entity::insert(model).exec(&self.db).await?;
        debug!(director_id = res.last_insert_id, "created director");
        Ok(res.last_insert_id)
    }

    pub async fn list_genres(&self) -> AppResult<Vec<genre::Model>> {
        Ok(genre::Entity::find().order_by_asc(genre::Column::Id).all(&self.db).await?)
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<genre::Model> {
        genre::Entity::find_by_id(id).one(&self.db).await?.ok_or(AppError::NotFound)
    }

    pub async fn create_genre(&self, payload: NamedPayload) -> AppResult<i32> {
        let model = genre::ActiveModel {
            id: payload.id.map_or(NotSet, Set),
            name: Set(payload.name),
        };
        let res = genre::Entity::insert(model).exec(&self.db).await?;
        debug!(genre_id = res.last_insert_id, "created genre");
        Ok(res.last_insert_id)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db;

    async fn catalog() -> (TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display());
        let db = db::connect_and_migrate(&url).await.unwrap();
        (dir, Catalog::new(db))
    }

    fn movie(title: &str, director_id: Option<i32>, genre_id: Option<i32>) -> MoviePayload {
        MoviePayload {
            title: Some(title.to_string()),
            director_id,
            genre_id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_movie_reads_back_unchanged() {
        let (_dir, catalog) = catalog().await;
        let payload = MoviePayload {
            id: None,
            title: Some("Solaris".into()),
            description: Some("A psychologist visits a space station.".into()),
            trailer: Some("https://example.com/solaris".into()),
            year: Some(1972),
            rating: Some(8.1),
            genre_id: Some(2),
            director_id: Some(4),
        };

        let id = catalog.create_movie(payload).await.unwrap();
        let stored = catalog.get_movie(id).await.unwrap();

        assert_eq!(stored.title.as_deref(), Some("Solaris"));
        assert_eq!(stored.description.as_deref(), Some("A psychologist visits a space station."));
        assert_eq!(stored.trailer.as_deref(), Some("https://example.com/solaris"));
        assert_eq!(stored.year, Some(1972));
        assert_eq!(stored.rating, Some(8.1));
        assert_eq!(stored.genre_id, Some(2));
        assert_eq!(stored.director_id, Some(4));
    }

    #[tokio::test]
    async fn client_supplied_id_is_kept() {
        let (_dir, catalog) = catalog().await;
        let id = catalog
            .create_movie(MoviePayload { id: Some(42), ..movie("Stalker", None, None) })
            .await
            .unwrap();
        assert_eq!(id, 42);
        assert!(catalog.get_movie(42).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_id_is_a_storage_error() {
        let (_dir, catalog) = catalog().await;
        catalog.create_movie(MoviePayload { id: Some(1), ..movie("A", None, None) }).await.unwrap();
        let err = catalog
            .create_movie(MoviePayload { id: Some(1), ..movie("B", None, None) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn missing_movie_is_not_found() {
        let (_dir, catalog) = catalog().await;
        assert!(matches!(catalog.get_movie(7).await, Err(AppError::NotFound)));
        assert!(matches!(catalog.delete_movie(7).await, Err(AppError::NotFound)));
        assert!(matches!(
            catalog.replace_movie(7, MoviePayload::default()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_applies_single_filter() {
        let (_dir, catalog) = catalog().await;
        catalog.create_movie(movie("Ran", Some(5), Some(1))).await.unwrap();
        catalog.create_movie(movie("Ikiru", Some(5), Some(2))).await.unwrap();
        catalog.create_movie(movie("Tampopo", Some(6), Some(2))).await.unwrap();

        let all = catalog.list_movies(MovieFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_director = catalog.list_movies(MovieFilter::Director(5)).await.unwrap();
        assert_eq!(by_director.len(), 2);
        assert!(by_director.iter().all(|m| m.director_id == Some(5)));

        let by_genre = catalog.list_movies(MovieFilter::Genre(2)).await.unwrap();
        let titles: Vec<_> = by_genre.iter().filter_map(|m| m.title.as_deref()).collect();
        assert_eq!(titles, ["Ikiru", "Tampopo"]);
    }

    #[tokio::test]
    async fn replace_overwrites_every_field() {
        let (_dir, catalog) = catalog().await;
        let old = MoviePayload {
            rating: Some(7.5),
            year: Some(2001),
            ..movie("Old", Some(1), Some(1))
        };
        let id = catalog.create_movie(old).await.unwrap();

        catalog.replace_movie(id, movie("New", None, Some(3))).await.unwrap();

        let stored = catalog.get_movie(id).await.unwrap();
        assert_eq!(stored.title.as_deref(), Some("New"));
        assert_eq!(stored.rating, None);
        assert_eq!(stored.year, None);
        assert_eq!(stored.director_id, None);
        assert_eq!(stored.genre_id, Some(3));
    }

    #[tokio::test]
    async fn replace_can_move_the_id() {
        let (_dir, catalog) = catalog().await;
        let id = catalog.create_movie(movie("Moved", None, None)).await.unwrap();

        catalog
            .replace_movie(id, MoviePayload { id: Some(100), ..movie("Moved", None, None) })
            .await
            .unwrap();

        assert!(matches!(catalog.get_movie(id).await, Err(AppError::NotFound)));
        assert_eq!(catalog.get_movie(100).await.unwrap().title.as_deref(), Some("Moved"));
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let (_dir, catalog) = catalog().await;
        let id = catalog.create_movie(movie("Gone", None, None)).await.unwrap();
        catalog.delete_movie(id).await.unwrap();
        assert!(matches!(catalog.get_movie(id).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn directors_and_genres_round_trip() {
        let (_dir, catalog) = catalog().await;
        let d = catalog
            .create_director(NamedPayload { id: None, name: Some("Agnès Varda".into()) })
            .await
            .unwrap();
        let g = catalog
            .create_genre(NamedPayload { id: Some(9), name: Some("Documentary".into()) })
            .await
            .unwrap();

        assert_eq!(catalog.get_director(d).await.unwrap().name.as_deref(), Some("Agnès Varda"));
        assert_eq!(g, 9);
        assert_eq!(catalog.list_genres().await.unwrap().len(), 1);
        assert_eq!(catalog.list_directors().await.unwrap().len(), 1);
        assert!(matches!(catalog.get_genre(1).await, Err(AppError::NotFound)));
    }
}
