//! Post repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::post::{BulkUpdate, Category, Post};
use super::query::PostQuery;
use crate::caption::Vibe;
use crate::error::{Error, Result};

const SELECT_POST: &str = r#"
    SELECT id, user_id, image_url, image_file_id, caption, category, tags,
           vibe_style, is_public, likes, created_at, updated_at
    FROM posts
"#;

/// Repository for post database operations
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new post to the database
    pub async fn save(&self, post: &Post) -> Result<()> {
        let tags = serde_json::to_string(&post.tags)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, user_id, image_url, image_file_id, caption, category, tags,
                vibe_style, is_public, likes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.id.to_string())
        .bind(post.user_id.to_string())
        .bind(&post.image_url)
        .bind(&post.image_file_id)
        .bind(&post.caption)
        .bind(post.category.as_str())
        .bind(&tags)
        .bind(post.vibe_style.map(|v| v.as_str()))
        .bind(post.is_public)
        .bind(post.likes)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(())
    }

    /// Update the editable fields of a post
    pub async fn update(&self, post: &Post) -> Result<()> {
        let tags = serde_json::to_string(&post.tags)?;

        let result = sqlx::query(
            r#"
            UPDATE posts SET
                caption = ?,
                category = ?,
                tags = ?,
                is_public = ?,
                likes = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.caption)
        .bind(post.category.as_str())
        .bind(&tags)
        .bind(post.is_public)
        .bind(post.likes)
        .bind(post.updated_at)
        .bind(post.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(Error::PostNotFound(post.id.to_string()));
        }
        Ok(())
    }

    /// Get a post by ID
    pub async fn get(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_POST))
            .bind(post_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        row.map(PostRow::into_post).transpose()
    }

    /// Get a post only if it's public
    pub async fn get_public(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("{} WHERE id = ? AND is_public = 1", SELECT_POST))
                .bind(post_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::DatabaseError)?;

        row.map(PostRow::into_post).transpose()
    }

    /// Every post of a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC",
            SELECT_POST
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        rows.into_iter().map(PostRow::into_post).collect()
    }

    /// One filtered, sorted page of a user's posts plus the unpaged total
    pub async fn query(&self, user_id: Uuid, query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        push_filters(&mut count, user_id, query);
        let (total,): (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        let mut select = QueryBuilder::<Sqlite>::new(SELECT_POST);
        push_filters(&mut select, user_id, query);
        select.push(format!(
            " ORDER BY {} {}, id {} LIMIT ",
            query.sort_by.column(),
            query.order.keyword(),
            query.order.keyword()
        ));
        select.push_bind(query.limit as i64);
        select.push(" OFFSET ");
        select.push_bind(query.offset() as i64);

        let rows: Vec<PostRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        let posts = rows
            .into_iter()
            .map(PostRow::into_post)
            .collect::<Result<Vec<_>>>()?;

        Ok((posts, total.max(0) as u64))
    }

    /// Apply one edit to the listed posts that belong to the user; returns rows changed
    pub async fn bulk_update(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
        updates: &BulkUpdate,
    ) -> Result<u64> {
        if post_ids.is_empty() || updates.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE posts SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(category) = updates.category {
            qb.push(", category = ");
            qb.push_bind(category.as_str());
        }
        if let Some(tags) = &updates.tags {
            qb.push(", tags = ");
            qb.push_bind(serde_json::to_string(tags)?);
        }
        if let Some(is_public) = updates.is_public {
            qb.push(", is_public = ");
            qb.push_bind(is_public);
        }
        qb.push(" WHERE user_id = ");
        qb.push_bind(user_id.to_string());
        qb.push(" AND id IN (");
        let mut ids = qb.separated(", ");
        for id in post_ids {
            ids.push_bind(id.to_string());
        }
        ids.push_unseparated(")");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        Ok(result.rows_affected())
    }

    /// Delete a post by ID
    pub async fn delete(&self, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every post of a user; returns rows deleted
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;
        Ok(result.rows_affected())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, user_id: Uuid, query: &PostQuery) {
    qb.push(" WHERE user_id = ");
    qb.push_bind(user_id.to_string());

    if let Some(search) = &query.search {
        // LIKE folds ASCII case only; other scripts match as written
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (caption LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(
            " ESCAPE '\\' OR EXISTS (SELECT 1 FROM json_each(posts.tags) \
             WHERE json_each.value LIKE ",
        );
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\'))");
    }

    if let Some(category) = query.category {
        qb.push(" AND category = ");
        qb.push_bind(category.as_str());
    }

    if !query.tags.is_empty() {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(posts.tags) WHERE json_each.value IN (");
        let mut tags = qb.separated(", ");
        for tag in &query.tags {
            tags.push_bind(tag.clone());
        }
        tags.push_unseparated("))");
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Database row for a post
#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    user_id: String,
    image_url: String,
    image_file_id: String,
    caption: String,
    category: String,
    tags: String,
    vibe_style: Option<String>,
    is_public: bool,
    likes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self) -> Result<Post> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid post ID: {}", e)))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| Error::Parse(format!("Invalid user ID: {}", e)))?;
        let category = Category::parse(&self.category)
            .ok_or_else(|| Error::Parse(format!("Invalid category: {}", self.category)))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| Error::Parse(format!("Invalid tags JSON: {}", e)))?;

        Ok(Post {
            id,
            user_id,
            image_url: self.image_url,
            image_file_id: self.image_file_id,
            caption: self.caption,
            category,
            tags,
            vibe_style: self.vibe_style.as_deref().and_then(Vibe::parse),
            is_public: self.is_public,
            likes: self.likes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::query::{SortField, SortOrder};
    use crate::domain::user::{User, UserRepository};
    use crate::storage::Database;
    use chrono::Duration;

    async fn setup() -> (Database, PostRepository, Uuid) {
        let db = Database::in_memory().await.expect("Failed to create database");
        let user = User::new("alice");
        UserRepository::new(db.pool().clone())
            .save(&user)
            .await
            .unwrap();
        let repo = PostRepository::new(db.pool().clone());
        (db, repo, user.id)
    }

    fn post(user_id: Uuid, caption: &str, minutes_ago: i64) -> Post {
        let mut post = Post::new(user_id, "https://cdn/x.jpg", "file", caption);
        post.created_at = Utc::now() - Duration::minutes(minutes_ago);
        post.updated_at = post.created_at;
        post
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let (_db, repo, user_id) = setup().await;

        let mut p = post(user_id, "Sunset #sunset #sky #gold", 0);
        p.tags = vec!["travel".to_string()];
        p.vibe_style = Some(Vibe::Dramatic);
        repo.save(&p).await.unwrap();

        let loaded = repo.get(p.id).await.unwrap().unwrap();
        assert_eq!(loaded.caption, p.caption);
        assert_eq!(loaded.tags, vec!["travel"]);
        assert_eq!(loaded.vibe_style, Some(Vibe::Dramatic));
        assert!(!loaded.is_public);
    }

    #[tokio::test]
    async fn test_get_public_only() {
        let (_db, repo, user_id) = setup().await;

        let private = post(user_id, "private", 0);
        let mut public = post(user_id, "public", 0);
        public.is_public = true;
        repo.save(&private).await.unwrap();
        repo.save(&public).await.unwrap();

        assert!(repo.get_public(private.id).await.unwrap().is_none());
        assert!(repo.get_public(public.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_query_filters_and_sorting() {
        let (_db, repo, user_id) = setup().await;

        let mut beach = post(user_id, "Beach day #sea #sand #sun", 30);
        beach.tags = vec!["travel".to_string(), "summer".to_string()];
        beach.category = Category::Social;
        let mut office = post(user_id, "Quarterly review #work #team #goals", 20);
        office.category = Category::Business;
        office.tags = vec!["work".to_string()];
        let mut coffee = post(user_id, "Coffee first #coffee #morning #ritual", 10);
        coffee.tags = vec!["Summer_Vibes".to_string()];

        for p in [&beach, &office, &coffee] {
            repo.save(p).await.unwrap();
        }

        let (posts, total) = repo.query(user_id, &PostQuery::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(posts[0].id, coffee.id);
        assert_eq!(posts[2].id, beach.id);

        let asc = PostQuery {
            order: SortOrder::Asc,
            ..Default::default()
        };
        let (posts, _) = repo.query(user_id, &asc).await.unwrap();
        assert_eq!(posts[0].id, beach.id);

        let by_caption = PostQuery {
            sort_by: SortField::Caption,
            order: SortOrder::Asc,
            ..Default::default()
        };
        let (posts, _) = repo.query(user_id, &by_caption).await.unwrap();
        assert_eq!(posts[0].id, beach.id);
        assert_eq!(posts[1].id, coffee.id);

        let business = PostQuery {
            category: Some(Category::Business),
            ..Default::default()
        };
        let (posts, total) = repo.query(user_id, &business).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].id, office.id);

        // search hits captions and tags, case-insensitively
        let search = PostQuery {
            search: Some("SUMMER".to_string()),
            ..Default::default()
        };
        let (_, total) = repo.query(user_id, &search).await.unwrap();
        assert_eq!(total, 2);

        let tagged = PostQuery {
            tags: vec!["work".to_string(), "travel".to_string()],
            ..Default::default()
        };
        let (_, total) = repo.query(user_id, &tagged).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_query_search_escapes_wildcards() {
        let (_db, repo, user_id) = setup().await;
        repo.save(&post(user_id, "100% fun #a #b #c", 0))
            .await
            .unwrap();
        repo.save(&post(user_id, "plain #a #b #c", 0)).await.unwrap();

        let q = PostQuery {
            search: Some("%".to_string()),
            ..Default::default()
        };
        let (_, total) = repo.query(user_id, &q).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_query_search_non_ascii() {
        let (_db, repo, user_id) = setup().await;
        let mut moscow = post(user_id, "Ночная Москва сияет #ночь #город #огни", 0);
        moscow.tags = vec!["Путешествия".to_string()];
        repo.save(&moscow).await.unwrap();
        repo.save(&post(user_id, "Café au lait #coffee #paris #morning", 0))
            .await
            .unwrap();

        for term in ["Москва", "Путешествия", "Café"] {
            let q = PostQuery {
                search: Some(term.to_string()),
                ..Default::default()
            };
            let (_, total) = repo.query(user_id, &q).await.unwrap();
            assert_eq!(total, 1, "search {}", term);
        }
    }

    #[tokio::test]
    async fn test_query_search_ignores_tag_json_syntax() {
        let (_db, repo, user_id) = setup().await;
        let mut tagged = post(user_id, "Beach day #sea #sand #sun", 0);
        tagged.tags = vec!["travel".to_string(), "summer".to_string()];
        repo.save(&tagged).await.unwrap();

        for term in ["\"", "[", ","] {
            let q = PostQuery {
                search: Some(term.to_string()),
                ..Default::default()
            };
            let (_, total) = repo.query(user_id, &q).await.unwrap();
            assert_eq!(total, 0, "search {}", term);
        }
    }

    #[tokio::test]
    async fn test_query_page_past_end() {
        let (_db, repo, user_id) = setup().await;
        repo.save(&post(user_id, "only #a #b #c", 0)).await.unwrap();

        let q = PostQuery {
            page: u32::MAX,
            ..Default::default()
        }
        .normalized();
        let (posts, total) = repo.query(user_id, &q).await.unwrap();
        assert_eq!(total, 1);
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let (_db, repo, user_id) = setup().await;
        for i in 0..5 {
            repo.save(&post(user_id, &format!("post {}", i), i))
                .await
                .unwrap();
        }

        let q = PostQuery {
            page: 2,
            limit: 2,
            ..Default::default()
        };
        let (posts, total) = repo.query(user_id, &q).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].caption, "post 2");
        assert_eq!(posts[1].caption, "post 3");
    }

    #[tokio::test]
    async fn test_query_scoped_to_user() {
        let (db, repo, user_id) = setup().await;
        let other = User::new("bob");
        UserRepository::new(db.pool().clone())
            .save(&other)
            .await
            .unwrap();

        repo.save(&post(user_id, "mine", 0)).await.unwrap();
        repo.save(&post(other.id, "theirs", 0)).await.unwrap();

        let (posts, total) = repo.query(user_id, &PostQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].caption, "mine");
    }

    #[tokio::test]
    async fn test_bulk_update_only_touches_owned_posts() {
        let (db, repo, user_id) = setup().await;
        let other = User::new("bob");
        UserRepository::new(db.pool().clone())
            .save(&other)
            .await
            .unwrap();

        let mine = post(user_id, "mine", 0);
        let theirs = post(other.id, "theirs", 0);
        repo.save(&mine).await.unwrap();
        repo.save(&theirs).await.unwrap();

        let updates = BulkUpdate {
            category: Some(Category::Marketing),
            tags: Some(vec!["promo".to_string()]),
            is_public: Some(true),
        };
        let changed = repo
            .bulk_update(user_id, &[mine.id, theirs.id], &updates)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let mine = repo.get(mine.id).await.unwrap().unwrap();
        assert_eq!(mine.category, Category::Marketing);
        assert_eq!(mine.tags, vec!["promo"]);
        assert!(mine.is_public);

        let theirs = repo.get(theirs.id).await.unwrap().unwrap();
        assert_eq!(theirs.category, Category::Personal);

        let none = repo
            .bulk_update(user_id, &[mine.id], &BulkUpdate::default())
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let (_db, repo, user_id) = setup().await;
        let a = post(user_id, "a", 0);
        repo.save(&a).await.unwrap();
        repo.save(&post(user_id, "b", 0)).await.unwrap();
        repo.save(&post(user_id, "c", 0)).await.unwrap();

        assert!(repo.delete(a.id).await.unwrap());
        assert!(!repo.delete(a.id).await.unwrap());
        assert_eq!(repo.delete_all_for_user(user_id).await.unwrap(), 2);
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
