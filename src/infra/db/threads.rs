use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, ThreadsRepo},
    domain::{
        board::BoardScope,
        entities::{Post, Thread},
    },
};

use super::{
    PostgresRepositories,
    util::{convert_count, convert_id, counter_from_time, map_sqlx_error},
};

const THREAD_COLUMNS: &str = "t.id, t.board, t.subject, t.reply_time, t.bump_time, \
    (SELECT COUNT(*) FROM posts c WHERE c.op = t.id AND NOT c.deleted) AS post_count, \
    (SELECT COUNT(*) FROM posts c WHERE c.op = t.id AND NOT c.deleted AND c.has_image) AS image_count";

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: i64,
    board: String,
    subject: String,
    reply_time: OffsetDateTime,
    bump_time: OffsetDateTime,
    post_count: i64,
    image_count: i64,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    time: OffsetDateTime,
    name: Option<String>,
    body: String,
}

impl TryFrom<PostRow> for Post {
    type Error = RepoError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: convert_id(row.id, "post id")?,
            time: row.time,
            name: row.name,
            body: row.body,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CatalogRow {
    #[sqlx(flatten)]
    thread: ThreadRow,
    op_time: OffsetDateTime,
    op_name: Option<String>,
    op_body: String,
}

fn assemble_thread(
    row: ThreadRow,
    op: Post,
    posts: Vec<Post>,
    abbrev: bool,
) -> Result<Thread, RepoError> {
    Ok(Thread {
        id: convert_id(row.id, "thread id")?,
        board: row.board,
        subject: row.subject,
        post_count: convert_count(row.post_count, "post count")?,
        image_count: convert_count(row.image_count, "image count")?,
        reply_time: row.reply_time,
        bump_time: row.bump_time,
        abbrev,
        op,
        posts,
    })
}

/// Ids above `i64::MAX` can not be stored, so they can not exist either.
fn db_id(id: u64) -> Result<i64, RepoError> {
    i64::try_from(id).map_err(|_| RepoError::NotFound)
}

fn push_board_filter(qb: &mut QueryBuilder<'_, Postgres>, board: &BoardScope) {
    if let BoardScope::Board(name) = board {
        qb.push(" AND t.board = ");
        qb.push_bind(name.clone());
    }
}

impl PostgresRepositories {
    async fn load_op(&self, id: i64) -> Result<Post, RepoError> {
        // The opening post is kept even when deleted, so the thread still
        // renders while its deletion propagates.
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, time, name, body
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepoError::invalid_data(format!("thread {id} has no opening post")))?;

        Post::try_from(row)
    }

    async fn load_replies(&self, id: i64, last_n: u32) -> Result<Vec<Post>, RepoError> {
        let rows = if last_n == 0 {
            sqlx::query_as::<_, PostRow>(
                r#"
                SELECT id, time, name, body
                FROM posts
                WHERE op = $1 AND id <> $1 AND NOT deleted
                ORDER BY id
                "#,
            )
            .bind(id)
            .fetch_all(self.pool())
            .await
        } else {
            sqlx::query_as::<_, PostRow>(
                r#"
                SELECT id, time, name, body
                FROM (
                    SELECT id, time, name, body
                    FROM posts
                    WHERE op = $1 AND id <> $1 AND NOT deleted
                    ORDER BY id DESC
                    LIMIT $2
                ) recent
                ORDER BY id
                "#,
            )
            .bind(id)
            .bind(i64::from(last_n))
            .fetch_all(self.pool())
            .await
        }
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Post::try_from).collect()
    }
}

#[async_trait]
impl ThreadsRepo for PostgresRepositories {
    async fn thread_counter(&self, id: u64) -> Result<u64, RepoError> {
        let last_updated = sqlx::query_scalar::<_, Option<OffsetDateTime>>(
            r#"
            SELECT (SELECT MAX(p.last_updated) FROM posts p WHERE p.op = t.id)
            FROM threads t
            WHERE t.id = $1 AND NOT t.deleted
            "#,
        )
        .bind(db_id(id)?)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(counter_from_time(last_updated))
    }

    async fn board_counter(&self, board: &BoardScope) -> Result<u64, RepoError> {
        let last_updated = match board {
            BoardScope::All => {
                sqlx::query_scalar::<_, Option<OffsetDateTime>>(
                    "SELECT MAX(last_updated) FROM posts",
                )
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?
            }
            BoardScope::Board(name) => sqlx::query_scalar::<_, Option<OffsetDateTime>>(
                r#"
                SELECT (
                    SELECT MAX(p.last_updated)
                    FROM posts p
                    INNER JOIN threads t ON t.id = p.op
                    WHERE t.board = b.name
                )
                FROM boards b
                WHERE b.name = $1
                "#,
            )
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?,
        };

        Ok(counter_from_time(last_updated))
    }

    async fn thread(&self, id: u64, last_n: u32) -> Result<Thread, RepoError> {
        let id = db_id(id)?;
        let sql = format!("SELECT {THREAD_COLUMNS} FROM threads t WHERE t.id = $1 AND NOT t.deleted");
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        let op = self.load_op(id).await?;
        let posts = self.load_replies(id, last_n).await?;
        assemble_thread(row, op, posts, last_n != 0)
    }

    async fn catalog(&self, board: &BoardScope) -> Result<Vec<Thread>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(THREAD_COLUMNS);
        qb.push(
            ", op.time AS op_time, op.name AS op_name, op.body AS op_body \
             FROM threads t INNER JOIN posts op ON op.id = t.id \
             WHERE NOT t.deleted",
        );
        push_board_filter(&mut qb, board);
        qb.push(" ORDER BY t.reply_time DESC, t.id DESC");

        let rows = qb
            .build_query_as::<CatalogRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let op = Post {
                    id: convert_id(row.thread.id, "thread id")?,
                    time: row.op_time,
                    name: row.op_name,
                    body: row.op_body,
                };
                assemble_thread(row.thread, op, Vec::new(), false)
            })
            .collect()
    }

    async fn thread_ids(&self, board: &BoardScope) -> Result<Vec<u64>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT t.id FROM threads t WHERE NOT t.deleted");
        push_board_filter(&mut qb, board);
        qb.push(" ORDER BY t.reply_time DESC, t.id DESC");

        let ids = qb
            .build_query_scalar::<i64>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        ids.into_iter()
            .map(|id| convert_id(id, "thread id"))
            .collect()
    }

    async fn nsfw_boards(&self) -> Result<HashSet<String>, RepoError> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM boards WHERE nsfw")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(names.into_iter().collect())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
