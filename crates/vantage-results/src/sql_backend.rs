use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use vantage_types::{CrawlRecord, CrawlResultsId, CrawlSpec, VantageError, VantageResult};

use crate::ResultsManager;

fn db_err(e: sqlx::Error) -> VantageError {
    VantageError::StorageError(e.to_string())
}
fn json_err(e: serde_json::Error) -> VantageError {
    VantageError::StorageError(e.to_string())
}

/// `crawl_specs(id PK, collection_id, data_id, spec fields, created_at)` and
/// `crawl_records(id, crawl_spec_id FK cascade, crawl_id, url, page_source,
/// extracted_content, links JSON, scores JSON, composite_score, timestamp)`.
/// Records upsert by `(crawl_spec_id, id)`; deleting a spec cascades.
pub struct SqlResultsManager {
    pool: SqlitePool,
}

impl SqlResultsManager {
    pub async fn connect(database_path: &str) -> VantageResult<Self> {
        let url = format!("sqlite://{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(db_err)?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .map_err(db_err)?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crawl_specs (
                id TEXT PRIMARY KEY,
                collection_id TEXT NOT NULL,
                data_id TEXT NOT NULL,
                name TEXT NOT NULL,
                spec TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(db_err)?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crawl_records (
                id TEXT NOT NULL,
                crawl_spec_id TEXT NOT NULL REFERENCES crawl_specs(id) ON DELETE CASCADE,
                crawl_id TEXT NOT NULL,
                url TEXT NOT NULL,
                page_source TEXT NOT NULL,
                extracted_content TEXT NOT NULL,
                links TEXT NOT NULL,
                scores TEXT NOT NULL,
                composite_score REAL NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (crawl_spec_id, id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(db_err)?;
        Ok(Self { pool })
    }

    fn spec_row_id(results_id: &CrawlResultsId) -> String {
        format!("{}:{}", results_id.collection_id, results_id.data_id)
    }
}

#[async_trait]
impl ResultsManager for SqlResultsManager {
    async fn create_crawl(
        &self,
        spec: &CrawlSpec,
        results_id: &CrawlResultsId,
    ) -> VantageResult<()> {
        let spec_json = serde_json::to_string(spec).map_err(json_err)?;
        sqlx::query(
            r#"
            INSERT INTO crawl_specs (id, collection_id, data_id, name, spec, created_at)
            VALUES (?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(Self::spec_row_id(results_id))
        .bind(&results_id.collection_id)
        .bind(&results_id.data_id)
        .bind(&spec.name)
        .bind(spec_json)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn store_record(
        &self,
        record: &CrawlRecord,
        results_id: &CrawlResultsId,
        crawl_id: &str,
    ) -> VantageResult<()> {
        let links = serde_json::to_string(&record.links).map_err(json_err)?;
        let scores = serde_json::to_string(&record.scores).map_err(json_err)?;
        sqlx::query(
            r#"
            INSERT INTO crawl_records
                (id, crawl_spec_id, crawl_id, url, page_source, extracted_content, links, scores, composite_score, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(crawl_spec_id, id) DO UPDATE SET
                crawl_id = excluded.crawl_id,
                url = excluded.url,
                page_source = excluded.page_source,
                extracted_content = excluded.extracted_content,
                links = excluded.links,
                scores = excluded.scores,
                composite_score = excluded.composite_score,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(record.record_id())
        .bind(Self::spec_row_id(results_id))
        .bind(crawl_id)
        .bind(&record.url)
        .bind(&record.page_source)
        .bind(&record.extracted_content)
        .bind(links)
        .bind(scores)
        .bind(record.composite_score)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_crawl(&self, results_id: &CrawlResultsId) -> VantageResult<()> {
        let result = sqlx::query("DELETE FROM crawl_specs WHERE id = ?")
            .bind(Self::spec_row_id(results_id))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            tracing::warn!(
                collection_id = %results_id.collection_id,
                data_id = %results_id.data_id,
                "delete_crawl called on unknown bucket"
            );
        }
        Ok(())
    }

    async fn get_records(
        &self,
        results_id: &CrawlResultsId,
        count: usize,
        score_type: &str,
    ) -> VantageResult<Vec<CrawlRecord>> {
        let order_expr = if score_type == "composite" {
            "composite_score".to_string()
        } else if score_type.chars().all(|c| c.is_alphanumeric() || c == '_') {
            format!("COALESCE(json_extract(scores, '$.{score_type}'), 0)")
        } else {
            return Err(VantageError::InvalidScoreType(score_type.to_string()));
        };

        let query = format!(
            r#"
            SELECT url, page_source, extracted_content, links, scores, composite_score, timestamp
            FROM crawl_records
            WHERE crawl_spec_id = ?
            ORDER BY {order_expr} DESC
            LIMIT ?
            "#
        );

        let rows = sqlx::query(&query)
            .bind(Self::spec_row_id(results_id))
            .bind(count as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                let links: String = row.try_get("links").map_err(db_err)?;
                let scores: String = row.try_get("scores").map_err(db_err)?;
                let timestamp: String = row.try_get("timestamp").map_err(db_err)?;
                Ok(CrawlRecord {
                    url: row.try_get("url").map_err(db_err)?,
                    page_source: row.try_get("page_source").map_err(db_err)?,
                    extracted_content: row.try_get("extracted_content").map_err(db_err)?,
                    links: serde_json::from_str(&links).map_err(json_err)?,
                    scores: serde_json::from_str(&scores).map_err(json_err)?,
                    composite_score: row.try_get("composite_score").map_err(db_err)?,
                    timestamp: timestamp
                        .parse()
                        .map_err(|e: chrono::ParseError| VantageError::StorageError(e.to_string()))?,
                })
            })
            .collect()
    }
}
