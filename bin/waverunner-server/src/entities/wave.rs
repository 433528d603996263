use crate::entities::{NewWave, SqliteStore, WaveRecord, WaveStatus};

use chrono::NaiveDateTime;
use std::future::Future;

pub trait WaveStore: Send + Sync + 'static {
    /// Insert a new `pending` row and return its id.
    fn insert_wave(&self, wave: NewWave) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    fn get_wave(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<WaveRecord>, sqlx::Error>> + Send;
    /// All rows in insertion order. A row that fails to decode fails the
    /// whole call.
    fn list_waves(&self) -> impl Future<Output = Result<Vec<WaveRecord>, sqlx::Error>> + Send;
    fn update_wave_status(
        &self,
        id: i64,
        status: WaveStatus,
        error_msg: Option<&str>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Mark rows left `pending` or `running` by a previous process as failed.
    fn fail_unfinished_waves(&self) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

type WaveRow = (
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    NaiveDateTime,
    NaiveDateTime,
);

const SELECT_WAVE: &str = "SELECT id, youtube_url, youtube_id, wave_name, status, error_msg, insert_dt, updated_at \
                           FROM waves";

fn wave_from_row(row: WaveRow) -> Result<WaveRecord, sqlx::Error> {
    let (id, youtube_url, youtube_id, wave_name, status, error_msg, insert_dt, updated_at) = row;
    let status = status
        .parse::<WaveStatus>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".into(),
            source: Box::new(e),
        })?;
    Ok(WaveRecord {
        id,
        youtube_url,
        youtube_id,
        wave_name,
        status,
        error_msg,
        insert_dt: insert_dt.and_utc(),
        updated_at: updated_at.and_utc(),
    })
}

impl WaveStore for SqliteStore {
    async fn insert_wave(&self, wave: NewWave) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO waves (youtube_url, youtube_id, wave_name, status) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&wave.youtube_url)
        .bind(&wave.youtube_id)
        .bind(&wave.wave_name)
        .bind(WaveStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_wave(&self, id: i64) -> Result<Option<WaveRecord>, sqlx::Error> {
        let row: Option<WaveRow> = sqlx::query_as(&format!("{SELECT_WAVE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(wave_from_row).transpose()
    }

    async fn list_waves(&self) -> Result<Vec<WaveRecord>, sqlx::Error> {
        let rows: Vec<WaveRow> = sqlx::query_as(&format!("{SELECT_WAVE} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(wave_from_row).collect()
    }

    async fn update_wave_status(
        &self,
        id: i64,
        status: WaveStatus,
        error_msg: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE waves SET status = ?1, error_msg = ?2, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?3",
        )
        .bind(status.as_ref())
        .bind(error_msg)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_unfinished_waves(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE waves SET status = ?1, error_msg = ?2, updated_at = CURRENT_TIMESTAMP \
             WHERE status IN (?3, ?4)",
        )
        .bind(WaveStatus::Failed.as_ref())
        .bind("interrupted by server restart")
        .bind(WaveStatus::Pending.as_ref())
        .bind(WaveStatus::Running.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::temp_store;

    fn sample(n: usize) -> NewWave {
        NewWave {
            youtube_url: format!("https://www.youtube.com/watch?v=vid{n}"),
            youtube_id: format!("vid{n}"),
            wave_name: format!("Track {n}"),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips_source_fields() {
        let (_dir, store) = temp_store().await;
        let id = store.insert_wave(sample(1)).await.unwrap();

        let wave = store.get_wave(id).await.unwrap().unwrap();
        assert_eq!(wave.id, id);
        assert_eq!(wave.youtube_url, "https://www.youtube.com/watch?v=vid1");
        assert_eq!(wave.youtube_id, "vid1");
        assert_eq!(wave.wave_name, "Track 1");
        assert_eq!(wave.status, WaveStatus::Pending);
        assert!(wave.error_msg.is_none());
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let (_dir, store) = temp_store().await;
        assert!(store.get_wave(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_ordered_by_increasing_id() {
        let (_dir, store) = temp_store().await;
        for n in 0..5 {
            store.insert_wave(sample(n)).await.unwrap();
        }
        let waves = store.list_waves().await.unwrap();
        assert_eq!(waves.len(), 5);
        assert!(waves.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(waves[0].youtube_id, "vid0");
        assert_eq!(waves[4].youtube_id, "vid4");
    }

    #[tokio::test]
    async fn status_update_keeps_source_fields() {
        let (_dir, store) = temp_store().await;
        let id = store.insert_wave(sample(7)).await.unwrap();

        store
            .update_wave_status(id, WaveStatus::Failed, Some("exit status: 1"))
            .await
            .unwrap();

        let wave = store.get_wave(id).await.unwrap().unwrap();
        assert_eq!(wave.status, WaveStatus::Failed);
        assert_eq!(wave.error_msg.as_deref(), Some("exit status: 1"));
        assert_eq!(wave.youtube_id, "vid7");
        assert_eq!(wave.wave_name, "Track 7");
    }

    #[tokio::test]
    async fn unfinished_waves_are_failed_on_restart() {
        let (_dir, store) = temp_store().await;
        let pending = store.insert_wave(sample(1)).await.unwrap();
        let running = store.insert_wave(sample(2)).await.unwrap();
        let done = store.insert_wave(sample(3)).await.unwrap();
        store
            .update_wave_status(running, WaveStatus::Running, None)
            .await
            .unwrap();
        store
            .update_wave_status(done, WaveStatus::Succeeded, None)
            .await
            .unwrap();

        assert_eq!(store.fail_unfinished_waves().await.unwrap(), 2);

        for id in [pending, running] {
            let wave = store.get_wave(id).await.unwrap().unwrap();
            assert_eq!(wave.status, WaveStatus::Failed);
            assert_eq!(
                wave.error_msg.as_deref(),
                Some("interrupted by server restart")
            );
        }
        let wave = store.get_wave(done).await.unwrap().unwrap();
        assert_eq!(wave.status, WaveStatus::Succeeded);
    }

    #[tokio::test]
    async fn unknown_status_fails_the_whole_listing() {
        let (_dir, store) = temp_store().await;
        store.insert_wave(sample(1)).await.unwrap();
        sqlx::query("UPDATE waves SET status = 'exploded'")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.list_waves().await.unwrap_err();
        assert!(matches!(err, sqlx::Error::ColumnDecode { .. }));
    }
}
