// SQLite reading history. Raw samples in miner_readings; daily rollups in
// daily_worker_stats / daily_rack_stats.

pub mod aggregation;

use crate::models::{
    DailyRackStat, DailyWorkerStat, HashrateBucket, RackPeriodStat, Reading, WorkerPeriodStat,
    WorkerStatus,
};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Time bucketing for hashrate history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryInterval {
    Hour,
    Day,
}

impl HistoryInterval {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "hour" => Some(HistoryInterval::Hour),
            "day" => Some(HistoryInterval::Day),
            _ => None,
        }
    }

    /// strftime format producing the bucket label.
    fn bucket_format(&self) -> &'static str {
        match self {
            HistoryInterval::Hour => "%Y-%m-%d %H:00",
            HistoryInterval::Day => "%Y-%m-%d",
        }
    }
}

pub struct HistoryRepo {
    pool: SqlitePool,
    retention_secs: i64,
}

impl HistoryRepo {
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention_days: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        let retention_secs = (retention_days as i64) * 24 * 60 * 60;
        Ok(Self {
            pool,
            retention_secs,
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS miner_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                worker_name TEXT NOT NULL,
                hashrate REAL NOT NULL,
                hashrate_1h REAL NOT NULL,
                hashrate_24h REAL NOT NULL,
                reject_rate REAL NOT NULL,
                status TEXT NOT NULL,
                coin_type TEXT NOT NULL,
                rack TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON miner_readings(timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_readings_coin_timestamp ON miner_readings(coin_type, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        aggregation::init_rollup_tables(&self.pool).await?;

        Ok(())
    }

    #[instrument(skip(self, readings), fields(repo = "history", operation = "save_readings", readings_count = readings.len()))]
    pub async fn save_readings(&self, readings: &[Reading]) -> anyhow::Result<()> {
        if readings.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in readings {
            sqlx::query(
                "INSERT INTO miner_readings (timestamp, worker_name, hashrate, hashrate_1h, hashrate_24h, reject_rate, status, coin_type, rack) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(r.timestamp)
            .bind(&r.worker_name)
            .bind(r.hashrate)
            .bind(r.hashrate_1h)
            .bind(r.hashrate_24h)
            .bind(r.reject_rate)
            .bind(r.status.as_str())
            .bind(&r.coin_type)
            .bind(&r.rack)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Raw readings in [from_ts, to_ts) for rollups. Order: ascending by timestamp.
    #[instrument(
        skip(self),
        fields(repo = "history", operation = "get_readings_by_time_range")
    )]
    pub async fn get_readings_by_time_range(
        &self,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<Reading>> {
        let rows = sqlx::query(
            "SELECT timestamp, worker_name, hashrate, hashrate_1h, hashrate_24h, reject_rate, status, coin_type, rack
             FROM miner_readings WHERE timestamp >= $1 AND timestamp < $2 ORDER BY timestamp ASC",
        )
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_reading_row(&row)?);
        }
        Ok(out)
    }

    /// Most recent readings across all coins, newest first.
    pub async fn recent_readings(&self, limit: u32) -> anyhow::Result<Vec<Reading>> {
        let rows = sqlx::query(
            "SELECT timestamp, worker_name, hashrate, hashrate_1h, hashrate_24h, reject_rate, status, coin_type, rack
             FROM miner_readings ORDER BY timestamp DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_reading_row(&row)?);
        }
        Ok(out)
    }

    /// Upserts one day of rollups, both tables in one transaction.
    /// Re-running for the same date replaces the prior rows.
    #[instrument(skip(self, workers, racks), fields(repo = "history", operation = "save_daily_stats", worker_rows = workers.len(), rack_rows = racks.len()))]
    pub async fn save_daily_stats(
        &self,
        workers: &[DailyWorkerStat],
        racks: &[DailyRackStat],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for w in workers {
            sqlx::query(
                "INSERT OR REPLACE INTO daily_worker_stats (date, worker_name, avg_hashrate, max_hashrate, min_hashrate, uptime_percentage, total_downtime_minutes, avg_reject_rate, coin_type) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(&w.date)
            .bind(&w.worker_name)
            .bind(w.avg_hashrate)
            .bind(w.max_hashrate)
            .bind(w.min_hashrate)
            .bind(w.uptime_percentage)
            .bind(w.total_downtime_minutes)
            .bind(w.avg_reject_rate)
            .bind(&w.coin_type)
            .execute(&mut *tx)
            .await?;
        }
        for r in racks {
            sqlx::query(
                "INSERT OR REPLACE INTO daily_rack_stats (date, rack, avg_hashrate, worker_count, active_worker_count, efficiency_percentage, coin_type) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&r.date)
            .bind(&r.rack)
            .bind(r.avg_hashrate)
            .bind(r.worker_count)
            .bind(r.active_worker_count)
            .bind(r.efficiency_percentage)
            .bind(&r.coin_type)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Deletes readings strictly older than the retention cutoff.
    /// Returns the number of rows removed.
    #[instrument(skip(self), fields(repo = "history", operation = "prune_old_readings"))]
    pub async fn prune_old_readings(&self) -> anyhow::Result<u64> {
        let cutoff = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs() as i64)
            - self.retention_secs;
        let r = sqlx::query("DELETE FROM miner_readings WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after deletes (run on the configured schedule).
    #[instrument(skip(self), fields(repo = "history", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    /// Worker names seen for a coin, sorted.
    pub async fn distinct_workers(&self, coin: &str) -> anyhow::Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT worker_name FROM miner_readings WHERE coin_type = $1 ORDER BY worker_name",
        )
        .bind(coin)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Rack labels seen for a coin, sorted.
    pub async fn distinct_racks(&self, coin: &str) -> anyhow::Result<Vec<String>> {
        let racks = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT rack FROM miner_readings WHERE coin_type = $1 ORDER BY rack",
        )
        .bind(coin)
        .fetch_all(&self.pool)
        .await?;
        Ok(racks)
    }

    /// Time-bucketed hashrate averages in [from_ts, to_ts], optionally
    /// filtered to one worker or one rack (worker wins when both given).
    #[instrument(skip(self), fields(repo = "history", operation = "hashrate_history"))]
    pub async fn hashrate_history(
        &self,
        coin: &str,
        worker: Option<&str>,
        rack: Option<&str>,
        from_ts: i64,
        to_ts: i64,
        interval: HistoryInterval,
    ) -> anyhow::Result<Vec<HashrateBucket>> {
        let filter = match (worker, rack) {
            (Some(_), _) => " AND worker_name = $5",
            (None, Some(_)) => " AND rack = $5",
            (None, None) => "",
        };
        let sql = format!(
            "SELECT strftime($1, timestamp, 'unixepoch') AS time_period, \
                    AVG(hashrate) AS avg_hashrate, \
                    AVG(hashrate_1h) AS avg_hashrate_1h, \
                    AVG(hashrate_24h) AS avg_hashrate_24h, \
                    COUNT(CASE WHEN status = 'active' THEN 1 END) * 100.0 / COUNT(*) AS uptime_percentage \
             FROM miner_readings \
             WHERE coin_type = $2 AND timestamp BETWEEN $3 AND $4{filter} \
             GROUP BY time_period \
             ORDER BY time_period ASC"
        );

        let mut query = sqlx::query(&sql)
            .bind(interval.bucket_format())
            .bind(coin)
            .bind(from_ts)
            .bind(to_ts);
        if let Some(worker) = worker {
            query = query.bind(worker);
        } else if let Some(rack) = rack {
            query = query.bind(rack);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(HashrateBucket {
                time_period: row.try_get("time_period")?,
                avg_hashrate: row.try_get("avg_hashrate")?,
                avg_hashrate_1h: row.try_get("avg_hashrate_1h")?,
                avg_hashrate_24h: row.try_get("avg_hashrate_24h")?,
                uptime_percentage: row.try_get("uptime_percentage")?,
            });
        }
        Ok(out)
    }

    /// Per-worker aggregates for a coin in [from_ts, to_ts], sorted by
    /// average hashrate descending.
    #[instrument(skip(self), fields(repo = "history", operation = "worker_period_stats"))]
    pub async fn worker_period_stats(
        &self,
        coin: &str,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<WorkerPeriodStat>> {
        let rows = sqlx::query(
            "SELECT worker_name, \
                    AVG(hashrate) AS avg_hashrate, \
                    MAX(hashrate) AS max_hashrate, \
                    MIN(CASE WHEN hashrate > 0 THEN hashrate ELSE NULL END) AS min_hashrate, \
                    COUNT(*) AS total_readings, \
                    COUNT(CASE WHEN status = 'active' THEN 1 END) AS active_readings, \
                    AVG(reject_rate) AS avg_reject_rate \
             FROM miner_readings \
             WHERE coin_type = $1 AND timestamp BETWEEN $2 AND $3 \
             GROUP BY worker_name \
             ORDER BY avg_hashrate DESC",
        )
        .bind(coin)
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(WorkerPeriodStat {
                worker_name: row.try_get("worker_name")?,
                avg_hashrate: row.try_get("avg_hashrate")?,
                max_hashrate: row.try_get("max_hashrate")?,
                min_hashrate: row.try_get("min_hashrate")?,
                total_readings: row.try_get("total_readings")?,
                active_readings: row.try_get("active_readings")?,
                avg_reject_rate: row.try_get("avg_reject_rate")?,
            });
        }
        Ok(out)
    }

    /// Per-rack aggregates for a coin in [from_ts, to_ts], sorted by
    /// average hashrate descending. Counts are distinct worker names.
    #[instrument(skip(self), fields(repo = "history", operation = "rack_period_stats"))]
    pub async fn rack_period_stats(
        &self,
        coin: &str,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<RackPeriodStat>> {
        let rows = sqlx::query(
            "SELECT rack, \
                    AVG(hashrate) AS avg_hashrate, \
                    COUNT(DISTINCT worker_name) AS worker_count, \
                    COUNT(DISTINCT CASE WHEN status = 'active' THEN worker_name END) AS active_worker_count, \
                    COUNT(DISTINCT CASE WHEN status = 'active' THEN worker_name END) * 100.0 / COUNT(DISTINCT worker_name) AS efficiency_percentage \
             FROM miner_readings \
             WHERE coin_type = $1 AND timestamp BETWEEN $2 AND $3 \
             GROUP BY rack \
             ORDER BY avg_hashrate DESC",
        )
        .bind(coin)
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RackPeriodStat {
                rack: row.try_get("rack")?,
                avg_hashrate: row.try_get("avg_hashrate")?,
                worker_count: row.try_get("worker_count")?,
                active_worker_count: row.try_get("active_worker_count")?,
                efficiency_percentage: row.try_get("efficiency_percentage")?,
            });
        }
        Ok(out)
    }

    /// Stored worker rollups for a coin with date in [from_date, to_date],
    /// ordered by date then worker.
    pub async fn daily_worker_stats(
        &self,
        coin: &str,
        from_date: &str,
        to_date: &str,
    ) -> anyhow::Result<Vec<DailyWorkerStat>> {
        let rows = sqlx::query(
            "SELECT date, worker_name, avg_hashrate, max_hashrate, min_hashrate, uptime_percentage, total_downtime_minutes, avg_reject_rate, coin_type \
             FROM daily_worker_stats \
             WHERE coin_type = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date ASC, worker_name ASC",
        )
        .bind(coin)
        .bind(from_date)
        .bind(to_date)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(DailyWorkerStat {
                date: row.try_get("date")?,
                worker_name: row.try_get("worker_name")?,
                avg_hashrate: row.try_get("avg_hashrate")?,
                max_hashrate: row.try_get("max_hashrate")?,
                min_hashrate: row.try_get("min_hashrate")?,
                uptime_percentage: row.try_get("uptime_percentage")?,
                total_downtime_minutes: row.try_get("total_downtime_minutes")?,
                avg_reject_rate: row.try_get("avg_reject_rate")?,
                coin_type: row.try_get("coin_type")?,
            });
        }
        Ok(out)
    }

    /// Stored rack rollups for a coin with date in [from_date, to_date],
    /// ordered by date then rack.
    pub async fn daily_rack_stats(
        &self,
        coin: &str,
        from_date: &str,
        to_date: &str,
    ) -> anyhow::Result<Vec<DailyRackStat>> {
        let rows = sqlx::query(
            "SELECT date, rack, avg_hashrate, worker_count, active_worker_count, efficiency_percentage, coin_type \
             FROM daily_rack_stats \
             WHERE coin_type = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date ASC, rack ASC",
        )
        .bind(coin)
        .bind(from_date)
        .bind(to_date)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(DailyRackStat {
                date: row.try_get("date")?,
                rack: row.try_get("rack")?,
                avg_hashrate: row.try_get("avg_hashrate")?,
                worker_count: row.try_get("worker_count")?,
                active_worker_count: row.try_get("active_worker_count")?,
                efficiency_percentage: row.try_get("efficiency_percentage")?,
                coin_type: row.try_get("coin_type")?,
            });
        }
        Ok(out)
    }

    fn parse_reading_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Reading> {
        let status: String = row.try_get("status")?;
        Ok(Reading {
            timestamp: row.try_get("timestamp")?,
            worker_name: row.try_get("worker_name")?,
            hashrate: row.try_get("hashrate")?,
            hashrate_1h: row.try_get("hashrate_1h")?,
            hashrate_24h: row.try_get("hashrate_24h")?,
            reject_rate: row.try_get("reject_rate")?,
            status: WorkerStatus::parse(&status),
            coin_type: row.try_get("coin_type")?,
            rack: row.try_get("rack")?,
        })
    }
}
