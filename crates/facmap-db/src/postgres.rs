//! PostGIS + `pg_trgm` backed [`FacilityStore`].

use async_trait::async_trait;
use facmap_core::{
    CanonicalFacility, ClusterGroup, Facility, FuzzyMatch, Location, OpenHours, OrderBy, Page,
    Selection, Source, TagField,
};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::store::{FacilityStore, ReplaceOutcome};
use crate::DbError;

const SELECT_COLUMNS: &str = "id, name, sources, ST_Y(location) AS lat, ST_X(location) AS lng, \
     street_name, street_number, flat_number, postal_code, city, district, \
     service_types, filters, cards, phone, email, website, fanpage, description, \
     images, open_hours, open24h, seasonal";

/// A row from the `facilities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FacilityRow {
    pub id: i64,
    pub name: String,
    pub sources: Json<Vec<Source>>,
    pub lat: f64,
    pub lng: f64,
    pub street_name: String,
    pub street_number: String,
    pub flat_number: String,
    pub postal_code: String,
    pub city: String,
    pub district: String,
    pub service_types: Vec<String>,
    pub filters: Vec<String>,
    pub cards: Vec<String>,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub fanpage: String,
    pub description: String,
    pub images: Vec<String>,
    pub open_hours: Vec<String>,
    pub open24h: bool,
    pub seasonal: bool,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Facility {
            id: row.id,
            record: CanonicalFacility {
                name: row.name,
                sources: row.sources.0,
                location: Location::new(row.lat, row.lng),
                street_name: row.street_name,
                street_number: row.street_number,
                flat_number: row.flat_number,
                postal_code: row.postal_code,
                city: row.city,
                district: row.district,
                service_types: row.service_types,
                filters: row.filters,
                cards: row.cards,
                phone: row.phone,
                email: row.email,
                website: row.website,
                fanpage: row.fanpage,
                description: row.description,
                images: row.images,
                open_hours: OpenHours::from_slots(row.open_hours),
                open24h: row.open24h,
                seasonal: row.seasonal,
            },
        }
    }
}

/// Append the shared selection predicate as a `WHERE` clause.
fn push_selection(qb: &mut QueryBuilder<'_, Postgres>, selection: &Selection) {
    let sw = selection.bounds.south_west;
    let ne = selection.bounds.north_east;
    qb.push(" WHERE ST_Within(location, ST_MakeEnvelope(")
        .push_bind(sw.lng)
        .push(", ")
        .push_bind(sw.lat)
        .push(", ")
        .push_bind(ne.lng)
        .push(", ")
        .push_bind(ne.lat)
        .push(", 4326))");

    for field in TagField::ALL {
        let wanted = selection.tags.requested(field);
        if !wanted.is_empty() {
            qb.push(format!(" AND {} @> ", field.column()))
                .push_bind(wanted.to_vec())
                .push("::text[]");
        }
    }

    if let Some(name) = selection.name_filter() {
        qb.push(" AND similarity(name, ")
            .push_bind(name.to_string())
            .push(") > ")
            .push_bind(facmap_core::SIMILARITY_THRESHOLD)
            .push("::real");
    }
}

/// PostGIS store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgFacilityStore {
    pool: PgPool,
}

impl PgFacilityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FacilityStore for PgFacilityStore {
    /// Delete and reinsert inside one transaction, then record the run.
    async fn replace_all(
        &self,
        records: Vec<CanonicalFacility>,
    ) -> Result<ReplaceOutcome, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM facilities").execute(&mut *tx).await?;

        for record in &records {
            sqlx::query(
                "INSERT INTO facilities \
                     (name, sources, location, street_name, street_number, flat_number, \
                      postal_code, city, district, service_types, filters, cards, phone, \
                      email, website, fanpage, description, images, open_hours, open24h, seasonal) \
                 VALUES ($1, $2, ST_SetSRID(ST_MakePoint($3, $4), 4326), $5, $6, $7, $8, $9, \
                         $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
            )
            .bind(&record.name)
            .bind(Json(&record.sources))
            .bind(record.location.lng)
            .bind(record.location.lat)
            .bind(&record.street_name)
            .bind(&record.street_number)
            .bind(&record.flat_number)
            .bind(&record.postal_code)
            .bind(&record.city)
            .bind(&record.district)
            .bind(&record.service_types)
            .bind(&record.filters)
            .bind(&record.cards)
            .bind(&record.phone)
            .bind(&record.email)
            .bind(&record.website)
            .bind(&record.fanpage)
            .bind(&record.description)
            .bind(&record.images)
            .bind(record.open_hours.to_vec())
            .bind(record.open24h)
            .bind(record.seasonal)
            .execute(&mut *tx)
            .await?;
        }

        let written = records.len();
        let generation: i64 = sqlx::query_scalar(
            "INSERT INTO ingestion_runs (records_written) VALUES ($1) RETURNING id",
        )
        .bind(i32::try_from(written).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(written, generation, "postgres store replaced");
        Ok(ReplaceOutcome {
            written,
            generation: u64::try_from(generation).unwrap_or(0),
        })
    }

    async fn find_one(&self, id: i64) -> Result<Option<Facility>, DbError> {
        let row = sqlx::query_as::<_, FacilityRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM facilities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Facility::from))
    }

    async fn search(
        &self,
        selection: &Selection,
        order: OrderBy,
        page: Page,
    ) -> Result<Vec<Facility>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {SELECT_COLUMNS} FROM facilities"));
        push_selection(&mut qb, selection);
        match order {
            OrderBy::Name => qb.push(r#" ORDER BY name COLLATE "C", id"#),
        };
        qb.push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .push(" LIMIT ")
            .push_bind(i64::try_from(page.limit()).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<FacilityRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Facility::from).collect())
    }

    async fn cluster(
        &self,
        selection: &Selection,
        max_clusters: usize,
    ) -> Result<Vec<ClusterGroup>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new("WITH selected AS (SELECT id, location FROM facilities");
        push_selection(&mut qb, selection);
        qb.push(
            "), clustered AS (\
                 SELECT id, location, ST_ClusterKMeans(location, \
                     LEAST(",
        )
        .push_bind(i64::try_from(max_clusters).unwrap_or(i64::MAX))
        .push(
            ", (SELECT COUNT(*) FROM selected))::int) OVER () AS cid \
                 FROM selected) \
             SELECT array_agg(id ORDER BY id) AS member_ids, \
                    ST_Y(ST_Centroid(ST_Collect(location))) AS lat, \
                    ST_X(ST_Centroid(ST_Collect(location))) AS lng \
             FROM clustered GROUP BY cid ORDER BY MIN(id)",
        );

        let rows: Vec<(Vec<i64>, f64, f64)> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(member_ids, lat, lng)| ClusterGroup {
                member_ids,
                centroid: Location::new(lat, lng),
            })
            .collect())
    }

    async fn fuzzy(
        &self,
        input: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<FuzzyMatch>, DbError> {
        let rows: Vec<(i64, String, String, f64)> = sqlx::query_as(
            "SELECT id, name, city, similarity(name, $1)::float8 AS score \
             FROM facilities \
             WHERE similarity(name, $1) > $2::real \
             ORDER BY score DESC, id ASC \
             LIMIT $3",
        )
        .bind(input)
        .bind(threshold)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, city, score)| FuzzyMatch {
                id,
                name,
                city,
                score,
            })
            .collect())
    }

    async fn distinct_values(&self, field: TagField) -> Result<Vec<String>, DbError> {
        let values: Vec<String> = sqlx::query_scalar(&format!(
            r#"SELECT v FROM (SELECT DISTINCT unnest({}) AS v FROM facilities) AS t ORDER BY v COLLATE "C""#,
            field.column()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    async fn generation(&self) -> Result<u64, DbError> {
        let id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM ingestion_runs")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(id).map_err(|_| DbError::InvalidRecord(format!("negative generation {id}")))
    }

    async fn health(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }
}
