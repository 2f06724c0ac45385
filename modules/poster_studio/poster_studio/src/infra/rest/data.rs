use async_trait::async_trait;
use poster_studio_sdk::{DataService, Embed, Filter, Query, Row, ServiceError, Table};

use super::RestBackend;
use super::query::{filter_params, read_params, select_list};

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

impl RestBackend {
    fn table_url(&self, table: Table) -> Result<url::Url, ServiceError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }
}

// Writes without a filter would hit the whole table.
fn require_filters(filters: &[Filter]) -> Result<(), ServiceError> {
    if filters.is_empty() {
        return Err(ServiceError::rejected(400, "write without a row filter"));
    }
    Ok(())
}

#[async_trait]
impl DataService for RestBackend {
    #[tracing::instrument(skip_all, fields(table = %query.table))]
    async fn select(&self, query: &Query) -> Result<Vec<Row>, ServiceError> {
        let url = self.table_url(query.table)?;
        let builder = self
            .authorize(self.client.get(url), &self.bearer().await)
            .query(&read_params(query));
        Self::execute(builder, false).await
    }

    #[tracing::instrument(skip_all, fields(table = %table))]
    async fn insert(
        &self,
        table: Table,
        row: Row,
        embed: Option<Embed>,
    ) -> Result<Row, ServiceError> {
        let url = self.table_url(table)?;
        let builder = self
            .authorize(self.client.post(url), &self.bearer().await)
            .query(&[("select", select_list(embed))])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&row);
        let rows: Vec<Row> = Self::execute(builder, false).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::invalid_record(table, "insert returned no row"))
    }

    #[tracing::instrument(skip_all, fields(table = %table))]
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, ServiceError> {
        require_filters(filters)?;
        let url = self.table_url(table)?;
        let builder = self
            .authorize(self.client.patch(url), &self.bearer().await)
            .query(&filter_params(filters))
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&patch);
        Self::execute(builder, false).await
    }

    #[tracing::instrument(skip_all, fields(table = %table))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<u64, ServiceError> {
        require_filters(filters)?;
        let url = self.table_url(table)?;
        let builder = self
            .authorize(self.client.delete(url), &self.bearer().await)
            .query(&filter_params(filters))
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1);
        let removed: Vec<Row> = Self::execute(builder, false).await?;
        Ok(u64::try_from(removed.len()).unwrap_or(u64::MAX))
    }
}
