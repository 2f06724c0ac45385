use std::sync::Arc;

use async_trait::async_trait;
use poster_studio_sdk::{
    DataService, Embed, Filter, NewUserDesign, Order, Profile, ProfilePatch, Query, ServiceError,
    Table, Template, UserDesign, UserDesignPatch,
};
use time::OffsetDateTime;

use crate::domain::repo::PosterRepository;

use super::mapper;

/// [`PosterRepository`] over any table-style [`DataService`].
pub struct TableRepository {
    data: Arc<dyn DataService>,
}

impl TableRepository {
    #[must_use]
    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self { data }
    }
}

fn by_id(id: &str) -> Vec<Filter> {
    vec![Filter::eq("id", id)]
}

#[async_trait]
impl PosterRepository for TableRepository {
    async fn fetch_profile(&self, user_id: &str) -> Result<Profile, ServiceError> {
        let query = Query::from(Table::Profiles)
            .filter(Filter::eq("id", user_id))
            .limit(1);
        let row = self
            .data
            .select(&query)
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::NotFound)?;
        mapper::profile_from_row(row)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<(), ServiceError> {
        let row = mapper::profile_patch_to_row(patch)?;
        let updated = self
            .data
            .update(Table::Profiles, &by_id(user_id), row)
            .await?;
        if updated.is_empty() {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    async fn list_templates(&self) -> Result<Vec<Template>, ServiceError> {
        let query = Query::from(Table::Templates).order(Order::desc("is_popular"));
        self.data
            .select(&query)
            .await?
            .into_iter()
            .map(mapper::template_from_row)
            .collect()
    }

    async fn list_designs(&self, user_id: &str) -> Result<Vec<UserDesign>, ServiceError> {
        let query = Query::from(Table::UserDesigns)
            .filter(Filter::eq("user_id", user_id))
            .order(Order::desc("updated_at"))
            .embed(Embed::Template);
        self.data
            .select(&query)
            .await?
            .into_iter()
            .map(mapper::design_from_row)
            .collect()
    }

    async fn insert_design(&self, design: &NewUserDesign) -> Result<UserDesign, ServiceError> {
        let row = mapper::new_design_to_row(design)?;
        let stored = self
            .data
            .insert(Table::UserDesigns, row, Some(Embed::Template))
            .await?;
        mapper::design_from_row(stored)
    }

    async fn update_design(
        &self,
        id: &str,
        patch: &UserDesignPatch,
    ) -> Result<OffsetDateTime, ServiceError> {
        let now = OffsetDateTime::now_utc();
        let row = mapper::design_patch_to_row(patch, now)?;
        let updated = self
            .data
            .update(Table::UserDesigns, &by_id(id), row)
            .await?;
        let stored = updated.first().ok_or(ServiceError::NotFound)?;
        Ok(mapper::updated_at_from_row(stored).unwrap_or(now))
    }

    async fn delete_design(&self, id: &str) -> Result<(), ServiceError> {
        match self.data.delete(Table::UserDesigns, &by_id(id)).await? {
            0 => Err(ServiceError::NotFound),
            _ => Ok(()),
        }
    }
}
