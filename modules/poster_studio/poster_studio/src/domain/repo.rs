use async_trait::async_trait;
use poster_studio_sdk::{
    NewUserDesign, Profile, ProfilePatch, ServiceError, Template, UserDesign, UserDesignPatch,
};
use time::OffsetDateTime;

/// Typed access to the three record collections.
#[async_trait]
pub trait PosterRepository: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<Profile, ServiceError>;

    async fn update_profile(&self, user_id: &str, patch: &ProfilePatch)
    -> Result<(), ServiceError>;

    /// Whole catalog, popular entries first.
    async fn list_templates(&self) -> Result<Vec<Template>, ServiceError>;

    /// Designs owned by `user_id`, most recently updated first, with their
    /// templates joined in.
    async fn list_designs(&self, user_id: &str) -> Result<Vec<UserDesign>, ServiceError>;

    async fn insert_design(&self, design: &NewUserDesign) -> Result<UserDesign, ServiceError>;

    /// Returns the `updated_at` the backend stamped on the row.
    async fn update_design(
        &self,
        id: &str,
        patch: &UserDesignPatch,
    ) -> Result<OffsetDateTime, ServiceError>;

    async fn delete_design(&self, id: &str) -> Result<(), ServiceError>;
}
